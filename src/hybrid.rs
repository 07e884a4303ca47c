//! Hybrid recommendation: collaborative affinity blended with opportunity scores.

use serde::{Deserialize, Serialize};

use crate::affinity::{AffinityMatrix, DEFAULT_NEIGHBOURS};
use crate::model::{InvestorProfile, TechArea};
use crate::scoring::Opportunity;
use crate::similarity::SimilarityMatrix;

/// Content score for a candidate missing from the opportunity list.
pub const DEFAULT_CONTENT_SCORE: f64 = 0.5;

/// Blend weights of the hybrid recommender.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub collaborative_weight: f64,
    pub content_weight: f64,
    /// Peer investors consulted by the collaborative step.
    pub neighbours: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            collaborative_weight: 0.6,
            content_weight: 0.4,
            neighbours: DEFAULT_NEIGHBOURS,
        }
    }
}

/// Where a hybrid recommendation came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Blended collaborative weight and content score.
    Hybrid { collaborative: f64, content: f64 },
    /// Content-similarity fallback seeded by the investor's first focus area.
    SimilarArea,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridRecommendation {
    pub area: TechArea,
    pub score: f64,
    pub source: RecommendationSource,
}

/// Read-only inputs of one hybrid query.
pub struct HybridInputs<'a> {
    pub affinity: &'a AffinityMatrix,
    pub similarity: &'a SimilarityMatrix,
    pub opportunities: &'a [Opportunity],
    pub config: &'a HybridConfig,
}

/// Recommend up to `k` areas for an investor.
///
/// Takes `2k` collaborative candidates and blends each with its opportunity
/// score / 100. With no collaborative candidates, falls back to the areas
/// most similar to the investor's first focus area. Unknown investors and
/// investors without focus areas get an empty list.
pub fn hybrid_recommend(
    inputs: &HybridInputs<'_>,
    investor: Option<&InvestorProfile>,
    k: usize,
) -> Vec<HybridRecommendation> {
    let Some(investor) = investor else {
        return Vec::new();
    };
    let candidates = inputs.affinity.collaborative_recommend(
        &investor.id,
        k.saturating_mul(2),
        inputs.config.neighbours,
    );

    if candidates.is_empty() {
        let Some(seed) = investor.focus_areas.first() else {
            return Vec::new();
        };
        tracing::debug!(investor = %investor.id, %seed, "no collaborative candidates, using similar areas");
        return inputs
            .similarity
            .find_similar(seed.as_str(), k)
            .into_iter()
            .map(|(area, score)| HybridRecommendation {
                area,
                score,
                source: RecommendationSource::SimilarArea,
            })
            .collect();
    }

    let mut recs: Vec<HybridRecommendation> = candidates
        .into_iter()
        .map(|(area, collaborative)| {
            let content = inputs
                .opportunities
                .iter()
                .find(|o| o.area == area)
                .map_or(DEFAULT_CONTENT_SCORE, |o| o.score / 100.0);
            let score = inputs.config.collaborative_weight * collaborative
                + inputs.config.content_weight * content;
            HybridRecommendation {
                area,
                score,
                source: RecommendationSource::Hybrid {
                    collaborative,
                    content,
                },
            }
        })
        .collect();
    recs.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    recs.truncate(k);
    recs
}
