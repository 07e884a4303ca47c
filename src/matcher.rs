//! Rule-based investor matching for a target technology area.
//!
//! Each investor accumulates weighted points over four criteria: focus-area
//! membership, quality threshold, maturity-stage preference, and market-size
//! threshold. The match percentage is points over possible points.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::model::{InvestorProfile, InvestorType, MaturityStage, TechArea};

const FOCUS_WEIGHT: f64 = 2.0;
const QUALITY_WEIGHT: f64 = 1.5;
const STAGE_WEIGHT: f64 = 1.0;
const MARKET_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Investors below this match percentage are dropped.
    pub min_match_percent: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_match_percent: 40.0,
        }
    }
}

/// Patent-derived profile of the target area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaProfile {
    pub avg_quality: f64,
    pub avg_commercial: f64,
    pub maturity: MaturityStage,
    /// Current-year market size, if a snapshot exists.
    pub market_size: Option<f64>,
}

impl AreaProfile {
    /// `None` when the area has no patents.
    pub fn build(dataset: &Dataset, area: &str, current_year: i32) -> Option<Self> {
        let mut count = 0usize;
        let mut quality = 0.0;
        let mut commercial = 0.0;
        let mut stages: HashMap<MaturityStage, usize> = HashMap::new();
        for p in dataset.patents_in(area) {
            count += 1;
            quality += p.quality;
            commercial += p.commercial_viability;
            *stages.entry(p.maturity).or_insert(0) += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            avg_quality: quality / count as f64,
            avg_commercial: commercial / count as f64,
            maturity: modal_stage(&stages)?,
            market_size: dataset.market_for(area, current_year).map(|m| m.market_size),
        })
    }
}

/// Most frequent stage; ties go to the alphabetically first label.
fn modal_stage(stages: &HashMap<MaturityStage, usize>) -> Option<MaturityStage> {
    stages
        .iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.label().cmp(a.label())))
        .map(|(stage, _)| *stage)
}

/// An investor scored against a technology area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestorMatch {
    pub investor_id: String,
    pub name: String,
    pub investor_type: InvestorType,
    /// Match percentage, rounded to one decimal.
    pub match_percent: f64,
    pub focus_areas: Vec<TechArea>,
    pub risk_tolerance: String,
    pub investment_size: String,
    pub reasoning: &'static str,
}

/// Qualitative reasoning for a match percentage.
pub fn reasoning(percent: f64) -> &'static str {
    if percent >= 80.0 {
        "Strong match: focus area, quality bar, and stage preference align"
    } else if percent >= 60.0 {
        "Good match: core investment criteria met, worth prioritizing"
    } else if percent >= 40.0 {
        "Fair match: some criteria met, suitable as a backup investor"
    } else {
        "Weak match: look for a better-suited investor"
    }
}

/// Unrounded match percentage of `investor` against `area`.
pub fn match_percent(investor: &InvestorProfile, area: &str, profile: &AreaProfile) -> f64 {
    let stage = profile.maturity.label().to_lowercase();
    let mut criteria = vec![
        (investor.focuses_on(area), FOCUS_WEIGHT),
        (profile.avg_quality >= investor.min_quality, QUALITY_WEIGHT),
        (investor.preferred_stage.to_lowercase().contains(&stage), STAGE_WEIGHT),
    ];
    if let Some(size) = profile.market_size {
        criteria.push((size >= investor.min_market_size, MARKET_WEIGHT));
    }
    let possible: f64 = criteria.iter().map(|(_, w)| w).sum();
    let score: f64 = criteria.iter().filter(|(hit, _)| *hit).map(|(_, w)| w).sum();
    score / possible * 100.0
}

/// Rank investors for `area`, best first, capped at `k`.
///
/// Empty when the area has no patents.
pub fn recommend_investors(
    dataset: &Dataset,
    area: &str,
    current_year: i32,
    k: usize,
    config: &MatcherConfig,
) -> Vec<InvestorMatch> {
    let Some(profile) = AreaProfile::build(dataset, area, current_year) else {
        return Vec::new();
    };

    let mut scored: Vec<(f64, &InvestorProfile)> = dataset
        .investors()
        .iter()
        .map(|inv| (match_percent(inv, area, &profile), inv))
        .filter(|(pct, _)| *pct >= config.min_match_percent)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(k)
        .map(|(pct, inv)| InvestorMatch {
            investor_id: inv.id.clone(),
            name: inv.name.clone(),
            investor_type: inv.investor_type,
            match_percent: (pct * 10.0).round() / 10.0,
            focus_areas: inv.focus_areas.clone(),
            risk_tolerance: inv.risk_tolerance.clone(),
            investment_size: inv.investment_size.clone(),
            reasoning: reasoning(pct),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;

    fn dataset(with_market: bool) -> Dataset {
        let market = if with_market {
            vec![snapshot("AI", 2024)]
        } else {
            vec![]
        };
        let mut picky = investor("picky", &["Biotech"]);
        picky.min_quality = 95.0;
        picky.preferred_stage = "Seed Stage".into();
        picky.min_market_size = 500.0;
        let mut partial = investor("partial", &["Biotech"]);
        partial.min_market_size = 500.0;
        Dataset::new(
            vec![
                patent("p1", "AI", 2020, "a"),
                patent("p2", "AI", 2021, "b"),
                patent("p3", "Biotech", 2021, "b"),
            ],
            market,
            vec![investor("fit", &["AI"]), picky, partial],
        )
        .unwrap()
    }

    #[test]
    fn full_match_scores_hundred() {
        let matches = recommend_investors(&dataset(true), "AI", 2024, 8, &MatcherConfig::default());
        assert_eq!(matches[0].investor_id, "fit");
        assert_eq!(matches[0].match_percent, 100.0);
        assert!(matches[0].reasoning.starts_with("Strong"));
    }

    #[test]
    fn low_matches_are_dropped() {
        let matches = recommend_investors(&dataset(true), "AI", 2024, 8, &MatcherConfig::default());
        assert!(matches.iter().all(|m| m.investor_id != "picky"));
        // partial: quality 1.5 + stage 1 of 5.5
        let partial = matches.iter().find(|m| m.investor_id == "partial").unwrap();
        assert_eq!(partial.match_percent, (2.5 / 5.5 * 1000.0_f64).round() / 10.0);
        assert!(partial.reasoning.starts_with("Fair"));
    }

    #[test]
    fn market_criterion_skipped_without_snapshot() {
        let ds = dataset(false);
        let profile = AreaProfile::build(&ds, "AI", 2024).unwrap();
        assert!(profile.market_size.is_none());
        let partial = ds.investor("partial").unwrap();
        // quality 1.5 + stage 1 of 4.5
        assert!((match_percent(partial, "AI", &profile) - 2.5 / 4.5 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn area_without_patents_is_empty() {
        let matches = recommend_investors(&dataset(true), "Quantum", 2024, 8, &MatcherConfig::default());
        assert!(matches.is_empty());
    }

    #[test]
    fn results_capped_and_sorted() {
        let matches = recommend_investors(&dataset(true), "AI", 2024, 1, &MatcherConfig::default());
        assert_eq!(matches.len(), 1);
        let all = recommend_investors(&dataset(true), "AI", 2024, 8, &MatcherConfig::default());
        assert!(all.windows(2).all(|w| w[0].match_percent >= w[1].match_percent));
    }

    #[test]
    fn modal_stage_tie_breaks_alphabetically() {
        let stages: HashMap<MaturityStage, usize> = [
            (MaturityStage::Prototype, 2),
            (MaturityStage::Growth, 2),
            (MaturityStage::Mature, 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(modal_stage(&stages), Some(MaturityStage::Growth));
    }

    #[test]
    fn reasoning_thresholds() {
        assert!(reasoning(80.0).starts_with("Strong"));
        assert!(reasoning(60.0).starts_with("Good"));
        assert!(reasoning(40.0).starts_with("Fair"));
        assert!(reasoning(39.9).starts_with("Weak"));
    }
}
