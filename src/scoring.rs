//! Multi-factor opportunity scoring.
//!
//! Each [`GrowthMetric`] is turned into eight normalized, weighted sub-scores
//! whose sum is the composite opportunity score (0-100). The scorer also
//! derives a trend signal from growth acceleration, a risk tier from a vote
//! over five boolean risk factors, and fixed recommendation texts.

use serde::{Deserialize, Serialize};

use crate::metrics::GrowthMetric;
use crate::model::{RiskTier, TechArea};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Weights of the eight sub-scores. They are expected to sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub growth: f64,
    pub market: f64,
    pub size: f64,
    pub quality: f64,
    pub commercial: f64,
    pub attractiveness: f64,
    pub competition: f64,
    pub government: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            growth: 0.20,
            market: 0.15,
            size: 0.15,
            quality: 0.15,
            commercial: 0.10,
            attractiveness: 0.10,
            competition: 0.10,
            government: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.growth
            + self.market
            + self.size
            + self.quality
            + self.commercial
            + self.attractiveness
            + self.competition
            + self.government
    }
}

/// Thresholds of the five risk factors and the vote needed for each tier.
///
/// These are empirical tuning constants carried over unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Competition above this counts as a risk factor.
    pub max_competition: f64,
    /// CAGR (fraction) below this counts as a risk factor.
    pub min_cagr: f64,
    /// Market size below this counts as a risk factor.
    pub min_market_size: f64,
    /// Fewer distinct applicants than this counts as a risk factor.
    pub min_applicants: usize,
    /// Government support below this counts as a risk factor.
    pub min_government_support: f64,
    /// Factor count at which the tier becomes High.
    pub high_at: usize,
    /// Factor count at which the tier becomes Medium-High.
    pub medium_high_at: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            max_competition: 70.0,
            min_cagr: 0.05,
            min_market_size: 50.0,
            min_applicants: 3,
            min_government_support: 40.0,
            high_at: 3,
            medium_high_at: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// `clamp01((value - min) / (max - min))`, or 0 when `max == min`.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Direction of the most recent change in patent growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendSignal {
    Bullish,
    Caution,
    Stable,
}

impl TrendSignal {
    pub fn from_acceleration(acceleration: f64) -> Self {
        if acceleration > 0.0 {
            Self::Bullish
        } else if acceleration < 0.0 {
            Self::Caution
        } else {
            Self::Stable
        }
    }
}

impl std::fmt::Display for TrendSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Bullish => "Bullish",
            Self::Caution => "Caution",
            Self::Stable => "Stable",
        };
        f.write_str(label)
    }
}

/// The five boolean inputs of the risk vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RiskFactors {
    pub high_competition: bool,
    pub low_growth: bool,
    pub small_market: bool,
    pub concentrated_ownership: bool,
    pub low_government_support: bool,
}

impl RiskFactors {
    pub fn assess(metric: &GrowthMetric, t: &RiskThresholds) -> Self {
        Self {
            high_competition: metric.competition > t.max_competition,
            low_growth: metric.cagr < t.min_cagr,
            small_market: metric.market_size < t.min_market_size,
            concentrated_ownership: metric.applicant_count < t.min_applicants,
            low_government_support: metric.government_support < t.min_government_support,
        }
    }

    pub fn count(&self) -> usize {
        [
            self.high_competition,
            self.low_growth,
            self.small_market,
            self.concentrated_ownership,
            self.low_government_support,
        ]
        .into_iter()
        .filter(|&f| f)
        .count()
    }

    /// Tier by vote: High, Medium-High, then Medium for any single factor.
    pub fn tier(&self, t: &RiskThresholds) -> RiskTier {
        let n = self.count();
        if n >= t.high_at {
            RiskTier::High
        } else if n >= t.medium_high_at {
            RiskTier::MediumHigh
        } else if n >= 1 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Qualitative recommendation for a composite score.
pub fn recommendation_text(score: f64) -> &'static str {
    if score >= 80.0 {
        "Exceptional opportunity: strongly recommended for investment"
    } else if score >= 65.0 {
        "High-quality opportunity: worth active consideration"
    } else if score >= 50.0 {
        "Solid opportunity: suited to long-term investment"
    } else if score >= 35.0 {
        "Cautious opportunity: further due diligence advised"
    } else {
        "Watch: wait for a better entry point"
    }
}

/// Suggested ticket size for an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestmentSizing {
    Large,
    Medium,
    Small,
    Watch,
}

impl InvestmentSizing {
    pub fn advise(score: f64, risk: RiskTier) -> Self {
        if score >= 75.0 && matches!(risk, RiskTier::Low | RiskTier::Medium) {
            Self::Large
        } else if score >= 60.0 {
            Self::Medium
        } else if score >= 45.0 {
            Self::Small
        } else {
            Self::Watch
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Large => "large allocation (above 10M HKD)",
            Self::Medium => "medium allocation (5-10M HKD)",
            Self::Small => "small allocation (1-5M HKD)",
            Self::Watch => "hold or cautious allocation (below 1M HKD)",
        }
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// Weighted sub-scores on the composite scale: they sum to the composite.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SubScores {
    pub growth: f64,
    pub market: f64,
    pub size: f64,
    pub quality: f64,
    pub commercial: f64,
    pub attractiveness: f64,
    pub competition: f64,
    pub government: f64,
}

/// A scored technology area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub area: TechArea,
    /// Composite score in 0..=100, rounded to one decimal.
    pub score: f64,
    pub sub_scores: SubScores,
    /// CAGR as a percentage, rounded to one decimal.
    pub cagr_percent: f64,
    pub market_size: f64,
    pub investment_heat: f64,
    pub government_support: f64,
    pub competition: f64,
    pub avg_quality: f64,
    pub patent_count: usize,
    pub applicant_count: usize,
    pub trend: TrendSignal,
    pub recommendation: &'static str,
    pub risk: RiskTier,
}

/// Turns growth metrics into ranked opportunities.
#[derive(Debug, Clone, Default)]
pub struct OpportunityScorer {
    weights: ScoringWeights,
    risk: RiskThresholds,
}

impl OpportunityScorer {
    pub fn new(weights: ScoringWeights, risk: RiskThresholds) -> Self {
        if (weights.total() - 1.0).abs() > 1e-6 {
            tracing::warn!(total = weights.total(), "scoring weights do not sum to 1.0");
        }
        Self { weights, risk }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a single area.
    pub fn score(&self, metric: &GrowthMetric) -> Opportunity {
        let w = &self.weights;
        let raw = SubScores {
            growth: normalize(metric.cagr * 100.0, 0.0, 50.0) * w.growth,
            market: normalize(metric.market_growth * 100.0, 0.0, 30.0) * w.market,
            size: normalize(metric.market_size, 0.0, 300.0) * w.size,
            quality: normalize(metric.avg_quality, 0.0, 100.0) * w.quality,
            commercial: normalize(metric.avg_commercial, 0.0, 100.0) * w.commercial,
            attractiveness: normalize(metric.avg_attractiveness, 0.0, 100.0) * w.attractiveness,
            competition: normalize(100.0 - metric.competition, 0.0, 100.0) * w.competition,
            government: normalize(metric.government_support, 0.0, 100.0) * w.government,
        };
        let total = raw.growth
            + raw.market
            + raw.size
            + raw.quality
            + raw.commercial
            + raw.attractiveness
            + raw.competition
            + raw.government;
        let score = round1((total * 100.0).clamp(0.0, 100.0));

        let sub_scores = SubScores {
            growth: round1(raw.growth * 100.0),
            market: round1(raw.market * 100.0),
            size: round1(raw.size * 100.0),
            quality: round1(raw.quality * 100.0),
            commercial: round1(raw.commercial * 100.0),
            attractiveness: round1(raw.attractiveness * 100.0),
            competition: round1(raw.competition * 100.0),
            government: round1(raw.government * 100.0),
        };

        Opportunity {
            area: metric.area.clone(),
            score,
            sub_scores,
            cagr_percent: round1(metric.cagr * 100.0),
            market_size: metric.market_size,
            investment_heat: metric.investment_heat,
            government_support: metric.government_support,
            competition: metric.competition,
            avg_quality: metric.avg_quality,
            patent_count: metric.patent_count,
            applicant_count: metric.applicant_count,
            trend: TrendSignal::from_acceleration(metric.acceleration),
            recommendation: recommendation_text(score),
            risk: RiskFactors::assess(metric, &self.risk).tier(&self.risk),
        }
    }

    /// Score every metric and sort by composite score, descending.
    ///
    /// The sort is stable: equal scores keep the order of `metrics`.
    pub fn rank(&self, metrics: &[GrowthMetric]) -> Vec<Opportunity> {
        let mut opportunities: Vec<Opportunity> = metrics.iter().map(|m| self.score(m)).collect();
        opportunities.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        opportunities
    }
}

// ---------------------------------------------------------------------------
// Preference matching
// ---------------------------------------------------------------------------

/// An ad-hoc investor profile for ranking opportunities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorPreferences {
    /// Risk appetite from 0.0 (very conservative) to 1.0 (very aggressive).
    pub risk_appetite: f64,
    pub min_quality: f64,
    pub min_market_size: f64,
    pub max_competition: f64,
    /// Empty means every area is acceptable.
    #[serde(default)]
    pub preferred_areas: Vec<TechArea>,
}

impl Default for InvestorPreferences {
    fn default() -> Self {
        Self {
            risk_appetite: 0.6,
            min_quality: 50.0,
            min_market_size: 60.0,
            max_competition: 70.0,
            preferred_areas: Vec::new(),
        }
    }
}

/// An opportunity ranked against [`InvestorPreferences`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceMatch {
    pub opportunity: Opportunity,
    pub match_percent: f64,
    /// `0.4 * match_percent + 0.6 * score`, the ranking key.
    pub rank_score: f64,
    pub sizing: InvestmentSizing,
}

/// Minimum match percentage kept regardless of composite score.
const MIN_PREFERENCE_MATCH: f64 = 30.0;
/// Composite score kept regardless of match percentage.
const MIN_KEPT_SCORE: f64 = 50.0;

/// Rank opportunities against ad-hoc preferences.
pub fn match_preferences(
    opportunities: &[Opportunity],
    prefs: &InvestorPreferences,
) -> Vec<PreferenceMatch> {
    let mut matches: Vec<PreferenceMatch> = opportunities
        .iter()
        .filter_map(|opp| {
            let mut score = 0.0;
            let mut possible = 0.0;

            let risk_fit = match opp.risk {
                RiskTier::Low | RiskTier::Medium => prefs.risk_appetite >= 0.6,
                RiskTier::MediumHigh | RiskTier::High => prefs.risk_appetite >= 0.8,
            };
            for (hit, weight) in [
                (risk_fit, 1.0),
                (opp.avg_quality >= prefs.min_quality, 1.0),
                (opp.market_size >= prefs.min_market_size, 1.0),
                (opp.competition <= prefs.max_competition, 1.0),
                (
                    prefs.preferred_areas.is_empty() || prefs.preferred_areas.contains(&opp.area),
                    2.0,
                ),
            ] {
                if hit {
                    score += weight;
                }
                possible += weight;
            }

            let match_percent = score / possible * 100.0;
            (match_percent >= MIN_PREFERENCE_MATCH || opp.score >= MIN_KEPT_SCORE).then(|| {
                PreferenceMatch {
                    opportunity: opp.clone(),
                    match_percent: round1(match_percent),
                    rank_score: match_percent * 0.4 + opp.score * 0.6,
                    sizing: InvestmentSizing::advise(opp.score, opp.risk),
                }
            })
        })
        .collect();
    matches.sort_by(|a, b| {
        b.rank_score
            .partial_cmp(&a.rank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches
}
