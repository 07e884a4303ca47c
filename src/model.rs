//! Typed records for the three raw tables and their categorical fields.
//!
//! Records are plain immutable values. A batch of records is always replaced
//! wholesale; nothing in the engine mutates a record after ingestion.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Technology area
// ---------------------------------------------------------------------------

/// A technology area label, e.g. `"AI and Machine Learning"`.
///
/// The set of known areas is derived from the patent table at construction
/// time, so this is a string newtype rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechArea(String);

impl TechArea {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TechArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TechArea {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TechArea {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for TechArea {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Categorical fields
// ---------------------------------------------------------------------------

/// Technology maturity stage of a patent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaturityStage {
    Research,
    Prototype,
    #[serde(rename = "Early Adoption")]
    EarlyAdoption,
    Growth,
    Mature,
}

impl MaturityStage {
    pub const ALL: [MaturityStage; 5] = [
        MaturityStage::Research,
        MaturityStage::Prototype,
        MaturityStage::EarlyAdoption,
        MaturityStage::Growth,
        MaturityStage::Mature,
    ];

    /// Human-readable label, also used for substring matching against an
    /// investor's free-text preferred stage.
    pub fn label(self) -> &'static str {
        match self {
            Self::Research => "Research",
            Self::Prototype => "Prototype",
            Self::EarlyAdoption => "Early Adoption",
            Self::Growth => "Growth",
            Self::Mature => "Mature",
        }
    }
}

impl fmt::Display for MaturityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Risk tier, used both for market snapshots (Low/Medium/High) and for the
/// opportunity risk vote (which adds Medium-High).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    #[serde(rename = "Medium-High")]
    MediumHigh,
    High,
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::MediumHigh => "Medium-High",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of investing institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestorType {
    #[serde(rename = "VC_Firm")]
    VcFirm,
    #[serde(rename = "Angel_Investor")]
    Angel,
    #[serde(rename = "Corporate_VC")]
    CorporateVc,
    #[serde(rename = "Government_Fund")]
    GovernmentFund,
    #[serde(rename = "Private_Equity")]
    PrivateEquity,
}

impl InvestorType {
    pub fn label(self) -> &'static str {
        match self {
            Self::VcFirm => "VC_Firm",
            Self::Angel => "Angel_Investor",
            Self::CorporateVc => "Corporate_VC",
            Self::GovernmentFund => "Government_Fund",
            Self::PrivateEquity => "Private_Equity",
        }
    }
}

impl fmt::Display for InvestorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One patent filing. All scores are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub area: TechArea,
    /// Filing year.
    pub year: i32,
    pub applicant: String,
    pub citations: u32,
    pub market_potential: f64,
    pub quality: f64,
    pub commercial_viability: f64,
    pub industry_impact: f64,
    pub investment_attractiveness: f64,
    pub maturity: MaturityStage,
}

/// Market conditions for one technology area in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub area: TechArea,
    pub year: i32,
    /// Fractional growth rate, e.g. `0.25` for 25%.
    pub growth_rate: f64,
    /// Market size in abstract currency units.
    pub market_size: f64,
    pub competition: f64,
    pub investment_heat: f64,
    pub government_support: f64,
    pub risk: RiskTier,
}

/// An investor and the thresholds it applies to opportunities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorProfile {
    pub id: String,
    pub name: String,
    pub investor_type: InvestorType,
    pub risk_tolerance: String,
    pub investment_size: String,
    pub horizon: String,
    /// Focus areas in the investor's stated order. The first entry seeds the
    /// content-similarity fallback of the hybrid recommender.
    pub focus_areas: Vec<TechArea>,
    pub preferred_stage: String,
    pub min_quality: f64,
    pub min_market_size: f64,
}

impl InvestorProfile {
    pub fn focuses_on(&self, area: &str) -> bool {
        self.focus_areas.iter().any(|a| a.as_str() == area)
    }
}
