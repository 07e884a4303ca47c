//! Data-producing collaborators.
//!
//! The engine does not care where records come from. A [`DataSource`] lists
//! the technology areas it covers and, per area, returns a batch of patents
//! plus the current-year market snapshot. [`SyntheticSource`] is a seeded
//! generator with per-area profiles, used by the CLI and in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;
use crate::model::{
    InvestorProfile, InvestorType, MarketSnapshot, MaturityStage, PatentRecord, RiskTier, TechArea,
};

/// One area's re-ingested records.
#[derive(Debug, Clone)]
pub struct AreaBatch {
    pub patents: Vec<PatentRecord>,
    pub market: MarketSnapshot,
}

/// A producer of patent and market records.
///
/// A refresh asks for every area of the engine's fixed area set.
pub trait DataSource: Send + Sync {
    /// Patents and the current-year market snapshot for `area`.
    fn fetch(&self, area: &TechArea) -> FetchResult<AreaBatch>;
}

// ---------------------------------------------------------------------------
// Area profiles
// ---------------------------------------------------------------------------

/// Characteristics the synthetic generator draws around.
#[derive(Debug, Clone, Copy)]
pub struct AreaProfile {
    pub name: &'static str,
    pub growth_rate: f64,
    pub market_size: f64,
    pub applicants: &'static [&'static str],
}

pub const DEFAULT_PROFILES: &[AreaProfile] = &[
    AreaProfile {
        name: "FinTech",
        growth_rate: 0.18,
        market_size: 200.0,
        applicants: &["HSBC", "Standard Chartered", "WeLab", "ZA Bank", "Ant Group", "Tencent"],
    },
    AreaProfile {
        name: "AI and Machine Learning",
        growth_rate: 0.28,
        market_size: 250.0,
        applicants: &["SenseTime", "HKUST", "CUHK", "HKU", "Baidu Research"],
    },
    AreaProfile {
        name: "Biotechnology",
        growth_rate: 0.22,
        market_size: 180.0,
        applicants: &["Prenetics", "HKU Med", "GeneHarbor", "Biotech Labs"],
    },
    AreaProfile {
        name: "Smart City",
        growth_rate: 0.16,
        market_size: 220.0,
        applicants: &["HKT", "HK Electric", "MTR Corporation", "UrbanTech Solutions"],
    },
    AreaProfile {
        name: "HealthTech",
        growth_rate: 0.25,
        market_size: 190.0,
        applicants: &["Prenetics", "DoctorNow", "MedTech Innovations"],
    },
    AreaProfile {
        name: "Green Technology",
        growth_rate: 0.21,
        market_size: 150.0,
        applicants: &["CLP Power", "Green Energy Tech", "EcoTech Solutions"],
    },
    AreaProfile {
        name: "EdTech",
        growth_rate: 0.19,
        market_size: 120.0,
        applicants: &["Online Learning Platform", "EduTech Startups", "LearnTech HK"],
    },
    AreaProfile {
        name: "Logistics Technology",
        growth_rate: 0.17,
        market_size: 160.0,
        applicants: &["Lalamove", "GoGoVan", "SF Express", "DHL Hong Kong"],
    },
    AreaProfile {
        name: "Cybersecurity",
        growth_rate: 0.24,
        market_size: 140.0,
        applicants: &["SafeNet Solutions", "HKUST Security Lab", "Digital Protection Ltd"],
    },
    AreaProfile {
        name: "Quantum Computing",
        growth_rate: 0.30,
        market_size: 90.0,
        applicants: &["HKU Quantum Lab", "CUHK Research", "QuantumTech HK"],
    },
];

const STAGE_WEIGHTS: [u32; 5] = [10, 20, 30, 25, 15];

// ---------------------------------------------------------------------------
// Synthetic source
// ---------------------------------------------------------------------------

/// Seeded synthetic producer. Each `fetch` draws a fresh batch; the sequence
/// of batches is reproducible for a given seed.
#[derive(Debug)]
pub struct SyntheticSource {
    seed: u64,
    first_year: i32,
    current_year: i32,
    patents_per_area: usize,
    profiles: Vec<AreaProfile>,
    draws: AtomicU64,
}

impl SyntheticSource {
    /// A `first_year` after `current_year` is clamped to `current_year`.
    pub fn new(seed: u64, first_year: i32, current_year: i32, patents_per_area: usize) -> Self {
        Self {
            seed,
            first_year: first_year.min(current_year),
            current_year,
            patents_per_area,
            profiles: DEFAULT_PROFILES.to_vec(),
            draws: AtomicU64::new(0),
        }
    }

    pub fn with_profiles(mut self, profiles: Vec<AreaProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    fn rng_for(&self, salt: u64) -> StdRng {
        let draw = self.draws.fetch_add(1, Ordering::Relaxed);
        StdRng::seed_from_u64(self.seed ^ salt.rotate_left(17) ^ draw.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn profile(&self, area: &TechArea) -> Option<(usize, &AreaProfile)> {
        self.profiles
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == area.as_str())
    }

    /// Full initial tables: patents for every profile, one market row per
    /// area and year, and the investor roster.
    pub fn initial_tables(&self) -> (Vec<PatentRecord>, Vec<MarketSnapshot>, Vec<InvestorProfile>) {
        let mut patents = Vec::new();
        let mut market = Vec::new();
        for (idx, profile) in self.profiles.iter().enumerate() {
            let mut rng = self.rng_for(idx as u64);
            patents.extend(self.draw_patents(&mut rng, idx, profile));
            for year in self.first_year..=self.current_year {
                market.push(self.draw_market(&mut rng, profile, year));
            }
        }
        (patents, market, investor_roster())
    }

    fn draw_patents(&self, rng: &mut StdRng, area_idx: usize, profile: &AreaProfile) -> Vec<PatentRecord> {
        let stages = WeightedIndex::new(STAGE_WEIGHTS).ok();
        let base_citations = (profile.growth_rate * 80.0).round() as u32;
        (0..self.patents_per_area)
            .map(|i| {
                let year = rng.gen_range(self.first_year..=self.current_year);
                let citations = rng.gen_range(0..=base_citations * 2);
                let quality = (f64::from(citations.min(100)) / 100.0
                    + rng.gen_range(0.6..1.0)
                    + rng.gen_range(0.5..0.95)
                    + rng.gen_range(0.4..0.9))
                    / 4.0
                    * 100.0;
                let potential = (profile.market_size / 2.0 + rng.gen_range(-25.0..25.0)).clamp(10.0, 100.0);
                let maturity = stages
                    .as_ref()
                    .map_or(MaturityStage::Growth, |w| MaturityStage::ALL[w.sample(rng)]);
                let applicant = profile
                    .applicants
                    .choose(rng)
                    .copied()
                    .unwrap_or("Independent Inventor");
                PatentRecord {
                    id: format!("HK{year}{area_idx:02}{i:06}"),
                    title: format!("{} invention {i}", profile.name),
                    summary: format!("A technical solution in the field of {}", profile.name),
                    area: TechArea::from(profile.name),
                    year,
                    applicant: applicant.to_string(),
                    citations,
                    market_potential: potential.round(),
                    quality: (quality * 10.0).round() / 10.0,
                    commercial_viability: f64::from(rng.gen_range(40..=95_u32)),
                    industry_impact: f64::from(rng.gen_range(30..=98_u32)),
                    investment_attractiveness: f64::from(rng.gen_range(35..=96_u32)),
                    maturity,
                }
            })
            .collect()
    }

    fn draw_market(&self, rng: &mut StdRng, profile: &AreaProfile, year: i32) -> MarketSnapshot {
        let span = (self.current_year - self.first_year).max(1) as f64;
        let progress = f64::from(year - self.first_year) / span;
        let variation = if progress < 0.3 {
            rng.gen_range(-0.05..0.08)
        } else if progress < 0.7 {
            rng.gen_range(-0.02..0.05)
        } else {
            rng.gen_range(-0.03..0.03)
        };
        let growth_rate = (profile.growth_rate + variation).max(0.03);
        let market_size = (profile.market_size * (1.0 + growth_rate).powf(progress)).round();
        let competition: f64 = rng.gen_range(25.0..75.0_f64).round();
        let investment_heat =
            (50.0 + growth_rate * 200.0 + market_size / 10.0 - competition / 2.0).clamp(25.0, 95.0).round();
        let risk_score = competition / 100.0 + (0.5 - growth_rate).max(0.0);
        let risk = if risk_score < 0.3 {
            RiskTier::Low
        } else if risk_score < 0.6 {
            RiskTier::Medium
        } else {
            RiskTier::High
        };
        MarketSnapshot {
            area: TechArea::from(profile.name),
            year,
            growth_rate: (growth_rate * 10_000.0).round() / 10_000.0,
            market_size,
            competition,
            investment_heat,
            government_support: f64::from(rng.gen_range(45..=95_u32)),
            risk,
        }
    }
}

impl DataSource for SyntheticSource {
    fn fetch(&self, area: &TechArea) -> FetchResult<AreaBatch> {
        let Some((idx, profile)) = self.profile(area) else {
            return Err(crate::error::FetchError::Unavailable {
                area: area.to_string(),
                message: "no synthetic profile for this area".into(),
            });
        };
        let mut rng = self.rng_for(idx as u64);
        let patents = self.draw_patents(&mut rng, idx, profile);
        let market = self.draw_market(&mut rng, profile, self.current_year);
        Ok(AreaBatch { patents, market })
    }
}

// ---------------------------------------------------------------------------
// Investors
// ---------------------------------------------------------------------------

struct InvestorTemplate {
    investor_type: InvestorType,
    risk_tolerance: &'static str,
    investment_size: &'static str,
    horizon: &'static str,
    sectors: &'static [&'static str],
    preferred_stage: &'static str,
    min_quality: f64,
    min_market_size: f64,
}

const INVESTOR_TEMPLATES: &[InvestorTemplate] = &[
    InvestorTemplate {
        investor_type: InvestorType::VcFirm,
        risk_tolerance: "High",
        investment_size: "10-50M HKD",
        horizon: "5-10 years",
        sectors: &["AI and Machine Learning", "FinTech", "Biotechnology", "Quantum Computing"],
        preferred_stage: "Early Stage",
        min_quality: 60.0,
        min_market_size: 80.0,
    },
    InvestorTemplate {
        investor_type: InvestorType::Angel,
        risk_tolerance: "Medium-High",
        investment_size: "1-5M HKD",
        horizon: "3-7 years",
        sectors: &["HealthTech", "EdTech", "Green Technology"],
        preferred_stage: "Seed Stage",
        min_quality: 50.0,
        min_market_size: 50.0,
    },
    InvestorTemplate {
        investor_type: InvestorType::CorporateVc,
        risk_tolerance: "Medium",
        investment_size: "20-100M HKD",
        horizon: "Strategic",
        sectors: &["Smart City", "Logistics Technology", "Cybersecurity"],
        preferred_stage: "Growth Stage",
        min_quality: 70.0,
        min_market_size: 120.0,
    },
    InvestorTemplate {
        investor_type: InvestorType::GovernmentFund,
        risk_tolerance: "Low-Medium",
        investment_size: "50-200M HKD",
        horizon: "Long-term",
        sectors: &["Green Technology", "EdTech", "Smart City", "HealthTech"],
        preferred_stage: "All Stages",
        min_quality: 65.0,
        min_market_size: 100.0,
    },
    InvestorTemplate {
        investor_type: InvestorType::PrivateEquity,
        risk_tolerance: "Medium",
        investment_size: "100-500M HKD",
        horizon: "3-5 years",
        sectors: &["FinTech", "AI and Machine Learning", "Biotechnology"],
        preferred_stage: "Mature",
        min_quality: 75.0,
        min_market_size: 150.0,
    },
];

/// Three investors per institution template.
pub fn investor_roster() -> Vec<InvestorProfile> {
    INVESTOR_TEMPLATES
        .iter()
        .enumerate()
        .flat_map(|(i, t)| {
            (1..=3).map(move |j| InvestorProfile {
                id: format!("{}_{}_{j}", t.investor_type, i + 1),
                name: format!("{} Investor {}-{j}", t.investor_type, i + 1),
                investor_type: t.investor_type,
                risk_tolerance: t.risk_tolerance.into(),
                investment_size: t.investment_size.into(),
                horizon: t.horizon.into(),
                focus_areas: t.sectors.iter().map(|s| TechArea::from(*s)).collect(),
                preferred_stage: t.preferred_stage.into(),
                min_quality: t.min_quality,
                min_market_size: t.min_market_size,
            })
        })
        .collect()
}

/// Settings of the built-in synthetic producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub first_year: i32,
    pub current_year: i32,
    pub patents_per_area: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            first_year: 2010,
            current_year: 2024,
            patents_per_area: 150,
        }
    }
}

impl SyntheticConfig {
    pub fn build(&self) -> SyntheticSource {
        SyntheticSource::new(self.seed, self.first_year, self.current_year, self.patents_per_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    #[test]
    fn initial_tables_validate() {
        let source = SyntheticSource::new(7, 2018, 2024, 20);
        let (patents, market, investors) = source.initial_tables();
        assert_eq!(patents.len(), DEFAULT_PROFILES.len() * 20);
        assert_eq!(market.len(), DEFAULT_PROFILES.len() * 7);
        assert_eq!(investors.len(), 15);
        let ds = Dataset::new(patents, market, investors).unwrap();
        assert_eq!(ds.areas().len(), DEFAULT_PROFILES.len());
    }

    #[test]
    fn fetch_returns_current_year_snapshot() {
        let source = SyntheticSource::new(7, 2020, 2024, 10);
        let batch = source.fetch(&"EdTech".into()).unwrap();
        assert_eq!(batch.patents.len(), 10);
        assert_eq!(batch.market.year, 2024);
        assert!(batch.patents.iter().all(|p| (2020..=2024).contains(&p.year)));
        assert!(batch.market.market_size > 0.0);
    }

    #[test]
    fn inverted_year_range_collapses_to_current_year() {
        let source = SyntheticSource::new(1, 2025, 2024, 3);
        let (patents, market, _) = source.initial_tables();
        assert_eq!(patents.len(), DEFAULT_PROFILES.len() * 3);
        assert!(patents.iter().all(|p| p.year == 2024));
        assert_eq!(market.len(), DEFAULT_PROFILES.len());
        let batch = source.fetch(&"EdTech".into()).unwrap();
        assert!(batch.patents.iter().all(|p| p.year == 2024));
    }

    #[test]
    fn unknown_area_is_unavailable() {
        let source = SyntheticSource::new(7, 2020, 2024, 10);
        assert!(source.fetch(&"Nope".into()).is_err());
    }

    #[test]
    fn sequence_is_reproducible() {
        let a = SyntheticSource::new(99, 2020, 2024, 5);
        let b = SyntheticSource::new(99, 2020, 2024, 5);
        let area = TechArea::from("FinTech");
        assert_eq!(a.fetch(&area).unwrap().patents, b.fetch(&area).unwrap().patents);
    }

    #[test]
    fn roster_ids_unique() {
        let roster = investor_roster();
        let ids: std::collections::HashSet<_> = roster.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), roster.len());
        assert_eq!(roster[0].id, "VC_Firm_1_1");
    }
}
