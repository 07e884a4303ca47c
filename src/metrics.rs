//! Per-area growth and quality aggregation.
//!
//! Produces one [`GrowthMetric`] per technology area from the patent and
//! market tables. Metrics are recomputed from scratch for every dataset
//! generation and never mutated afterwards.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::model::{MarketSnapshot, PatentRecord, TechArea};

/// Market figures used when an area has no snapshot for the current year.
///
/// These neutral values keep opportunity scores comparable between areas
/// with and without market data.
pub const NEUTRAL_MARKET: MarketFigures = MarketFigures {
    growth_rate: 0.1,
    market_size: 50.0,
    competition: 50.0,
    investment_heat: 50.0,
    government_support: 50.0,
};

/// The market fields an aggregate reads from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketFigures {
    pub growth_rate: f64,
    pub market_size: f64,
    pub competition: f64,
    pub investment_heat: f64,
    pub government_support: f64,
}

impl From<&MarketSnapshot> for MarketFigures {
    fn from(m: &MarketSnapshot) -> Self {
        Self {
            growth_rate: m.growth_rate,
            market_size: m.market_size,
            competition: m.competition,
            investment_heat: m.investment_heat,
            government_support: m.government_support,
        }
    }
}

/// Aggregated growth and quality metrics for one technology area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthMetric {
    pub area: TechArea,
    /// Compound growth rate of yearly patent counts (fraction).
    pub cagr: f64,
    /// Most recent year-over-year growth minus the one before it.
    pub acceleration: f64,
    /// Current-year market growth rate (fraction).
    pub market_growth: f64,
    pub market_size: f64,
    pub competition: f64,
    pub investment_heat: f64,
    pub government_support: f64,
    pub avg_quality: f64,
    pub avg_commercial: f64,
    pub avg_impact: f64,
    pub avg_attractiveness: f64,
    pub patent_count: usize,
    /// Number of distinct applicants.
    pub applicant_count: usize,
    /// Whether market fields came from [`NEUTRAL_MARKET`].
    pub market_fallback: bool,
}

/// Aggregate every area of `dataset`, in area order.
///
/// Market fields come from the snapshot whose year equals `current_year`.
/// Areas with no patents are left out entirely.
pub fn aggregate(dataset: &Dataset, current_year: i32) -> Vec<GrowthMetric> {
    dataset
        .areas()
        .par_iter()
        .filter_map(|area| aggregate_area(dataset, area, current_year))
        .collect()
}

/// Aggregate a single area. `None` when the area has no patents.
pub fn aggregate_area(dataset: &Dataset, area: &TechArea, current_year: i32) -> Option<GrowthMetric> {
    let patents: Vec<&PatentRecord> = dataset.patents_in(area.as_str()).collect();
    if patents.is_empty() {
        return None;
    }

    let yearly = yearly_counts(&patents);
    let cagr = compound_growth(&yearly);
    let acceleration = growth_acceleration(&yearly);

    let (figures, market_fallback) = match dataset.market_for(area.as_str(), current_year) {
        Some(snapshot) => (MarketFigures::from(snapshot), false),
        None => {
            tracing::debug!(%area, current_year, "no current market snapshot, using neutral figures");
            (NEUTRAL_MARKET, true)
        }
    };

    let applicant_count = patents
        .iter()
        .map(|p| p.applicant.as_str())
        .collect::<HashSet<_>>()
        .len();

    Some(GrowthMetric {
        area: area.clone(),
        cagr,
        acceleration,
        market_growth: figures.growth_rate,
        market_size: figures.market_size,
        competition: figures.competition,
        investment_heat: figures.investment_heat,
        government_support: figures.government_support,
        avg_quality: mean(&patents, |p| p.quality),
        avg_commercial: mean(&patents, |p| p.commercial_viability),
        avg_impact: mean(&patents, |p| p.industry_impact),
        avg_attractiveness: mean(&patents, |p| p.investment_attractiveness),
        patent_count: patents.len(),
        applicant_count,
        market_fallback,
    })
}

/// Patent counts keyed by filing year, ascending.
pub fn yearly_counts(patents: &[&PatentRecord]) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for p in patents {
        *counts.entry(p.year).or_insert(0) += 1;
    }
    counts
}

/// `(last / first)^(1 / (last_year - first_year)) - 1`.
///
/// Zero with fewer than two distinct years or a zero first-year count.
pub fn compound_growth(yearly: &BTreeMap<i32, usize>) -> f64 {
    let (Some((&first_year, &first)), Some((&last_year, &last))) =
        (yearly.first_key_value(), yearly.last_key_value())
    else {
        return 0.0;
    };
    let span = last_year - first_year;
    if span <= 0 || first == 0 {
        return 0.0;
    }
    (last as f64 / first as f64).powf(1.0 / span as f64) - 1.0
}

/// Second difference of the three most recent yearly counts.
///
/// Zero with fewer than three distinct years; each growth term is zero when
/// its base count is zero.
pub fn growth_acceleration(yearly: &BTreeMap<i32, usize>) -> f64 {
    if yearly.len() < 3 {
        return 0.0;
    }
    let counts: Vec<f64> = yearly.values().rev().take(3).map(|&c| c as f64).collect();
    let (latest, previous, earlier) = (counts[0], counts[1], counts[2]);
    let recent = if previous > 0.0 {
        (latest - previous) / previous
    } else {
        0.0
    };
    let prior = if earlier > 0.0 {
        (previous - earlier) / earlier
    } else {
        0.0
    };
    recent - prior
}

fn mean(patents: &[&PatentRecord], field: impl Fn(&PatentRecord) -> f64) -> f64 {
    if patents.is_empty() {
        return 0.0;
    }
    patents.iter().map(|&p| field(p)).sum::<f64>() / patents.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;

    fn counts(pairs: &[(i32, usize)]) -> BTreeMap<i32, usize> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn cagr_uses_year_span() {
        let c = counts(&[(2020, 2), (2022, 4)]);
        let expected = 2f64.powf(0.5) - 1.0;
        assert!((compound_growth(&c) - expected).abs() < 1e-12);
    }

    #[test]
    fn cagr_single_year_is_zero() {
        assert_eq!(compound_growth(&counts(&[(2020, 5)])), 0.0);
        assert_eq!(compound_growth(&BTreeMap::new()), 0.0);
    }

    #[test]
    fn acceleration_needs_three_years() {
        assert_eq!(growth_acceleration(&counts(&[(2020, 2), (2021, 4)])), 0.0);
        // recent = (6-4)/4 = 0.5, prior = (4-2)/2 = 1.0
        let acc = growth_acceleration(&counts(&[(2019, 1), (2020, 2), (2021, 4), (2022, 6)]));
        assert!((acc - (0.5 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn missing_market_uses_neutral_figures() {
        let ds = Dataset::new(
            vec![patent("p1", "AI", 2020, "a"), patent("p2", "AI", 2021, "b")],
            vec![snapshot("AI", 2023)],
            vec![],
        )
        .unwrap();
        let metrics = aggregate(&ds, 2024);
        assert_eq!(metrics.len(), 1);
        let m = &metrics[0];
        assert!(m.market_fallback);
        assert_eq!(m.market_growth, 0.1);
        assert_eq!(m.market_size, 50.0);
        assert_eq!(m.competition, 50.0);
        assert_eq!(m.investment_heat, 50.0);
        assert_eq!(m.government_support, 50.0);
    }

    #[test]
    fn current_snapshot_is_read() {
        let ds = Dataset::new(
            vec![patent("p1", "AI", 2020, "a")],
            vec![snapshot("AI", 2023), snapshot("AI", 2024)],
            vec![],
        )
        .unwrap();
        let m = aggregate_area(&ds, &"AI".into(), 2024).unwrap();
        assert!(!m.market_fallback);
        assert_eq!(m.market_size, 150.0);
        assert_eq!(m.market_growth, 0.2);
    }

    #[test]
    fn means_and_diversity() {
        let mut p2 = patent("p2", "AI", 2021, "b");
        p2.quality = 90.0;
        let ds = Dataset::new(
            vec![patent("p1", "AI", 2020, "a"), p2, patent("p3", "AI", 2021, "a")],
            vec![],
            vec![],
        )
        .unwrap();
        let m = aggregate_area(&ds, &"AI".into(), 2024).unwrap();
        assert_eq!(m.patent_count, 3);
        assert_eq!(m.applicant_count, 2);
        assert!((m.avg_quality - (70.0 + 90.0 + 70.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_area_skipped() {
        let ds = Dataset::new(vec![patent("p1", "AI", 2020, "a")], vec![], vec![]).unwrap();
        assert!(aggregate_area(&ds, &"Quantum".into(), 2024).is_none());
    }

    #[test]
    fn output_follows_area_order() {
        let ds = Dataset::new(
            vec![
                patent("p1", "Zeta", 2020, "a"),
                patent("p2", "Alpha", 2020, "a"),
                patent("p3", "Mid", 2020, "a"),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        let labels: Vec<String> = aggregate(&ds, 2024).into_iter().map(|m| m.area.to_string()).collect();
        assert_eq!(labels, vec!["Zeta", "Alpha", "Mid"]);
    }
}
