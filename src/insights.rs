//! Market insights and growth comparison views.

use serde::Serialize;

use crate::dataset::Dataset;
use crate::metrics::{GrowthMetric, NEUTRAL_MARKET};
use crate::model::{RiskTier, TechArea};

/// Latest recorded market conditions of one area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketInsight {
    pub area: TechArea,
    pub year: i32,
    pub growth_rate: f64,
    pub market_size: f64,
    pub competition: f64,
    pub investment_heat: f64,
    pub government_support: f64,
    pub risk: RiskTier,
}

/// Insight from the latest-year snapshot of `area`. `None` without market rows.
pub fn market_insights(dataset: &Dataset, area: &str) -> Option<MarketInsight> {
    let m = dataset.latest_market(area)?;
    Some(MarketInsight {
        area: m.area.clone(),
        year: m.year,
        growth_rate: m.growth_rate,
        market_size: m.market_size,
        competition: m.competition,
        investment_heat: m.investment_heat,
        government_support: m.government_support,
        risk: m.risk,
    })
}

/// Patent growth against market growth for one area, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthComparison {
    pub area: TechArea,
    pub patent_growth: f64,
    pub market_growth: f64,
    /// `(cagr + market_growth) * 50`.
    pub combined: f64,
}

/// One row per area of `dataset`. Areas without a metric report zero patent
/// growth and the neutral market growth.
pub fn growth_comparison(dataset: &Dataset, metrics: &[GrowthMetric]) -> Vec<GrowthComparison> {
    dataset
        .areas()
        .iter()
        .map(|area| {
            let (cagr, market) = metrics
                .iter()
                .find(|m| &m.area == area)
                .map_or((0.0, NEUTRAL_MARKET.growth_rate), |m| (m.cagr, m.market_growth));
            GrowthComparison {
                area: area.clone(),
                patent_growth: cagr * 100.0,
                market_growth: market * 100.0,
                combined: (cagr + market) * 50.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;
    use crate::metrics::aggregate;

    #[test]
    fn insight_uses_latest_year() {
        let mut latest = snapshot("AI", 2024);
        latest.market_size = 210.0;
        latest.risk = RiskTier::Low;
        let ds = Dataset::new(
            vec![patent("p1", "AI", 2020, "a")],
            vec![snapshot("AI", 2023), latest],
            vec![],
        )
        .unwrap();
        let insight = market_insights(&ds, "AI").unwrap();
        assert_eq!(insight.year, 2024);
        assert_eq!(insight.market_size, 210.0);
        assert_eq!(insight.risk, RiskTier::Low);
    }

    #[test]
    fn insight_missing_market_is_none() {
        let ds = Dataset::new(vec![patent("p1", "AI", 2020, "a")], vec![], vec![]).unwrap();
        assert!(market_insights(&ds, "AI").is_none());
        assert!(market_insights(&ds, "Unknown").is_none());
    }

    #[test]
    fn comparison_rows_follow_metrics() {
        let ds = Dataset::new(
            vec![patent("p1", "AI", 2020, "a"), patent("p2", "AI", 2022, "a"), patent("p3", "AI", 2022, "b")],
            vec![snapshot("AI", 2024)],
            vec![],
        )
        .unwrap();
        let metrics = aggregate(&ds, 2024);
        let rows = growth_comparison(&ds, &metrics);
        assert_eq!(rows.len(), 1);
        let cagr = 2f64.sqrt() - 1.0;
        assert!((rows[0].patent_growth - cagr * 100.0).abs() < 1e-9);
        assert!((rows[0].market_growth - 20.0).abs() < 1e-9);
        assert!((rows[0].combined - (cagr + 0.2) * 50.0).abs() < 1e-9);

        let fallback = growth_comparison(&ds, &[]);
        assert_eq!(fallback[0].patent_growth, 0.0);
        assert!((fallback[0].market_growth - 10.0).abs() < 1e-9);
    }
}
