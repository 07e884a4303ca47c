//! The three raw tables as one validated, immutable batch.
//!
//! A [`Dataset`] is built once per ingestion and never patched. Construction
//! validates every record against the schema and builds an explicit
//! area → patents grouping so downstream components never scan by column.

use std::collections::{HashMap, HashSet};

use crate::error::{IngestError, IngestResult};
use crate::model::{InvestorProfile, MarketSnapshot, PatentRecord, TechArea};

/// Validated patent, market, and investor tables.
#[derive(Debug, Clone)]
pub struct Dataset {
    patents: Vec<PatentRecord>,
    market: Vec<MarketSnapshot>,
    investors: Vec<InvestorProfile>,
    /// Distinct patent areas in first-appearance order.
    areas: Vec<TechArea>,
    /// Patent indices per area.
    by_area: HashMap<TechArea, Vec<usize>>,
}

impl Dataset {
    /// Validate and index the raw tables.
    ///
    /// Fails with [`IngestError::NoPatents`] when the patent table is empty.
    /// Empty market and investor tables are accepted. The area set is derived
    /// here and stays fixed for every later [`Dataset::with_tables`].
    pub fn new(
        patents: Vec<PatentRecord>,
        market: Vec<MarketSnapshot>,
        investors: Vec<InvestorProfile>,
    ) -> IngestResult<Self> {
        validate_tables(&patents, &market)?;
        for investor in &investors {
            validate_investor(investor)?;
        }

        let mut areas: Vec<TechArea> = Vec::new();
        for patent in &patents {
            if !areas.contains(&patent.area) {
                areas.push(patent.area.clone());
            }
        }
        Ok(Self::index(patents, market, investors, areas))
    }

    /// Same investors and area set, new patent and market tables.
    ///
    /// Patents filed under an area outside the set are dropped. Areas of the
    /// set with no patents in the new table stay, with an empty group.
    pub fn with_tables(
        &self,
        patents: Vec<PatentRecord>,
        market: Vec<MarketSnapshot>,
    ) -> IngestResult<Self> {
        validate_tables(&patents, &market)?;
        let total = patents.len();
        let patents: Vec<PatentRecord> = patents
            .into_iter()
            .filter(|p| self.areas.contains(&p.area))
            .collect();
        if patents.is_empty() {
            return Err(IngestError::NoPatents);
        }
        if patents.len() < total {
            tracing::debug!(dropped = total - patents.len(), "patents outside the area set dropped");
        }
        Ok(Self::index(patents, market, self.investors.clone(), self.areas.clone()))
    }

    fn index(
        patents: Vec<PatentRecord>,
        market: Vec<MarketSnapshot>,
        investors: Vec<InvestorProfile>,
        areas: Vec<TechArea>,
    ) -> Self {
        let mut by_area: HashMap<TechArea, Vec<usize>> =
            areas.iter().map(|a| (a.clone(), Vec::new())).collect();
        for (idx, patent) in patents.iter().enumerate() {
            if let Some(group) = by_area.get_mut(&patent.area) {
                group.push(idx);
            }
        }
        Self {
            patents,
            market,
            investors,
            areas,
            by_area,
        }
    }

    pub fn patents(&self) -> &[PatentRecord] {
        &self.patents
    }

    pub fn market(&self) -> &[MarketSnapshot] {
        &self.market
    }

    pub fn investors(&self) -> &[InvestorProfile] {
        &self.investors
    }

    /// The fixed area set, in first-appearance order of the construction-time
    /// patent table. May include areas with no patents after a refresh.
    pub fn areas(&self) -> &[TechArea] {
        &self.areas
    }

    /// Patents filed under `area`. Empty for an unknown area.
    pub fn patents_in<'a>(&'a self, area: &str) -> impl Iterator<Item = &'a PatentRecord> + 'a {
        self.by_area
            .get(area)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |&idx| &self.patents[idx])
    }

    pub fn patent_count(&self, area: &str) -> usize {
        self.by_area.get(area).map_or(0, Vec::len)
    }

    /// The market snapshot for `area` in exactly `year`.
    pub fn market_for(&self, area: &str, year: i32) -> Option<&MarketSnapshot> {
        self.market
            .iter()
            .find(|m| m.area.as_str() == area && m.year == year)
    }

    /// The snapshot for the latest year recorded for `area`.
    pub fn latest_market(&self, area: &str) -> Option<&MarketSnapshot> {
        self.market
            .iter()
            .filter(|m| m.area.as_str() == area)
            .max_by_key(|m| m.year)
    }

    /// Latest year present anywhere in the market table.
    pub fn latest_market_year(&self) -> Option<i32> {
        self.market.iter().map(|m| m.year).max()
    }

    pub fn investor(&self, id: &str) -> Option<&InvestorProfile> {
        self.investors.iter().find(|i| i.id == id)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_score(table: &'static str, id: &str, field: &'static str, value: f64) -> IngestResult<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(IngestError::OutOfRange {
            table,
            id: id.to_string(),
            field,
            value,
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(())
}

fn check_positive(table: &'static str, id: &str, field: &'static str, value: f64) -> IngestResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(IngestError::InvalidValue {
            table,
            id: id.to_string(),
            field,
            requirement: "a positive number",
            value,
        });
    }
    Ok(())
}

/// Patent and market rows, with (area, year) unique in the market table.
fn validate_tables(patents: &[PatentRecord], market: &[MarketSnapshot]) -> IngestResult<()> {
    if patents.is_empty() {
        return Err(IngestError::NoPatents);
    }
    for patent in patents {
        validate_patent(patent)?;
    }
    let mut seen = HashSet::new();
    for snapshot in market {
        validate_snapshot(snapshot)?;
        if !seen.insert((&snapshot.area, snapshot.year)) {
            return Err(IngestError::DuplicateSnapshot {
                area: snapshot.area.to_string(),
                year: snapshot.year,
            });
        }
    }
    Ok(())
}

fn validate_patent(p: &PatentRecord) -> IngestResult<()> {
    const TABLE: &str = "patent";
    if p.id.is_empty() {
        return Err(IngestError::MissingField { table: TABLE, field: "id" });
    }
    if p.area.as_str().is_empty() {
        return Err(IngestError::MissingField { table: TABLE, field: "area" });
    }
    check_score(TABLE, &p.id, "market_potential", p.market_potential)?;
    check_score(TABLE, &p.id, "quality", p.quality)?;
    check_score(TABLE, &p.id, "commercial_viability", p.commercial_viability)?;
    check_score(TABLE, &p.id, "industry_impact", p.industry_impact)?;
    check_score(TABLE, &p.id, "investment_attractiveness", p.investment_attractiveness)
}

fn validate_snapshot(m: &MarketSnapshot) -> IngestResult<()> {
    const TABLE: &str = "market";
    if m.area.as_str().is_empty() {
        return Err(IngestError::MissingField { table: TABLE, field: "area" });
    }
    let id = format!("{}/{}", m.area, m.year);
    if !(m.growth_rate.is_finite() && m.growth_rate >= 0.0) {
        return Err(IngestError::InvalidValue {
            table: TABLE,
            id,
            field: "growth_rate",
            requirement: "a non-negative fraction",
            value: m.growth_rate,
        });
    }
    check_positive(TABLE, &id, "market_size", m.market_size)?;
    check_score(TABLE, &id, "competition", m.competition)?;
    check_score(TABLE, &id, "investment_heat", m.investment_heat)?;
    check_score(TABLE, &id, "government_support", m.government_support)
}

fn validate_investor(i: &InvestorProfile) -> IngestResult<()> {
    const TABLE: &str = "investor";
    if i.id.is_empty() {
        return Err(IngestError::MissingField { table: TABLE, field: "id" });
    }
    if i.focus_areas.is_empty() {
        return Err(IngestError::EmptyFocus {
            investor_id: i.id.clone(),
        });
    }
    check_score(TABLE, &i.id, "min_quality", i.min_quality)?;
    check_positive(TABLE, &i.id, "min_market_size", i.min_market_size)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn empty_patent_table_rejected() {
        let err = Dataset::new(vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, IngestError::NoPatents));
    }

    #[test]
    fn empty_market_and_investors_accepted() {
        let ds = Dataset::new(vec![patent("p1", "AI", 2020, "HKU")], vec![], vec![]).unwrap();
        assert_eq!(ds.areas().len(), 1);
        assert!(ds.latest_market_year().is_none());
    }

    #[test]
    fn areas_keep_first_appearance_order() {
        let ds = Dataset::new(
            vec![
                patent("p1", "Biotech", 2020, "a"),
                patent("p2", "AI", 2020, "a"),
                patent("p3", "Biotech", 2021, "b"),
                patent("p4", "EdTech", 2021, "c"),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        let labels: Vec<&str> = ds.areas().iter().map(TechArea::as_str).collect();
        assert_eq!(labels, vec!["Biotech", "AI", "EdTech"]);
        assert_eq!(ds.patent_count("Biotech"), 2);
        assert_eq!(ds.patents_in("Unknown").count(), 0);
    }

    #[test]
    fn out_of_range_score_rejected() {
        let mut p = patent("p1", "AI", 2020, "HKU");
        p.quality = 101.0;
        let err = Dataset::new(vec![p], vec![], vec![]).unwrap_err();
        assert!(matches!(err, IngestError::OutOfRange { field: "quality", .. }));
    }

    #[test]
    fn nan_score_rejected() {
        let mut p = patent("p1", "AI", 2020, "HKU");
        p.industry_impact = f64::NAN;
        assert!(Dataset::new(vec![p], vec![], vec![]).is_err());
    }

    #[test]
    fn market_rows_validated() {
        let mut m = snapshot("AI", 2024);
        m.market_size = 0.0;
        let err = Dataset::new(vec![patent("p1", "AI", 2020, "x")], vec![m], vec![]).unwrap_err();
        assert!(matches!(err, IngestError::InvalidValue { field: "market_size", .. }));

        let dup = Dataset::new(
            vec![patent("p1", "AI", 2020, "x")],
            vec![snapshot("AI", 2024), snapshot("AI", 2024)],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(dup, IngestError::DuplicateSnapshot { year: 2024, .. }));
    }

    #[test]
    fn investor_needs_focus_areas() {
        let err = Dataset::new(
            vec![patent("p1", "AI", 2020, "x")],
            vec![],
            vec![investor("inv", &[])],
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::EmptyFocus { .. }));
    }

    #[test]
    fn latest_market_picks_max_year() {
        let ds = Dataset::new(
            vec![patent("p1", "AI", 2020, "x")],
            vec![snapshot("AI", 2022), snapshot("AI", 2024), snapshot("AI", 2023)],
            vec![],
        )
        .unwrap();
        assert_eq!(ds.latest_market("AI").unwrap().year, 2024);
        assert_eq!(ds.market_for("AI", 2023).unwrap().year, 2023);
        assert!(ds.market_for("AI", 2019).is_none());
        assert_eq!(ds.latest_market_year(), Some(2024));
    }

    #[test]
    fn area_set_survives_new_tables() {
        let ds = Dataset::new(
            vec![patent("p1", "AI", 2020, "a"), patent("p2", "Biotech", 2021, "b")],
            vec![snapshot("AI", 2024)],
            vec![investor("i", &["AI"])],
        )
        .unwrap();
        let next = ds
            .with_tables(
                vec![
                    patent("n1", "AI", 2023, "a"),
                    patent("n2", "Quantum", 2023, "q"),
                    patent("n3", "AI", 2025, "c"),
                ],
                vec![snapshot("AI", 2025)],
            )
            .unwrap();
        let labels: Vec<&str> = next.areas().iter().map(TechArea::as_str).collect();
        assert_eq!(labels, vec!["AI", "Biotech"]);
        assert_eq!(next.patents().len(), 2);
        assert_eq!(next.patent_count("AI"), 2);
        assert_eq!(next.patent_count("Biotech"), 0);
        assert_eq!(next.patent_count("Quantum"), 0);
        assert_eq!(next.investors().len(), 1);
    }

    #[test]
    fn new_tables_outside_area_set_rejected() {
        let ds = Dataset::new(vec![patent("p1", "AI", 2020, "a")], vec![], vec![]).unwrap();
        let err = ds.with_tables(vec![patent("n1", "Quantum", 2023, "q")], vec![]).unwrap_err();
        assert!(matches!(err, IngestError::NoPatents));

        let mut bad = patent("n2", "AI", 2023, "a");
        bad.quality = 101.0;
        let err = ds.with_tables(vec![bad], vec![]).unwrap_err();
        assert!(matches!(err, IngestError::OutOfRange { field: "quality", .. }));
    }
}
