//! Engine facade: top-level API for the patent-radar system.
//!
//! The `Engine` owns one published [`Generation`]: the validated raw tables
//! plus every structure derived from them. Readers clone the `Arc` of the
//! current generation and compute without holding a lock. A refresh builds a
//! complete new generation off to the side and swaps it in with one write, so
//! no reader ever sees metrics mixed from old and new tables.

use std::sync::{Arc, RwLock};

use crate::affinity::AffinityMatrix;
use crate::dataset::Dataset;
use crate::error::{IngestResult, RadarResult};
use crate::hybrid::{self, HybridConfig, HybridInputs, HybridRecommendation};
use crate::insights::{self, GrowthComparison, MarketInsight};
use crate::matcher::{self, InvestorMatch, MatcherConfig};
use crate::metrics::{self, GrowthMetric};
use crate::model::{InvestorProfile, MarketSnapshot, PatentRecord, TechArea};
use crate::scoring::{
    self, InvestorPreferences, Opportunity, OpportunityScorer, PreferenceMatch, RiskThresholds,
    ScoringWeights,
};
use crate::similarity::{DEFAULT_EPSILON, SimilarityMatrix};

/// Year used when neither the config nor the market table names one.
pub const FALLBACK_CURRENT_YEAR: i32 = 2024;

/// Configuration for the patent-radar engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Year whose market snapshot counts as "current". `None` selects the
    /// latest year present in the market table.
    pub current_year: Option<i32>,
    pub weights: ScoringWeights,
    pub risk: RiskThresholds,
    /// Standardization guard for the similarity engine.
    pub similarity_epsilon: f64,
    pub hybrid: HybridConfig,
    pub matcher: MatcherConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            current_year: None,
            weights: ScoringWeights::default(),
            risk: RiskThresholds::default(),
            similarity_epsilon: DEFAULT_EPSILON,
            hybrid: HybridConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// One internally consistent snapshot of raw tables and derived outputs.
#[derive(Debug)]
pub struct Generation {
    version: u64,
    current_year: i32,
    dataset: Dataset,
    metrics: Vec<GrowthMetric>,
    opportunities: Vec<Opportunity>,
    similarity: SimilarityMatrix,
    affinity: AffinityMatrix,
}

impl Generation {
    /// Derive every output from `dataset`.
    ///
    /// Areas of the set with no patents get a zero feature row and an
    /// affinity column but no metric or opportunity.
    pub fn build(dataset: Dataset, config: &EngineConfig, version: u64) -> Self {
        let current_year = config
            .current_year
            .or_else(|| dataset.latest_market_year())
            .unwrap_or(FALLBACK_CURRENT_YEAR);

        let metrics = metrics::aggregate(&dataset, current_year);
        let opportunities =
            OpportunityScorer::new(config.weights, config.risk).rank(&metrics);
        let similarity = SimilarityMatrix::build(&dataset, config.similarity_epsilon);
        let affinity = AffinityMatrix::build(dataset.investors(), dataset.areas());

        tracing::info!(
            current_year,
            areas = dataset.areas().len(),
            patents = dataset.patents().len(),
            investors = dataset.investors().len(),
            "built engine generation"
        );

        Self {
            version,
            current_year,
            dataset,
            metrics,
            opportunities,
            similarity,
            affinity,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn metrics(&self) -> &[GrowthMetric] {
        &self.metrics
    }

    pub fn opportunities(&self) -> &[Opportunity] {
        &self.opportunities
    }

    pub fn similarity(&self) -> &SimilarityMatrix {
        &self.similarity
    }

    pub fn affinity(&self) -> &AffinityMatrix {
        &self.affinity
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The scoring and recommendation engine.
pub struct Engine {
    config: EngineConfig,
    current: RwLock<Arc<Generation>>,
}

impl Engine {
    /// Create an engine with the default configuration.
    ///
    /// Fails when `patents` is empty or any record violates the schema.
    pub fn new(
        patents: Vec<PatentRecord>,
        market: Vec<MarketSnapshot>,
        investors: Vec<InvestorProfile>,
    ) -> RadarResult<Self> {
        Self::with_config(EngineConfig::default(), patents, market, investors)
    }

    /// Create an engine with the given configuration.
    pub fn with_config(
        config: EngineConfig,
        patents: Vec<PatentRecord>,
        market: Vec<MarketSnapshot>,
        investors: Vec<InvestorProfile>,
    ) -> RadarResult<Self> {
        let dataset = Dataset::new(patents, market, investors)?;
        tracing::info!(areas = dataset.areas().len(), "initializing patent-radar engine");
        let generation = Generation::build(dataset, &config, 0);
        Ok(Self {
            config,
            current: RwLock::new(Arc::new(generation)),
        })
    }

    /// The currently published generation.
    pub fn snapshot(&self) -> Arc<Generation> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Validate new patent and market tables, derive a full generation, and
    /// publish it. Investors and the area set carry over. On error nothing is
    /// published.
    ///
    /// The version is assigned under the write lock, so concurrent callers
    /// publish strictly increasing versions.
    pub(crate) fn replace_tables(
        &self,
        patents: Vec<PatentRecord>,
        market: Vec<MarketSnapshot>,
    ) -> IngestResult<u64> {
        let dataset = self.snapshot().dataset().with_tables(patents, market)?;
        let mut generation = Generation::build(dataset, &self.config, 0);

        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        generation.version = guard.version() + 1;
        let version = generation.version;
        *guard = Arc::new(generation);
        drop(guard);

        tracing::info!(version, "published engine generation");
        Ok(version)
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Technology areas of the current generation.
    pub fn tech_areas(&self) -> Vec<TechArea> {
        self.snapshot().dataset().areas().to_vec()
    }

    /// Growth metrics per area, in area order.
    pub fn growth_metrics(&self) -> Vec<GrowthMetric> {
        self.snapshot().metrics().to_vec()
    }

    /// Opportunities ranked by composite score, descending.
    pub fn opportunity_scores(&self) -> Vec<Opportunity> {
        self.snapshot().opportunities().to_vec()
    }

    /// The `k` areas most similar to `area`. Empty for an unknown area.
    pub fn find_similar(&self, area: &str, k: usize) -> Vec<(TechArea, f64)> {
        self.snapshot().similarity().find_similar(area, k)
    }

    /// Collaborative-filtering recommendations. Empty for an unknown investor.
    pub fn collaborative_recommend(&self, investor_id: &str, k: usize) -> Vec<(TechArea, f64)> {
        self.snapshot()
            .affinity()
            .collaborative_recommend(investor_id, k, self.config.hybrid.neighbours)
    }

    /// Hybrid recommendations. Empty for an unknown investor.
    pub fn hybrid_recommend(&self, investor_id: &str, k: usize) -> Vec<HybridRecommendation> {
        let generation = self.snapshot();
        let inputs = HybridInputs {
            affinity: generation.affinity(),
            similarity: generation.similarity(),
            opportunities: generation.opportunities(),
            config: &self.config.hybrid,
        };
        hybrid::hybrid_recommend(&inputs, generation.dataset().investor(investor_id), k)
    }

    /// Investors suited to `area`, best match first. Empty for an area
    /// without patents.
    pub fn recommend_investors(&self, area: &str, k: usize) -> Vec<InvestorMatch> {
        let generation = self.snapshot();
        matcher::recommend_investors(
            generation.dataset(),
            area,
            generation.current_year(),
            k,
            &self.config.matcher,
        )
    }

    /// Latest market conditions of `area`.
    pub fn market_insights(&self, area: &str) -> Option<MarketInsight> {
        insights::market_insights(self.snapshot().dataset(), area)
    }

    /// Patent growth against market growth, per area.
    pub fn growth_comparison(&self) -> Vec<GrowthComparison> {
        let generation = self.snapshot();
        insights::growth_comparison(generation.dataset(), generation.metrics())
    }

    /// Opportunities ranked against ad-hoc investor preferences.
    pub fn match_preferences(&self, prefs: &InvestorPreferences) -> Vec<PreferenceMatch> {
        scoring::match_preferences(self.snapshot().opportunities(), prefs)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let generation = self.snapshot();
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("version", &generation.version())
            .field("areas", &generation.dataset().areas().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;
    use crate::error::RadarError;

    fn engine() -> Engine {
        Engine::new(
            vec![
                patent("p1", "AI", 2020, "a"),
                patent("p2", "AI", 2022, "b"),
                patent("p3", "Biotech", 2021, "c"),
            ],
            vec![snapshot("AI", 2023), snapshot("AI", 2024), snapshot("Biotech", 2024)],
            vec![investor("i1", &["AI"]), investor("i2", &["AI", "Biotech"])],
        )
        .unwrap()
    }

    #[test]
    fn empty_patents_rejected() {
        let err = Engine::new(vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, RadarError::Ingest(_)));
    }

    #[test]
    fn current_year_defaults_to_latest_market_year() {
        let e = engine();
        assert_eq!(e.snapshot().current_year(), 2024);
        assert_eq!(e.snapshot().version(), 0);
    }

    #[test]
    fn current_year_from_config() {
        let e = Engine::with_config(
            EngineConfig {
                current_year: Some(2023),
                ..Default::default()
            },
            vec![patent("p1", "AI", 2020, "a")],
            vec![snapshot("AI", 2023), snapshot("AI", 2024)],
            vec![],
        )
        .unwrap();
        assert_eq!(e.snapshot().current_year(), 2023);
        assert!(!e.growth_metrics()[0].market_fallback);
    }

    #[test]
    fn replace_tables_publishes_new_generation() {
        let e = engine();
        let before = e.snapshot();
        let version = e
            .replace_tables(vec![patent("n1", "AI", 2025, "q")], vec![snapshot("AI", 2025)])
            .unwrap();
        assert_eq!(version, 1);
        let after = e.snapshot();
        assert_eq!(after.current_year(), 2025);
        assert_eq!(after.dataset().patents().len(), 1);
        // Investors carry over.
        assert_eq!(after.dataset().investors().len(), 2);
        // Readers holding the old generation still see it intact.
        assert_eq!(before.dataset().patents().len(), 3);
        assert_eq!(before.version(), 0);
    }

    #[test]
    fn area_set_is_fixed_across_refreshes() {
        let e = engine();
        e.replace_tables(
            vec![patent("n1", "AI", 2023, "a"), patent("n2", "Quantum", 2024, "q")],
            vec![snapshot("AI", 2024)],
        )
        .unwrap();
        let generation = e.snapshot();
        assert_eq!(e.tech_areas(), vec![TechArea::from("AI"), TechArea::from("Biotech")]);

        // Biotech lost its patents: no metric, but it keeps a zero row and column.
        assert_eq!(generation.metrics().len(), 1);
        assert_eq!(generation.similarity().len(), 2);
        assert!(e.find_similar("Quantum", 3).is_empty());
        assert_eq!(e.find_similar("AI", 3).len(), 1);
        let collab = e.collaborative_recommend("i1", 5);
        assert_eq!(collab.len(), 1);
        assert_eq!(collab[0].0.as_str(), "Biotech");
        assert!((collab[0].1 - 1.0 / 2.0_f64.sqrt()).abs() < 1e-12);
        assert!(e.recommend_investors("Biotech", 3).is_empty());

        // Its hybrid content score falls back to 0.5.
        let recs = e.hybrid_recommend("i1", 5);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].area.as_str(), "Biotech");
        let expected = 0.6 / 2.0_f64.sqrt() + 0.4 * 0.5;
        assert!((recs[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn failed_replace_keeps_published_generation() {
        let e = engine();
        assert!(e.replace_tables(vec![], vec![]).is_err());
        assert_eq!(e.snapshot().version(), 0);
        assert_eq!(e.tech_areas().len(), 2);
    }

    #[test]
    fn concurrent_replacements_get_distinct_versions() {
        let e = Arc::new(engine());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let e = Arc::clone(&e);
                std::thread::spawn(move || {
                    e.replace_tables(vec![patent(&format!("n{i}"), "AI", 2024, "a")], vec![])
                        .unwrap()
                })
            })
            .collect();
        let mut versions: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (1..=8).collect::<Vec<_>>());
        assert_eq!(e.snapshot().version(), 8);
    }

    #[test]
    fn lookups_of_unknown_keys_are_empty() {
        let e = engine();
        assert!(e.find_similar("Nope", 3).is_empty());
        assert!(e.collaborative_recommend("nobody", 3).is_empty());
        assert!(e.hybrid_recommend("nobody", 3).is_empty());
        assert!(e.recommend_investors("Nope", 3).is_empty());
        assert!(e.market_insights("Nope").is_none());
    }

    #[test]
    fn opportunities_sorted() {
        let opps = engine().opportunity_scores();
        assert_eq!(opps.len(), 2);
        assert!(opps[0].score >= opps[1].score);
    }
}
