// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # patent-radar
//!
//! Ranks technology areas as investment opportunities from patent, market,
//! and investor records, and matches investors to those opportunities.
//!
//! ## Architecture
//!
//! - **Aggregator** (`metrics`): per-area patent CAGR, growth acceleration, market join
//! - **Opportunity scoring** (`scoring`): eight weighted sub-scores, trend, risk tier
//! - **Similarity** (`similarity`): standardized feature vectors, cosine matrix
//! - **Affinity** (`affinity`): investor × area collaborative filtering
//! - **Hybrid** (`hybrid`): collaborative affinity blended with opportunity scores
//! - **Investor matching** (`matcher`): weighted rule-based criteria
//! - **Refresh** (`refresh`, `daemon`): all-or-nothing re-ingestion on a schedule
//!
//! ## Library usage
//!
//! ```no_run
//! use patent_radar::engine::Engine;
//! use patent_radar::source::SyntheticSource;
//!
//! let (patents, market, investors) = SyntheticSource::new(42, 2015, 2024, 100).initial_tables();
//! let engine = Engine::new(patents, market, investors).unwrap();
//! for opp in engine.opportunity_scores().iter().take(3) {
//!     println!("{} {:.1} {}", opp.area, opp.score, opp.risk);
//! }
//! ```

pub mod affinity;
pub mod config;
pub mod daemon;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod hybrid;
pub mod insights;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod refresh;
pub mod scoring;
pub mod similarity;
pub mod source;
