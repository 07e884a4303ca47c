//! Refresh coordinator: re-ingests every technology area and republishes the
//! engine's generation, at most one run at a time.
//!
//! The coordinator moves between two states, `Idle` and `Refreshing`, with a
//! single compare-and-swap. A request that finds the coordinator `Refreshing`
//! is skipped and reported as such. A run either publishes a complete new
//! generation or leaves the previous one untouched.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::Engine;
use crate::error::{RefreshError, RefreshResult};
use crate::model::{MarketSnapshot, PatentRecord, TechArea};
use crate::source::DataSource;

/// Scheduled cadence of the background refresh (2 h).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

const IDLE: u8 = 0;
const REFRESHING: u8 = 1;

/// Result of one refresh request.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new generation was published.
    Completed { generation: u64 },
    /// Another refresh was already running; nothing happened.
    Skipped,
    /// The run was abandoned; the previous generation stays published.
    Failed(RefreshError),
}

impl RefreshOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshStatus {
    pub last_update: Option<DateTime<Utc>>,
    pub in_progress: bool,
    pub update_count: u64,
    /// `last_update + interval`; `None` before the first completed refresh.
    pub next_update: Option<DateTime<Utc>>,
}

/// Resets the state flag to `Idle` when the run ends, whichever way it ends.
struct RunGuard<'a>(&'a AtomicU8);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

/// Owns the refresh lifecycle of one engine.
pub struct RefreshCoordinator {
    engine: Arc<Engine>,
    source: Arc<dyn DataSource>,
    interval: Duration,
    state: AtomicU8,
    update_count: AtomicU64,
    last_update: Mutex<Option<DateTime<Utc>>>,
}

impl RefreshCoordinator {
    pub fn new(engine: Arc<Engine>, source: Arc<dyn DataSource>) -> Self {
        Self::with_interval(engine, source, DEFAULT_INTERVAL)
    }

    pub fn with_interval(engine: Arc<Engine>, source: Arc<dyn DataSource>, interval: Duration) -> Self {
        Self {
            engine,
            source,
            interval,
            state: AtomicU8::new(IDLE),
            update_count: AtomicU64::new(0),
            last_update: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one refresh now unless one is already in flight.
    pub fn refresh_now(&self) -> RefreshOutcome {
        if self
            .state
            .compare_exchange(IDLE, REFRESHING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("refresh already in progress, skipping");
            return RefreshOutcome::Skipped;
        }
        let _guard = RunGuard(&self.state);

        tracing::info!("refresh started");
        match self.run() {
            Ok(generation) => {
                let now = Utc::now();
                *self.last_update.lock().unwrap_or_else(|e| e.into_inner()) = Some(now);
                let count = self.update_count.fetch_add(1, Ordering::AcqRel) + 1;
                tracing::info!(generation, update_count = count, "refresh completed");
                RefreshOutcome::Completed { generation }
            }
            Err(err) => {
                tracing::warn!(error = %err, "refresh failed, keeping last good snapshot");
                RefreshOutcome::Failed(err)
            }
        }
    }

    /// Manual trigger. `false` only when the request was skipped because a
    /// refresh was already running; a failed run still counts as accepted.
    pub fn manual_refresh(&self) -> bool {
        !self.refresh_now().is_skipped()
    }

    pub fn refresh_status(&self) -> RefreshStatus {
        let last_update = *self.last_update.lock().unwrap_or_else(|e| e.into_inner());
        let next_update = last_update.and_then(|t| {
            chrono::Duration::from_std(self.interval)
                .ok()
                .and_then(|d| t.checked_add_signed(d))
        });
        RefreshStatus {
            last_update,
            in_progress: self.state.load(Ordering::Acquire) == REFRESHING,
            update_count: self.update_count.load(Ordering::Acquire),
            next_update,
        }
    }

    /// Mark a refresh as in flight without running one.
    #[cfg(test)]
    pub(crate) fn hold_refreshing(&self) {
        self.state.store(REFRESHING, Ordering::Release);
    }

    fn run(&self) -> RefreshResult<u64> {
        let areas = self.engine.tech_areas();

        let mut patents: Vec<PatentRecord> = Vec::new();
        let mut fresh: Vec<MarketSnapshot> = Vec::with_capacity(areas.len());
        for area in &areas {
            let batch = self.source.fetch(area)?;
            tracing::debug!(%area, patents = batch.patents.len(), "fetched area batch");
            patents.extend(batch.patents);
            fresh.push(batch.market);
        }

        let market = merge_market(self.engine.snapshot().dataset().market(), fresh);
        Ok(self.engine.replace_tables(patents, market)?)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("interval", &self.interval)
            .field("status", &self.refresh_status())
            .finish()
    }
}

/// Keep market history, replacing rows whose (area, year) was re-ingested.
fn merge_market(previous: &[MarketSnapshot], fresh: Vec<MarketSnapshot>) -> Vec<MarketSnapshot> {
    let replaced: HashSet<(&TechArea, i32)> = fresh.iter().map(|m| (&m.area, m.year)).collect();
    let mut merged: Vec<MarketSnapshot> = previous
        .iter()
        .filter(|m| !replaced.contains(&(&m.area, m.year)))
        .cloned()
        .collect();
    merged.extend(fresh.iter().cloned());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;
    use crate::error::{FetchError, FetchResult, IngestError};
    use crate::source::AreaBatch;

    struct FixedSource {
        fail: bool,
    }

    impl DataSource for FixedSource {
        fn fetch(&self, area: &TechArea) -> FetchResult<AreaBatch> {
            if self.fail && area.as_str() == "Quantum" {
                return Err(FetchError::Unavailable {
                    area: area.to_string(),
                    message: "offline".into(),
                });
            }
            Ok(AreaBatch {
                patents: vec![
                    patent(&format!("{area}-1"), area.as_str(), 2023, "x"),
                    patent(&format!("{area}-2"), area.as_str(), 2025, "y"),
                ],
                market: snapshot(area.as_str(), 2025),
            })
        }
    }

    fn engine() -> Arc<Engine> {
        Arc::new(
            Engine::new(
                vec![patent("p1", "AI", 2020, "a"), patent("p2", "Quantum", 2021, "q")],
                vec![snapshot("AI", 2024)],
                vec![investor("i1", &["AI"])],
            )
            .unwrap(),
        )
    }

    #[test]
    fn successful_refresh_publishes_and_counts() {
        let engine = engine();
        let coordinator = RefreshCoordinator::new(Arc::clone(&engine), Arc::new(FixedSource { fail: false }));
        assert!(coordinator.manual_refresh());

        let status = coordinator.refresh_status();
        assert_eq!(status.update_count, 1);
        assert!(!status.in_progress);
        let last = status.last_update.unwrap();
        assert_eq!(status.next_update.unwrap() - last, chrono::Duration::hours(2));

        let generation = engine.snapshot();
        assert_eq!(generation.version(), 1);
        assert_eq!(generation.current_year(), 2025);
        assert_eq!(generation.dataset().patents().len(), 4);
        // 2024 history kept, 2025 rows added.
        assert!(generation.dataset().market_for("AI", 2024).is_some());
        assert!(generation.dataset().market_for("Quantum", 2025).is_some());
    }

    #[test]
    fn failed_refresh_leaves_snapshot_intact() {
        let engine = engine();
        let coordinator = RefreshCoordinator::new(Arc::clone(&engine), Arc::new(FixedSource { fail: true }));
        let outcome = coordinator.refresh_now();
        assert!(matches!(outcome, RefreshOutcome::Failed(RefreshError::Fetch { .. })));
        assert!(coordinator.manual_refresh());

        let status = coordinator.refresh_status();
        assert_eq!(status.update_count, 0);
        assert!(status.last_update.is_none());
        assert!(status.next_update.is_none());
        assert!(!status.in_progress);
        assert_eq!(engine.snapshot().version(), 0);
        assert_eq!(engine.snapshot().dataset().patents().len(), 2);
    }

    /// Returns a patent with a quality score above 100.
    struct InvalidSource;

    impl DataSource for InvalidSource {
        fn fetch(&self, area: &TechArea) -> FetchResult<AreaBatch> {
            let mut bad = patent(&format!("{area}-bad"), area.as_str(), 2025, "x");
            bad.quality = 101.0;
            Ok(AreaBatch {
                patents: vec![bad],
                market: snapshot(area.as_str(), 2025),
            })
        }
    }

    #[test]
    fn invalid_batch_is_ingest_failure() {
        let engine = engine();
        let coordinator = RefreshCoordinator::new(Arc::clone(&engine), Arc::new(InvalidSource));
        let outcome = coordinator.refresh_now();
        assert!(matches!(
            outcome,
            RefreshOutcome::Failed(RefreshError::Ingest {
                source: IngestError::OutOfRange { field: "quality", .. }
            })
        ));

        let status = coordinator.refresh_status();
        assert_eq!(status.update_count, 0);
        assert!(status.last_update.is_none());
        assert!(!status.in_progress);
        let generation = engine.snapshot();
        assert_eq!(generation.version(), 0);
        assert_eq!(generation.current_year(), 2024);
        assert!(generation.dataset().market_for("AI", 2025).is_none());
    }

    /// Quantum comes back empty; AI carries a stray Robotics patent.
    struct ShrinkingSource;

    impl DataSource for ShrinkingSource {
        fn fetch(&self, area: &TechArea) -> FetchResult<AreaBatch> {
            let patents = match area.as_str() {
                "AI" => vec![patent("n1", "AI", 2025, "x"), patent("n2", "Robotics", 2025, "r")],
                _ => Vec::new(),
            };
            Ok(AreaBatch {
                patents,
                market: snapshot(area.as_str(), 2025),
            })
        }
    }

    #[test]
    fn refresh_keeps_area_set_fixed() {
        let engine = engine();
        let coordinator = RefreshCoordinator::new(Arc::clone(&engine), Arc::new(ShrinkingSource));
        assert!(matches!(coordinator.refresh_now(), RefreshOutcome::Completed { generation: 1 }));

        let generation = engine.snapshot();
        assert_eq!(engine.tech_areas(), vec![TechArea::from("AI"), TechArea::from("Quantum")]);
        assert_eq!(generation.dataset().patents().len(), 1);
        assert_eq!(generation.dataset().patent_count("Quantum"), 0);
        assert_eq!(generation.metrics().len(), 1);
        assert_eq!(generation.similarity().len(), 2);
        assert!(engine.find_similar("Robotics", 3).is_empty());
    }

    #[test]
    fn busy_coordinator_skips() {
        let coordinator = RefreshCoordinator::new(engine(), Arc::new(FixedSource { fail: false }));
        coordinator.hold_refreshing();
        assert!(coordinator.refresh_now().is_skipped());
        assert!(!coordinator.manual_refresh());
        assert!(coordinator.refresh_status().in_progress);
        assert_eq!(coordinator.refresh_status().update_count, 0);
    }

    #[test]
    fn merge_replaces_matching_rows() {
        let mut newer = snapshot("AI", 2024);
        newer.market_size = 999.0;
        let merged = merge_market(&[snapshot("AI", 2023), snapshot("AI", 2024)], vec![newer]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.iter().find(|m| m.year == 2024).unwrap().market_size, 999.0);
    }
}
