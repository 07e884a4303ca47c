//! TOML configuration for the engine, the refresh cadence, and the built-in
//! synthetic producer.
//!
//! Every section and field is optional; a missing file section falls back to
//! the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::daemon::DaemonConfig;
use crate::engine::EngineConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::hybrid::HybridConfig;
use crate::matcher::MatcherConfig;
use crate::scoring::{RiskThresholds, ScoringWeights};
use crate::similarity::DEFAULT_EPSILON;
use crate::source::SyntheticConfig;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadarConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub risk: RiskThresholds,
    #[serde(default)]
    pub similarity: SimilaritySection,
    #[serde(default)]
    pub hybrid: HybridConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub refresh: RefreshSection,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    /// Year whose market snapshot is "current". Absent: latest market year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilaritySection {
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

impl Default for SimilaritySection {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshSection {
    /// Seconds between scheduled refreshes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds to wait after a failed refresh.
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retry_secs: default_retry_secs(),
        }
    }
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn default_interval_secs() -> u64 {
    7200
}

fn default_retry_secs() -> u64 {
    300
}

impl RadarConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Range checks serde cannot express.
    fn validate(&self, path: &Path) -> ConfigResult<()> {
        let synthetic = &self.synthetic;
        if synthetic.first_year > synthetic.current_year {
            return Err(ConfigError::Invalid {
                path: path.display().to_string(),
                field: "synthetic.first_year",
                message: format!(
                    "{} is after synthetic.current_year {}",
                    synthetic.first_year, synthetic.current_year
                ),
            });
        }
        Ok(())
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            current_year: self.engine.current_year,
            weights: self.scoring,
            risk: self.risk,
            similarity_epsilon: self.similarity.epsilon,
            hybrid: self.hybrid,
            matcher: self.matcher,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    pub fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            interval: self.refresh_interval(),
            retry_interval: Duration::from_secs(self.refresh.retry_secs),
            max_cycles: 0,
        }
    }
}
