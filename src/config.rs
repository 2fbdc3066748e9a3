//! Node configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::history::DEFAULT_CAPACITY;
use crate::predictor::{
    ConfidenceTable, PredictorSettings, RulePolicy, DEFAULT_MIN_HISTORY,
};
use crate::upstream::{DEFAULT_TIMEOUT_SECS, DEFAULT_UPSTREAM_URL};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Draw feed URL
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Rule set: "strict" or "lenient"
    #[serde(default)]
    pub policy: RulePolicy,

    /// History length required before rules run
    #[serde(default = "default_min_history")]
    pub min_history: usize,

    /// Per-rule confidence overrides on top of the policy's table
    #[serde(default)]
    pub confidence: ConfidenceOverrides,
}

/// Optional per-rule confidence values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceOverrides {
    pub oscillation: Option<u8>,
    pub streak_break: Option<u8>,
    pub streak_follow: Option<u8>,
    pub cadence: Option<u8>,
    pub repeat_window: Option<u8>,
    pub reversal: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of outcomes retained
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

// Defaults
fn default_port() -> u16 { 3000 }
fn default_upstream_url() -> String { DEFAULT_UPSTREAM_URL.to_string() }
fn default_timeout_secs() -> u64 { DEFAULT_TIMEOUT_SECS }
fn default_min_history() -> usize { DEFAULT_MIN_HISTORY }
fn default_capacity() -> usize { DEFAULT_CAPACITY }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            policy: RulePolicy::default(),
            min_history: default_min_history(),
            confidence: ConfidenceOverrides::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: default_capacity() }
    }
}

impl ConfidenceOverrides {
    pub fn apply(&self, table: &mut ConfidenceTable) {
        let pairs = [
            (self.oscillation, &mut table.oscillation),
            (self.streak_break, &mut table.streak_break),
            (self.streak_follow, &mut table.streak_follow),
            (self.cadence, &mut table.cadence),
            (self.repeat_window, &mut table.repeat_window),
            (self.reversal, &mut table.reversal),
        ];
        for (value, slot) in pairs {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

impl PredictorConfig {
    /// Resolve the policy defaults plus overrides
    pub fn settings(&self) -> PredictorSettings {
        let mut settings = PredictorSettings::for_policy(self.policy);
        settings.min_history = self.min_history;
        self.confidence.apply(&mut settings.confidence);
        settings
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
