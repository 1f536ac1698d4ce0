//! Configuration loader - YAML file + .env overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::model::{Drilldown, HeatmapGroup, Year};

/// Main configuration loaded from dashboard.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub timing: TimingConfig,
    pub defaults: DefaultsConfig,
    pub responses: ResponsesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Animation period
    pub tick_ms: u64,
    /// Quiet period after the last slider movement before fetching
    pub debounce_ms: u64,
}

/// Initial view state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub year: Year,
    pub drilldown: Drilldown,
    pub heatmap_group: HeatmapGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsesConfig {
    pub ordering: ResponseOrdering,
}

/// How overlapping fetches for the same chart resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// Whichever response completes last is rendered
    #[default]
    CompletionOrder,
    /// Only the most recently issued request may render
    LatestRequest,
}

/// Overrides loaded from .env / the process environment
#[derive(Debug, Clone)]
pub struct Env {
    pub api_base_url: Option<String>,
    pub log_dir: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 800,
            debounce_ms: 100,
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Reject values serde accepts but the timers and HTTP client cannot use
    pub fn validate(&self) -> Result<()> {
        if self.timing.tick_ms == 0 {
            anyhow::bail!("timing.tick_ms must be greater than 0");
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be greater than 0");
        }
        Ok(())
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            Self::load(path)
        } else {
            tracing::warn!("Config file not found: {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn apply_env(&mut self, env: &Env) {
        if let Some(url) = &env.api_base_url {
            tracing::debug!("API_BASE_URL overrides api.base_url: {}", url);
            self.api.base_url = url.clone();
        }
    }
}

impl TimingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Env {
    /// Load overrides from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Env {
            api_base_url: std::env::var("API_BASE_URL").ok().filter(|s| !s.is_empty()),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}
