use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EnrichError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "lead_enricher.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub toggles: EnrichToggles,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("output") }
    }
}

/// Which link families are generated. Also recorded verbatim in the run metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichToggles {
    pub county: bool,
    pub osint: bool,
    pub social: bool,
}

impl Default for EnrichToggles {
    fn default() -> Self {
        Self { county: true, osint: true, social: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: format!("lead_enricher/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("logs") }
    }
}

impl Config {
    /// Load `lead_enricher.toml` from the working directory, falling back to
    /// defaults when it does not exist, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        let config = if path.exists() {
            Self::load_from(path)?
        } else {
            debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EnrichError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("LEAD_ENRICHER_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("LEAD_ENRICHER_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.logging.dir = PathBuf::from(dir);
            }
        }
        self
    }
}
