//! Configuration management for zipindustry
//!
//! Handles config file loading/saving and credential lookup.
//! Config is stored at ~/.config/zipindustry/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Metric;

/// Most recent County Business Patterns vintage on NAICS 2017
pub const DEFAULT_CBP_YEAR: u16 = 2021;

/// NAICS vintage matching the CBP default
pub const DEFAULT_NAICS_YEAR: u16 = 2017;

pub const DEFAULT_LIMIT: usize = 10;

pub const HUD_TOKEN_ENV: &str = "HUD_API_TOKEN";
pub const CENSUS_KEY_ENV: &str = "CENSUS_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing credential: set {env} or `{field}` in the config file")]
    MissingCredential {
        env: &'static str,
        field: &'static str,
    },
}

/// Base URL overrides for the upstream APIs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub hud: Option<String>,
    pub census: Option<String>,
    pub naics: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HUD USPS crosswalk bearer token
    pub hud_token: Option<String>,
    /// Census API key (optional, raises rate limits)
    pub census_api_key: Option<String>,
    /// County Business Patterns vintage
    pub cbp_year: Option<u16>,
    /// NAICS taxonomy vintage
    pub naics_year: Option<u16>,
    /// In-flight CBP requests during fan-out
    pub concurrency: Option<usize>,
    /// Metric used when none is given on the command line
    pub default_metric: Option<Metric>,
    /// Rows per ranking when none is given on the command line
    pub default_limit: Option<usize>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Config {
    /// Get config file path (~/.config/zipindustry/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("zipindustry").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Load from an explicit path; a missing file yields the default config
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// HUD token with fallback chain:
    /// 1. Environment variable HUD_API_TOKEN
    /// 2. Token from config file
    pub fn hud_token(&self) -> Option<String> {
        non_empty(std::env::var(HUD_TOKEN_ENV).ok()).or_else(|| non_empty(self.hud_token.clone()))
    }

    pub fn require_hud_token(&self) -> Result<String, ConfigError> {
        self.hud_token().ok_or(ConfigError::MissingCredential {
            env: HUD_TOKEN_ENV,
            field: "hud_token",
        })
    }

    /// Census key with the same env → file fallback
    pub fn census_api_key(&self) -> Option<String> {
        non_empty(std::env::var(CENSUS_KEY_ENV).ok())
            .or_else(|| non_empty(self.census_api_key.clone()))
    }

    pub fn cbp_year(&self) -> u16 {
        self.cbp_year.unwrap_or(DEFAULT_CBP_YEAR)
    }

    pub fn naics_year(&self) -> u16 {
        self.naics_year.unwrap_or(DEFAULT_NAICS_YEAR)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
            .unwrap_or(crate::api::census::DEFAULT_CONCURRENCY)
            .max(1)
    }

    pub fn metric(&self) -> Metric {
        self.default_metric.unwrap_or_default()
    }

    pub fn limit(&self) -> usize {
        self.default_limit.unwrap_or(DEFAULT_LIMIT)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
