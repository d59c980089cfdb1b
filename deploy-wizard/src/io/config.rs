//! Wizard configuration stored in `wizard.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::expiration::{DEFAULT_MAX_DAYS, DEFAULT_OFFSET_DAYS};
use crate::core::explorer::Network;
use crate::core::rules::{DEFAULT_CAP_RATIO, DEFAULT_FLOOR_RATIO, PriceBounds};

/// Wizard configuration (TOML).
///
/// Business constants live here rather than in the rules so they can be tuned
/// per deployment. Missing fields take the shipped values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WizardConfig {
    /// Network used for explorer links in notifications.
    pub network: Network,

    /// Optional catalog file replacing the built-in data sources and exchanges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    pub bounds: BoundsConfig,

    pub expiration: ExpirationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoundsConfig {
    /// Simplified mode: floor must be at least this fraction of the reference price.
    pub floor_ratio: f64,
    /// Simplified mode: cap must be at most this multiple of the reference price.
    pub cap_ratio: f64,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            floor_ratio: DEFAULT_FLOOR_RATIO,
            cap_ratio: DEFAULT_CAP_RATIO,
        }
    }
}

impl From<&BoundsConfig> for PriceBounds {
    fn from(cfg: &BoundsConfig) -> Self {
        PriceBounds {
            floor_ratio: cfg.floor_ratio,
            cap_ratio: cfg.cap_ratio,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExpirationConfig {
    /// Latest allowed expiration, in whole days after the start of today.
    pub max_days: i64,
    /// Offset of the default expiration from now.
    pub default_days: i64,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            max_days: DEFAULT_MAX_DAYS,
            default_days: DEFAULT_OFFSET_DAYS,
        }
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            catalog_path: None,
            bounds: BoundsConfig::default(),
            expiration: ExpirationConfig::default(),
        }
    }
}

impl WizardConfig {
    pub fn validate(&self) -> Result<()> {
        let b = &self.bounds;
        if !(b.floor_ratio.is_finite() && b.floor_ratio > 0.0) {
            return Err(anyhow!("bounds.floor_ratio must be > 0"));
        }
        if !(b.cap_ratio.is_finite() && b.cap_ratio > b.floor_ratio) {
            return Err(anyhow!("bounds.cap_ratio must be > bounds.floor_ratio"));
        }
        if self.expiration.max_days <= 0 {
            return Err(anyhow!("expiration.max_days must be > 0"));
        }
        if self.expiration.default_days <= 0
            || self.expiration.default_days > self.expiration.max_days
        {
            return Err(anyhow!(
                "expiration.default_days must be in 1..={}",
                self.expiration.max_days
            ));
        }
        Ok(())
    }

    pub fn price_bounds(&self) -> PriceBounds {
        PriceBounds::from(&self.bounds)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `WizardConfig::default()`.
pub fn load_config(path: &Path) -> Result<WizardConfig> {
    if !path.exists() {
        let cfg = WizardConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WizardConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
