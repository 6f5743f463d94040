use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tezgah_ocr::MerchantCatalog;
use tezgah_taxonomy::{Taxonomy, DEFAULT_MIN_CONFIDENCE};

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "TEZGAH_CONFIG";

/// `tezgah` settings. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Category matches below this confidence are left unassigned.
    pub min_confidence: f32,
    /// Merchant catalog TOML replacing the built-in one.
    pub merchants: Option<PathBuf>,
    /// Taxonomy TOML replacing the built-in one.
    pub taxonomy: Option<PathBuf>,
    /// Default `tracing` filter when `RUST_LOG` is unset and no `-v` is given.
    pub log: String,
}

/// Thresholds outside 0..=1 would accept or reject every match.
pub fn check_min_confidence(value: f32) -> anyhow::Result<f32> {
    if !(0.0..=1.0).contains(&value) {
        bail!("min_confidence must be within 0..=1, got {value}");
    }
    Ok(value)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            merchants: None,
            taxonomy: None,
            log: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("invalid config TOML")?;
        check_min_confidence(config.min_confidence)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config = Self::from_toml(&content)?;
        // Dataset paths are relative to the config file.
        if let Some(dir) = path.parent() {
            config.merchants = config.merchants.map(|p| dir.join(p));
            config.taxonomy = config.taxonomy.map(|p| dir.join(p));
        }
        Ok(config)
    }

    /// `explicit` path, else `$TEZGAH_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn merchant_catalog(&self) -> anyhow::Result<MerchantCatalog> {
        match &self.merchants {
            Some(path) => MerchantCatalog::from_file(path)
                .with_context(|| format!("failed to load merchant catalog {}", path.display())),
            None => Ok(MerchantCatalog::builtin()?),
        }
    }

    pub fn taxonomy(&self) -> anyhow::Result<Taxonomy> {
        match &self.taxonomy {
            Some(path) => Taxonomy::from_file(path)
                .with_context(|| format!("failed to load taxonomy {}", path.display())),
            None => Ok(Taxonomy::builtin()?),
        }
    }
}
