use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregator::{AggregatorOptions, TestMode};
use crate::error::SotkaError;
use crate::layers::LayerRow;
use crate::sotka::{DEFAULT_BASE_URL, HttpSettings};

pub const DEFAULT_CONFIG_FILE: &str = "sotka-indicators.json";
pub const BASE_URL_ENV: &str = "SOTKA_BASE_URL";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub retries: Option<usize>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub layer_mappings: Option<LayerMappingsEntry>,
    #[serde(default)]
    pub cache: Option<CacheEntry>,
    #[serde(default)]
    pub test_mode: Option<TestModeEntry>,
}

/// Either a path to a JSON file of rows or the rows themselves.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LayerMappingsEntry {
    File(String),
    Inline(Vec<LayerRow>),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TestModeEntry {
    pub skip_enrichment_above: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerMappingsConfig {
    None,
    File(PathBuf),
    Inline(Vec<LayerRow>),
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age: Duration::from_secs(DEFAULT_CACHE_MAX_AGE_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub http: HttpSettings,
    pub aggregator: AggregatorOptions,
    pub layer_mappings: LayerMappingsConfig,
    pub cache: CacheConfig,
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 24 * 60 * 60;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or the default file in the working directory if it
    /// exists. Without either, built-in defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SotkaError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            tracing::debug!("no config file, using defaults");
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| SotkaError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| SotkaError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                resolved.http.base_url = base_url.trim().to_string();
            }
        }
        // Relative mapping files are relative to the config file.
        if let LayerMappingsConfig::File(file) = &resolved.layer_mappings {
            if file.is_relative() {
                if let Some(dir) = config_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                    resolved.layer_mappings = LayerMappingsConfig::File(dir.join(file));
                }
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SotkaError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(SotkaError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let workers = config.workers.unwrap_or(1);
        if workers == 0 {
            return Err(SotkaError::ConfigParse("workers must be at least 1".to_string()));
        }

        let http = HttpSettings {
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            retries: config.retries.unwrap_or(0),
        };

        let aggregator = AggregatorOptions {
            workers,
            test_mode: config.test_mode.map(|entry| TestMode {
                skip_enrichment_above: entry.skip_enrichment_above,
            }),
        };

        let layer_mappings = match config.layer_mappings {
            None => LayerMappingsConfig::None,
            Some(LayerMappingsEntry::File(path)) => LayerMappingsConfig::File(PathBuf::from(path)),
            Some(LayerMappingsEntry::Inline(rows)) => LayerMappingsConfig::Inline(rows),
        };

        let cache = config
            .cache
            .map(|entry| CacheConfig {
                enabled: entry.enabled.unwrap_or(true),
                max_age: Duration::from_secs(
                    entry.max_age_secs.unwrap_or(DEFAULT_CACHE_MAX_AGE_SECS),
                ),
            })
            .unwrap_or_default();

        Ok(ResolvedConfig {
            schema_version,
            http,
            aggregator,
            layer_mappings,
            cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_config() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.http.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.http.retries, 0);
        assert_eq!(resolved.aggregator.workers, 1);
        assert!(resolved.aggregator.test_mode.is_none());
        assert_eq!(resolved.layer_mappings, LayerMappingsConfig::None);
        assert!(resolved.cache.enabled);
    }
}
