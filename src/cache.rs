use std::fs;
use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::domain::Indicator;
use crate::error::SotkaError;
use crate::layers::LayerRow;

const SNAPSHOT_FILE: &str = "indicators.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub source_url: String,
    /// Layer mapping the indicator layers were resolved with.
    pub layers: Vec<LayerRow>,
    pub indicators: Vec<Indicator>,
}

impl IndicatorSnapshot {
    pub fn new(source_url: &str, layers: Vec<LayerRow>, indicators: Vec<Indicator>) -> Self {
        Self {
            fetched_at: Utc::now(),
            source_url: source_url.to_string(),
            layers,
            indicators,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorCache {
    root: Utf8PathBuf,
}

impl IndicatorCache {
    pub fn new() -> Result<Self, SotkaError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.cache_dir().join("sotka-indicators")).ok()
            })
            .ok_or_else(|| {
                SotkaError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn snapshot_path(&self) -> Utf8PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    /// The stored snapshot if it is younger than `max_age` and was built
    /// from the same source with the same layer mapping. Unreadable
    /// snapshots count as missing.
    pub fn load_fresh(
        &self,
        source_url: &str,
        layers: &[LayerRow],
        max_age: Duration,
    ) -> Option<IndicatorSnapshot> {
        let snapshot = self.load()?;
        if snapshot.source_url != source_url {
            tracing::debug!(cached = %snapshot.source_url, "cached snapshot is for another source");
            return None;
        }
        if snapshot.layers != layers {
            tracing::debug!("cached snapshot was built with another layer mapping");
            return None;
        }
        let age = snapshot.age(Utc::now());
        if age > max_age {
            tracing::debug!(age_secs = age.as_secs(), "cached snapshot is stale");
            return None;
        }
        Some(snapshot)
    }

    pub fn load(&self) -> Option<IndicatorSnapshot> {
        let path = self.snapshot_path();
        if !path.as_std_path().exists() {
            return None;
        }
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(%path, error = %err, "failed to read indicator cache");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(%path, error = %err, "ignoring corrupt indicator cache");
                None
            }
        }
    }

    pub fn store(&self, snapshot: &IndicatorSnapshot) -> Result<(), SotkaError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| SotkaError::Filesystem(err.to_string()))?;
        let content = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| SotkaError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("sotka-indicators")
            .tempfile_in(self.root.as_std_path())
            .map_err(|err| SotkaError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| SotkaError::Filesystem(err.to_string()))?;
        temp.persist(self.snapshot_path().as_std_path())
            .map_err(|err| SotkaError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<bool, SotkaError> {
        let path = self.snapshot_path();
        if !path.as_std_path().exists() {
            return Ok(false);
        }
        fs::remove_file(path.as_std_path()).map_err(|err| SotkaError::Filesystem(err.to_string()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_layout() {
        let cache = IndicatorCache::new_with_root(Utf8PathBuf::from("/tmp/sotka"));
        assert!(cache.snapshot_path().ends_with("sotka/indicators.json"));
    }

    #[test]
    fn age_never_negative() {
        let mut snapshot = IndicatorSnapshot::new("http://x", Vec::new(), Vec::new());
        snapshot.fetched_at = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(snapshot.age(Utc::now()), Duration::ZERO);
    }
}
