//! Mapping from SotkaNET region layer identifiers to local map layer names.
//!
//! The mapping is loaded once by the process bootstrap and then shared,
//! read-only, by every aggregation call.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SotkaError;

/// One row of the layer mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRow {
    pub sotka_layer_id: String,
    pub local_layer_name: String,
}

pub trait LayerMappingSource {
    fn load_rows(&self) -> Result<Vec<LayerRow>, SotkaError>;
}

/// Rows stored as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileLayerSource {
    path: PathBuf,
}

impl JsonFileLayerSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LayerMappingSource for JsonFileLayerSource {
    fn load_rows(&self) -> Result<Vec<LayerRow>, SotkaError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|_| SotkaError::LayerMappingRead(self.path.clone()))?;
        serde_json::from_str(&content).map_err(|err| SotkaError::LayerMappingParse(err.to_string()))
    }
}

/// Rows given inline, e.g. from the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticLayerSource {
    rows: Vec<LayerRow>,
}

impl StaticLayerSource {
    pub fn new(rows: Vec<LayerRow>) -> Self {
        Self { rows }
    }
}

impl LayerMappingSource for StaticLayerSource {
    fn load_rows(&self) -> Result<Vec<LayerRow>, SotkaError> {
        Ok(self.rows.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayerMapping {
    layers: HashMap<String, String>,
}

impl LayerMapping {
    pub fn load(source: &dyn LayerMappingSource) -> Result<Self, SotkaError> {
        let mapping = Self::from_rows(source.load_rows()?);
        tracing::info!(count = mapping.len(), "loaded SotkaNET layer mappings");
        tracing::debug!(layers = ?mapping.layers, "layer mapping contents");
        Ok(mapping)
    }

    /// Keys are lower-cased; a later row for the same id wins.
    pub fn from_rows(rows: impl IntoIterator<Item = LayerRow>) -> Self {
        let layers = rows
            .into_iter()
            .map(|row| (row.sotka_layer_id.to_lowercase(), row.local_layer_name))
            .collect();
        Self { layers }
    }

    pub fn resolve(&self, sotka_layer_id: &str) -> Option<&str> {
        self.layers
            .get(&sotka_layer_id.to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Rows sorted by source id, for display.
    pub fn rows(&self) -> Vec<LayerRow> {
        let mut rows = self
            .layers
            .iter()
            .map(|(id, name)| LayerRow {
                sotka_layer_id: id.clone(),
                local_layer_name: name.clone(),
            })
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| a.sotka_layer_id.cmp(&b.sotka_layer_id));
        rows
    }
}
