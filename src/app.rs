use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::aggregator::{AggregationReport, IndicatorAggregator};
use crate::cache::{IndicatorCache, IndicatorSnapshot};
use crate::config::{CacheConfig, LayerMappingsConfig};
use crate::domain::{Indicator, IndicatorId};
use crate::error::SotkaError;
use crate::layers::{JsonFileLayerSource, LayerMapping, LayerRow, StaticLayerSource};
use crate::sotka::SotkaClient;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Ignore a fresh snapshot and fetch from the API, then rewrite it.
    pub refresh: bool,
    /// Neither read nor write the snapshot.
    pub no_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorsSource {
    Cache,
    Remote,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorsResult {
    pub source: IndicatorsSource,
    pub fetched_at: String,
    pub indicators: Vec<Indicator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub enriched: usize,
    pub failed: Vec<IndicatorId>,
    pub dropped: Vec<IndicatorId>,
    pub skipped: usize,
}

impl From<&AggregationReport> for ReportSummary {
    fn from(report: &AggregationReport) -> Self {
        Self {
            enriched: report.enriched.len(),
            failed: report.failed.clone(),
            dropped: report.dropped.clone(),
            skipped: report.skipped.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayersResult {
    pub layers: Vec<LayerRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn event(&self, _event: ProgressEvent) {}
}

/// Loads the layer mapping once for the lifetime of the process.
pub fn load_layer_mapping(config: &LayerMappingsConfig) -> Result<Arc<LayerMapping>, SotkaError> {
    let mapping = match config {
        LayerMappingsConfig::None => {
            tracing::warn!("no layer mappings configured, indicator layers stay unmapped");
            LayerMapping::default()
        }
        LayerMappingsConfig::File(path) => LayerMapping::load(&JsonFileLayerSource::new(path))?,
        LayerMappingsConfig::Inline(rows) => {
            LayerMapping::load(&StaticLayerSource::new(rows.clone()))?
        }
    };
    Ok(Arc::new(mapping))
}

pub struct App<C: SotkaClient> {
    aggregator: IndicatorAggregator<C>,
    source_url: String,
    cache: Option<(IndicatorCache, CacheConfig)>,
}

impl<C: SotkaClient> App<C> {
    pub fn new(aggregator: IndicatorAggregator<C>, source_url: &str) -> Self {
        Self {
            aggregator,
            source_url: source_url.to_string(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: IndicatorCache, config: CacheConfig) -> Self {
        if config.enabled {
            self.cache = Some((cache, config));
        }
        self
    }

    pub fn indicators(
        &self,
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<IndicatorsResult, SotkaError> {
        // Test-mode results are partial and never touch the snapshot.
        let test_mode = self.aggregator.options().test_mode.is_some();
        let cache = self
            .cache
            .as_ref()
            .filter(|_| !options.no_cache && !test_mode);
        let layers = self.aggregator.layers().rows();

        if let Some((cache, config)) = cache.filter(|_| !options.refresh) {
            sink.event(ProgressEvent {
                message: "phase=Resolve; checking cached indicators".to_string(),
                elapsed: None,
            });
            if let Some(snapshot) = cache.load_fresh(&self.source_url, &layers, config.max_age) {
                sink.event(ProgressEvent {
                    message: "phase=Store; using cached indicators".to_string(),
                    elapsed: None,
                });
                return Ok(IndicatorsResult {
                    source: IndicatorsSource::Cache,
                    fetched_at: snapshot.fetched_at.to_rfc3339(),
                    indicators: snapshot.indicators,
                    report: None,
                });
            }
        }

        let report = self.aggregator.aggregate(sink)?;
        let snapshot = IndicatorSnapshot::new(&self.source_url, layers, report.indicators.clone());
        if let Some((cache, _)) = cache {
            // A failed cache write must not discard a completed fetch.
            if let Err(err) = cache.store(&snapshot) {
                tracing::warn!(error = %err, "failed to write indicator cache");
            }
        }

        Ok(IndicatorsResult {
            source: IndicatorsSource::Remote,
            fetched_at: snapshot.fetched_at.to_rfc3339(),
            report: Some(ReportSummary::from(&report)),
            indicators: snapshot.indicators,
        })
    }

    pub fn indicator(
        &self,
        id: IndicatorId,
        sink: &dyn ProgressSink,
    ) -> Result<Indicator, SotkaError> {
        sink.event(ProgressEvent {
            message: format!("phase=Enrich; indicator {id}"),
            elapsed: None,
        });
        self.aggregator.indicator(&id)
    }

    pub fn layers(&self) -> LayersResult {
        LayersResult {
            layers: self.aggregator.layers().rows(),
        }
    }

    pub fn clear_cache(&self) -> Result<ClearResult, SotkaError> {
        let cleared = match &self.cache {
            Some((cache, _)) => cache.clear()?,
            None => false,
        };
        Ok(ClearResult { cleared })
    }
}
