//! Indicator catalogue aggregation.
//!
//! One listing request produces preliminary indicators; each indicator is
//! then enriched with its own metadata request. Enrichment failures are
//! isolated to the indicator in question, which is kept with its
//! preliminary data. Only a failing listing request fails the batch.

use std::sync::Arc;
use std::time::Instant;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::app::{NoProgress, ProgressEvent, ProgressSink};
use crate::domain::{Indicator, IndicatorId};
use crate::error::SotkaError;
use crate::layers::LayerMapping;
use crate::parser::{parse_indicator_list, parse_indicator_metadata};
use crate::sotka::SotkaClient;

/// Skips the metadata request for ids above a threshold. Only meant to
/// shorten test runs against the live API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestMode {
    pub skip_enrichment_above: u64,
}

#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    /// Enrichment worker threads; 1 keeps processing strictly sequential.
    pub workers: usize,
    pub test_mode: Option<TestMode>,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            test_mode: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregationReport {
    pub indicators: Vec<Indicator>,
    pub enriched: Vec<IndicatorId>,
    pub failed: Vec<IndicatorId>,
    pub dropped: Vec<IndicatorId>,
    pub skipped: Vec<IndicatorId>,
}

impl AggregationReport {
    fn from_outcomes(outcomes: Vec<Enrichment>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome {
                Enrichment::Enriched(indicator) => {
                    report.enriched.push(indicator.id);
                    report.indicators.push(indicator);
                }
                Enrichment::Failed(indicator) => {
                    report.failed.push(indicator.id);
                    report.indicators.push(indicator);
                }
                Enrichment::Skipped(indicator) => {
                    report.skipped.push(indicator.id);
                    report.indicators.push(indicator);
                }
                Enrichment::Dropped(id) => report.dropped.push(id),
            }
        }
        report
    }
}

enum Enrichment {
    Enriched(Indicator),
    Failed(Indicator),
    Skipped(Indicator),
    Dropped(IndicatorId),
}

pub struct IndicatorAggregator<C: SotkaClient> {
    client: C,
    layers: Arc<LayerMapping>,
    options: AggregatorOptions,
}

impl<C: SotkaClient> IndicatorAggregator<C> {
    pub fn new(client: C, layers: Arc<LayerMapping>, options: AggregatorOptions) -> Self {
        Self {
            client,
            layers,
            options,
        }
    }

    pub fn layers(&self) -> &LayerMapping {
        &self.layers
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    pub fn indicators(&self) -> Result<Vec<Indicator>, SotkaError> {
        Ok(self.aggregate(&NoProgress)?.indicators)
    }

    pub fn aggregate(&self, sink: &dyn ProgressSink) -> Result<AggregationReport, SotkaError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: "phase=List; fetching indicator listing".to_string(),
            elapsed: None,
        });
        let preliminary = self
            .preliminary_indicators()
            .map_err(|err| SotkaError::IndicatorListing {
                source: Box::new(err),
            })?;

        sink.event(ProgressEvent {
            message: format!(
                "phase=Enrich; {} indicators, {} worker(s)",
                preliminary.len(),
                self.options.workers.max(1)
            ),
            elapsed: Some(started.elapsed()),
        });
        let outcomes = if self.options.workers > 1 {
            self.enrich_parallel(preliminary)?
        } else {
            preliminary
                .into_iter()
                .map(|indicator| self.enrich(indicator))
                .collect()
        };

        let report = AggregationReport::from_outcomes(outcomes);
        tracing::info!(
            total = report.indicators.len(),
            enriched = report.enriched.len(),
            failed = report.failed.len(),
            dropped = report.dropped.len(),
            skipped = report.skipped.len(),
            "indicator aggregation finished"
        );
        sink.event(ProgressEvent {
            message: format!("phase=Done; {} indicators", report.indicators.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok(report)
    }

    /// Metadata for a single indicator, without the listing step.
    pub fn indicator(&self, id: &IndicatorId) -> Result<Indicator, SotkaError> {
        self.fetch_enrichment(id)?
            .ok_or(SotkaError::NoData(*id))
    }

    fn preliminary_indicators(&self) -> Result<Vec<Indicator>, SotkaError> {
        let json = self.client.fetch_indicators()?;
        parse_indicator_list(&json, &self.layers)
    }

    fn fetch_enrichment(&self, id: &IndicatorId) -> Result<Option<Indicator>, SotkaError> {
        let json = self.client.fetch_indicator_metadata(id)?;
        parse_indicator_metadata(&json, &self.layers)
    }

    fn enrich_parallel(&self, preliminary: Vec<Indicator>) -> Result<Vec<Enrichment>, SotkaError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .build()
            .map_err(|err| SotkaError::WorkerPool(err.to_string()))?;
        Ok(pool.install(|| {
            preliminary
                .into_par_iter()
                .map(|indicator| self.enrich(indicator))
                .collect()
        }))
    }

    fn enrich(&self, mut indicator: Indicator) -> Enrichment {
        if let Some(test_mode) = self.options.test_mode {
            if indicator.id.value() > test_mode.skip_enrichment_above {
                return Enrichment::Skipped(indicator);
            }
        }

        match self.fetch_enrichment(&indicator.id) {
            Ok(Some(info)) => {
                indicator.merge(info);
                Enrichment::Enriched(indicator)
            }
            Ok(None) => {
                tracing::debug!(id = %indicator.id, "no metadata for indicator, dropping");
                Enrichment::Dropped(indicator.id)
            }
            // SotkaNET intermittently answers single indicators with HTTP 500.
            Err(err) => {
                tracing::error!(
                    id = %indicator.id,
                    name = %indicator.name,
                    error = %err,
                    "error fetching SotkaNET indicator metadata, keeping preliminary data"
                );
                Enrichment::Failed(indicator)
            }
        }
    }
}
