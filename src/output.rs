use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ClearResult, IndicatorsResult, LayersResult, ProgressEvent, ProgressSink};
use crate::domain::Indicator;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Json,
    Text,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_indicators(result: &IndicatorsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_indicator(indicator: &Indicator) -> io::Result<()> {
        Self::print_json(indicator)
    }

    pub fn print_layers(result: &LayersResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_clear(result: &ClearResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_indicators(result: &IndicatorsResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        for indicator in &result.indicators {
            stdout.write_all(Self::indicator_line(indicator).as_bytes())?;
        }
        let source = match result.source {
            crate::app::IndicatorsSource::Cache => "cache",
            crate::app::IndicatorsSource::Remote => "remote",
        };
        writeln!(
            stdout,
            "{} indicators ({source}, fetched {})",
            result.indicators.len(),
            result.fetched_at
        )?;
        if let Some(report) = &result.report {
            writeln!(
                stdout,
                "enriched {}, preliminary only {}, dropped {}, skipped {}",
                report.enriched,
                report.failed.len(),
                report.dropped.len(),
                report.skipped
            )?;
        }
        Ok(())
    }

    pub fn print_indicator(indicator: &Indicator) -> io::Result<()> {
        io::stdout().write_all(Self::indicator_line(indicator).as_bytes())
    }

    pub fn print_layers(result: &LayersResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        for row in &result.layers {
            writeln!(stdout, "{} -> {}", row.sotka_layer_id, row.local_layer_name)?;
        }
        Ok(())
    }

    pub fn print_clear(result: &ClearResult) -> io::Result<()> {
        let message = if result.cleared {
            "indicator cache cleared"
        } else {
            "indicator cache was empty"
        };
        writeln!(io::stdout(), "{message}")
    }

    pub fn indicator_line(indicator: &Indicator) -> String {
        let years = indicator
            .years
            .map(|years| years.to_string())
            .unwrap_or_else(|| "-".to_string());
        let layers = indicator
            .layers
            .iter()
            .map(|layer| layer.local_layer.as_deref().unwrap_or("?"))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{:>6}  {:<9}  {}  [{}]\n",
            indicator.id,
            years,
            indicator.display_name(),
            layers
        )
    }
}

/// Writes progress events to stderr as they arrive.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}
