use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use sotka_indicators::aggregator::{IndicatorAggregator, TestMode};
use sotka_indicators::app::{App, FetchOptions, load_layer_mapping};
use sotka_indicators::cache::IndicatorCache;
use sotka_indicators::config::{ConfigLoader, ResolvedConfig};
use sotka_indicators::domain::IndicatorId;
use sotka_indicators::error::SotkaError;
use sotka_indicators::output::{JsonOutput, OutputMode, StderrProgress, TextOutput};
use sotka_indicators::sotka::SotkaHttpClient;

#[derive(Parser)]
#[command(name = "sotka-ind")]
#[command(about = "SotkaNET statistical indicators mapped to local map layers")]
#[command(version, author)]
struct Cli {
    /// Config file (defaults to ./sotka-indicators.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch the enriched indicator catalogue")]
    Indicators(IndicatorsArgs),
    #[command(about = "Fetch metadata for one indicator")]
    Indicator(IndicatorArgs),
    #[command(about = "Show the loaded layer mapping")]
    Layers,
    #[command(about = "Manage the indicator cache")]
    Cache(CacheArgs),
}

#[derive(Args)]
struct IndicatorsArgs {
    /// Ignore a fresh cached catalogue
    #[arg(long)]
    refresh: bool,

    #[arg(long)]
    no_cache: bool,

    /// Concurrent metadata requests
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, hide = true)]
    skip_enrichment_above: Option<u64>,
}

#[derive(Args)]
struct IndicatorArgs {
    id: String,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Remove the cached catalogue")]
    Clear,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<SotkaError>() {
            return ExitCode::from(error.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Indicators(args) => {
            if let Some(workers) = args.workers {
                if workers == 0 {
                    return Err(miette::Report::msg("--workers must be at least 1"));
                }
                config.aggregator.workers = workers;
            }
            if let Some(threshold) = args.skip_enrichment_above {
                config.aggregator.test_mode = Some(TestMode {
                    skip_enrichment_above: threshold,
                });
            }
            let app = build_app(&config, true)?;
            let options = FetchOptions {
                refresh: args.refresh,
                no_cache: args.no_cache,
            };
            match output_mode {
                OutputMode::Json => {
                    let result = app.indicators(options, &JsonOutput)?;
                    JsonOutput::print_indicators(&result).into_diagnostic()
                }
                OutputMode::Text => {
                    let result = app.indicators(options, &StderrProgress)?;
                    TextOutput::print_indicators(&result).into_diagnostic()
                }
            }
        }
        Commands::Indicator(args) => {
            let id: IndicatorId = args.id.parse()?;
            let app = build_app(&config, false)?;
            match output_mode {
                OutputMode::Json => {
                    let indicator = app.indicator(id, &JsonOutput)?;
                    JsonOutput::print_indicator(&indicator).into_diagnostic()
                }
                OutputMode::Text => {
                    let indicator = app.indicator(id, &StderrProgress)?;
                    TextOutput::print_indicator(&indicator).into_diagnostic()
                }
            }
        }
        Commands::Layers => {
            let app = build_app(&config, false)?;
            let result = app.layers();
            match output_mode {
                OutputMode::Json => JsonOutput::print_layers(&result).into_diagnostic(),
                OutputMode::Text => TextOutput::print_layers(&result).into_diagnostic(),
            }
        }
        Commands::Cache(CacheArgs {
            command: CacheCommand::Clear,
        }) => {
            let app = build_app(&config, true)?;
            let result = app.clear_cache()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_clear(&result).into_diagnostic(),
                OutputMode::Text => TextOutput::print_clear(&result).into_diagnostic(),
            }
        }
    }
}

/// The cache directory is only resolved for commands that read or write the
/// snapshot, and only when the cache is enabled.
fn build_app(
    config: &ResolvedConfig,
    uses_cache: bool,
) -> Result<App<SotkaHttpClient>, SotkaError> {
    let layers = load_layer_mapping(&config.layer_mappings)?;
    let client = SotkaHttpClient::new(config.http.clone())?;
    let source_url = client.base_url().to_string();
    let aggregator = IndicatorAggregator::new(client, layers, config.aggregator.clone());
    let app = App::new(aggregator, &source_url);
    if !uses_cache || !config.cache.enabled {
        return Ok(app);
    }
    Ok(app.with_cache(IndicatorCache::new()?, config.cache.clone()))
}
