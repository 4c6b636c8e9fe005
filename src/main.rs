mod types;
mod error;
mod model;
mod engine;
mod presenter;
mod config;
mod web;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{load_config, write_default, AppConfig};
use engine::{ForecastRequester, ForecastSession, WindowPolicy};
use model::{load_model, FileModelSource, ForecastModel};
use presenter::{forecast_table, history_table, write_window_csv, ChartRenderer};
use types::{Frequency, Horizon};
use web::{start_dashboard_server, AppState};

const MONTHS_PROMPT: &str = "Enter the number of months you want: ";

#[derive(Parser)]
#[command(name = "sales-forecaster")]
#[command(version)]
#[command(about = "Sales forecasting from a fitted time-series model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast the next N periods or a date range and print the table
    Forecast {
        /// Model file (defaults to model.path from config)
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Number of periods to forecast; prompted for when omitted
        #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["start", "end"])]
        months: Option<i64>,
        /// Range start (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,
        /// Range end (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
        /// Step between generated periods
        #[arg(short, long, value_enum)]
        frequency: Option<Frequency>,
        /// Where to write the SVG chart
        #[arg(long, default_value = "forecast_chart.svg")]
        chart: PathBuf,
        /// Also export the window as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Use the legacy trailing 30-day-per-month window
        #[arg(long)]
        legacy_window: bool,
    },
    /// Print the historical observations and write the history chart
    History {
        #[arg(short, long)]
        model: Option<PathBuf>,
        #[arg(long, default_value = "history_chart.svg")]
        chart: PathBuf,
    },
    /// Run the interactive dashboard
    Serve {
        #[arg(short, long)]
        model: Option<PathBuf>,
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        legacy_window: bool,
    },
    /// Show a summary of a model file
    Inspect {
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration file
    InitConfig {
        #[arg(default_value = "forecaster.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs)?;

    info!("Sales Forecaster v{}", env!("CARGO_PKG_VERSION"));

    if let Commands::InitConfig { path, force } = &cli.command {
        return write_default(path, *force);
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Forecast { model, months, start, end, frequency, chart, csv, legacy_window } => {
            let model = load_or_report(&model_path(&config, model))?;
            let frequency = frequency.unwrap_or(config.forecast.default_frequency);
            let horizon = resolve_horizon(&config, months, start.zip(end), frequency)?;
            let policy = window_policy(&config, legacy_window);
            run_forecast(&config, &model, &horizon, policy, &chart, csv.as_deref())?;
        }
        Commands::History { model, chart } => {
            let model = load_or_report(&model_path(&config, model))?;
            print!("{}", history_table(model.history()));
            let svg = renderer(&config, &model).history_svg(model.history())?;
            write_svg(&chart, &svg)?;
        }
        Commands::Serve { model, host, port, legacy_window } => {
            let mut config = config;
            if let Some(path) = model {
                config.model.path = path;
            }
            if let Some(host) = host {
                config.dashboard.host = host;
            }
            if let Some(port) = port {
                config.dashboard.port = port;
            }
            let policy = window_policy(&config, legacy_window);

            let source = Arc::new(FileModelSource::new(config.model.path.clone()));
            let session = Arc::new(ForecastSession::new(source, config.forecast.limits(), policy));
            start_dashboard_server(AppState::new(session, Arc::new(config))).await?;
        }
        Commands::Inspect { model, json } => {
            let model = load_or_report(&model_path(&config, model))?;
            let summary = model.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                summary.print_summary();
            }
        }
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn model_path(config: &AppConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| config.model.path.clone())
}

fn window_policy(config: &AppConfig, legacy: bool) -> WindowPolicy {
    if legacy {
        WindowPolicy::TrailingApprox
    } else {
        config.forecast.window_policy
    }
}

/// A model that cannot be loaded ends the run
fn load_or_report(path: &Path) -> Result<ForecastModel> {
    load_model(path).map_err(|e| {
        error!("Error loading model: {}", e);
        e.into()
    })
}

fn renderer(config: &AppConfig, model: &ForecastModel) -> ChartRenderer {
    ChartRenderer::new(
        config.chart.width,
        config.chart.height,
        config.chart.resolve_label(model.value_label()),
    )
}

fn resolve_horizon(
    config: &AppConfig,
    months: Option<i64>,
    range: Option<(NaiveDate, NaiveDate)>,
    frequency: Frequency,
) -> Result<Horizon> {
    let limits = config.forecast.limits();
    let horizon = match (range, months) {
        (Some((start, end)), _) => Horizon::from_range(start, end, &limits)?,
        (None, Some(count)) => Horizon::from_count(count, frequency, &limits)?,
        (None, None) => {
            let input = prompt(MONTHS_PROMPT)?;
            Horizon::parse_count(&input, frequency, &limits)?
        }
    };
    Ok(horizon)
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn run_forecast(
    config: &AppConfig,
    model: &ForecastModel,
    horizon: &Horizon,
    policy: WindowPolicy,
    chart_path: &Path,
    csv_path: Option<&Path>,
) -> Result<()> {
    let requester = ForecastRequester::new(model, config.forecast.limits(), policy);
    let outcome = requester.request(horizon)?;

    println!();
    print!("{}", forecast_table(&outcome.window));

    if outcome.window.is_empty() {
        info!("Forecast window is empty; no chart written");
    } else {
        let svg = renderer(config, model).forecast_svg(&outcome.window)?;
        write_svg(chart_path, &svg)?;
    }

    if let Some(path) = csv_path {
        write_window_csv(&outcome.window, path)?;
    }
    Ok(())
}

fn write_svg(path: &Path, svg: &str) -> Result<()> {
    std::fs::write(path, svg).with_context(|| format!("failed to write chart to {}", path.display()))?;
    info!("Chart written to {}", path.display());
    Ok(())
}
