mod cli;
mod config;
mod events;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use tender_engine::{JsonlSink, RunController, RunEnd, SystemClock, WebDriverSession};

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::events::LogEventSink;

/// Exit code when the run stopped early but kept its output.
const EXIT_HALTED: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("tender_app: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config_path = &cli.config;
    let loaded = config::load(config_path)?;
    let from_file = loaded.is_some();
    let mut config = loaded.unwrap_or_else(AppConfig::default);
    cli.apply(&mut config);

    logging::initialize(config.log_level()?, config.log_file.as_deref());
    if from_file {
        engine_info!("Loaded config from {:?}", config_path);
    } else {
        engine_warn!("No config at {:?}, using defaults", config_path);
    }

    let settings = config.scrape_settings();
    settings.validate().context("invalid configuration")?;

    let mut sink = JsonlSink::open_append(&config.output_path)
        .with_context(|| format!("cannot open output {:?}", config.output_path))?;
    let mut session = WebDriverSession::launch(&config.session_settings())
        .with_context(|| format!("cannot start browser via {}", config.webdriver_url))?;

    let clock = SystemClock;
    let events = LogEventSink;
    let report = RunController::new(&settings, &clock, &events)?
        .with_timestamp(Arc::new(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)))
        .run(&mut session, &mut sink);

    if let Err(err) = session.quit() {
        engine_warn!("Browser did not shut down cleanly: {}", err);
    }
    engine_info!(
        "{} rows appended to {:?}",
        sink.lines_written(),
        sink.path()
    );

    Ok(match report.end {
        RunEnd::Completed => ExitCode::SUCCESS,
        RunEnd::Halted { .. } => ExitCode::from(EXIT_HALTED),
        RunEnd::Aborted { .. } => ExitCode::FAILURE,
    })
}
