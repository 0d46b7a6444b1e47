//! snowpipe: submit staged files to a pipe and read its load history.
//!
//! Configuration comes from SNOWPIPE_* environment variables (or `.env`).
//! Success bodies go to stdout; one JSON report line per routed unit and all
//! logs go to stderr.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use snowpipe_cli::{
    init_tracing, FlowUnit, HistoryOutcome, HistoryProcessor, IngestProcessor, JsonLinesRouter,
};
use snowpipe_core::PipeConfig;

#[derive(Parser)]
#[command(name = "snowpipe", about = "Snowpipe ingest and load history CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit staged files for loading
    Ingest {
        /// Staged file names, exposed to expressions as ${filename}
        #[arg(required = true)]
        files: Vec<String>,
        /// Extra unit attribute as key=value (repeatable)
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,
    },
    /// Emit the load history of the trailing window as JSON lines
    History {
        /// Overrides SNOWPIPE_TRAILING_MINUTES
        #[arg(long, allow_hyphen_values = true)]
        trailing_minutes: Option<i64>,
        /// Repeat every N seconds, reloading configuration before each query
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

fn load_config(trailing_minutes: Option<i64>) -> anyhow::Result<PipeConfig> {
    let mut config = PipeConfig::from_env().context(
        "Failed to load configuration. Set SNOWPIPE_ACCOUNT, SNOWPIPE_USER, SNOWPIPE_PIPE and SNOWPIPE_PRIVATE_KEY",
    )?;
    if let Some(minutes) = trailing_minutes {
        config.trailing_minutes = minutes;
    }
    Ok(config)
}

async fn ingest(
    files: Vec<String>,
    attributes: Vec<(String, String)>,
) -> anyhow::Result<ExitCode> {
    let processor = IngestProcessor::new(load_config(None)?)?;
    let mut router = JsonLinesRouter::new(std::io::stdout(), std::io::stderr());

    for file in files {
        let mut unit = FlowUnit::from_attributes(attributes.iter().cloned());
        unit.put_attribute("filename", file);
        processor.process(unit, &mut router).await?;
    }

    tracing::info!(
        accepted = router.successes(),
        failed = router.failures(),
        "Ingest finished"
    );

    Ok(if router.failures() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn history(
    trailing_minutes: Option<i64>,
    interval_secs: Option<u64>,
) -> anyhow::Result<ExitCode> {
    let Some(secs) = interval_secs else {
        let processor = HistoryProcessor::new(load_config(trailing_minutes)?)?;
        let mut router = JsonLinesRouter::new(std::io::stdout(), std::io::stderr());
        return Ok(match processor.run(&mut router).await? {
            HistoryOutcome::Failed(_) => ExitCode::FAILURE,
            HistoryOutcome::Emitted { .. } | HistoryOutcome::Empty => ExitCode::SUCCESS,
        });
    };

    // Polling re-reads .env before every query, so load the same way at startup
    let reload = move || -> anyhow::Result<PipeConfig> {
        let mut config = PipeConfig::reload_from_env()
            .context("Failed to reload configuration from the environment and .env")?;
        if let Some(minutes) = trailing_minutes {
            config.trailing_minutes = minutes;
        }
        Ok(config)
    };

    let mut processor = HistoryProcessor::new(reload()?)?;
    let mut router = JsonLinesRouter::new(std::io::stdout(), std::io::stderr());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    processor
        .poll(
            &mut router,
            Duration::from_secs(secs.max(1)),
            reload,
            shutdown,
        )
        .await?;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { files, attributes } => ingest(files, attributes).await,
        Commands::History {
            trailing_minutes,
            interval_secs,
        } => history(trailing_minutes, interval_secs).await,
    }
}
