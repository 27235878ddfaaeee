//! abz-client - AcousticBrainz submission client
//!
//! Walks the given files and directories, runs the Essentia extractor on
//! every tagged audio file not yet in the processed-file log, and submits
//! the features to AcousticBrainz.

use std::path::PathBuf;

use abz_client::workflow::PipelineConfig;
use abz_common::Settings;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for abz-client
#[derive(Parser, Debug)]
#[command(name = "abz-client")]
#[command(about = "Extract audio features and submit them to AcousticBrainz")]
#[command(version)]
struct Args {
    /// Files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Config file (defaults to ~/.config/acousticbrainz/config.toml or ~/.acousticbrainz.toml)
    #[arg(short, long, env = "ABZ_CONFIG")]
    config: Option<PathBuf>,

    /// Number of files processed in parallel (defaults to the number of CPUs)
    #[arg(short = 'j', long)]
    processes: Option<usize>,

    /// Do not record files whose submission failed, so the next run retries them
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "abz_client=info,abz_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    info!(
        host = %settings.host,
        database = %settings.database_path.display(),
        "Settings loaded"
    );

    let mut config = PipelineConfig {
        strict_submission: settings.strict_submission || args.strict,
        ..PipelineConfig::default()
    };
    if let Some(processes) = args.processes {
        config.workers = processes.max(1);
    }

    let pipeline = abz_client::build_pipeline(&settings, config)
        .await
        .context("Failed to initialize pipeline")?;

    let cancel_token = pipeline.cancel_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Finishing files in progress; no new files will be started");
        cancel_token.cancel();
    });

    let summary = pipeline.run(&args.paths).await?;

    if summary.log_write_failures > 0 {
        warn!(
            failures = summary.log_write_failures,
            "Some outcomes could not be recorded; those files will be processed again"
        );
    }

    Ok(())
}

/// Ctrl+C / SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
