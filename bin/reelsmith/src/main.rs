//! reelsmith – entry point.
//!
//! Startup order:
//! 1. Parse the command line and environment configuration.
//! 2. Initialise structured tracing (JSON when `REELSMITH_LOG_JSON` is set).
//! 3. Build generation settings from the settings file and overrides.
//! 4. Wire gateway, credential, download sink and orchestrator together.
//! 5. Run the queue; Ctrl-C requests a stop at the next check-point, a
//!    second Ctrl-C exits immediately.

mod cli;
mod config;
mod progress;
mod settings_file;
mod sink;

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use reelsmith_core::api::Studio;
use reelsmith_core::auth::StaticCredential;
use reelsmith_core::gateway::GeminiGateway;
use reelsmith_core::{Orchestrator, RuntimeError, PROMPT_TEMPLATES};
use tracing::{info, warn};

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::sink::FileSystemSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cli = Cli::parse();
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);

    if let Some(Commands::Templates) = cli.command {
        for (idx, (label, line)) in PROMPT_TEMPLATES.iter().enumerate() {
            println!("{:>2}. {label:<10} {line}", idx + 1);
        }
        return Ok(());
    }

    info!(version = env!("CARGO_PKG_VERSION"), "reelsmith starting");

    // ── 3. Settings and prompts ────────────────────────────────────────────────
    let settings = cli.run.build_settings()?;
    let prompt_text = cli.run.read_prompt_text().await?;
    info!(
        engine = settings.engine.model_id(),
        aspect_ratio = %settings.aspect_ratio,
        resolution = %settings.resolution,
        assets = settings.assets.len(),
        base_name = settings.base_name(),
        "settings ready"
    );

    // ── 4. Collaborators ───────────────────────────────────────────────────────
    let mut gateway = GeminiGateway::new(cfg.api_key.clone().unwrap_or_default())
        .with_base_url(cfg.api_base.clone())
        .with_poll_interval(cfg.poll_interval());
    if let Some(model) = &cfg.video_model {
        gateway = gateway.with_video_model(model.clone());
    }
    let credentials = StaticCredential::new(
        cfg.api_key.as_deref(),
        "set REELSMITH_API_KEY to a key with access to the image and video models",
    );
    let sink = FileSystemSink::new(cfg.output_dir.clone(), cfg.api_key.clone());
    info!(output_dir = %sink.dir().display(), "downloads will be written here");
    let orchestrator = Orchestrator::new(Arc::new(gateway), Arc::new(credentials), Arc::new(sink));

    let mut studio = Studio::new(orchestrator, settings);
    let progress = tokio::spawn(progress::follow(studio.subscribe()));

    let cancel = studio.cancel_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
            return;
        }
        warn!("interrupt received; stopping after the current stage (press CTRL+C again to exit now)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second interrupt received; exiting without downloading");
            std::process::exit(130);
        }
    });

    // ── 5. Run ─────────────────────────────────────────────────────────────────
    let report = match studio.start(&prompt_text).await {
        Ok(report) => report,
        Err(RuntimeError::CredentialRequired) => {
            progress.abort();
            bail!("no API key configured; set REELSMITH_API_KEY and start again");
        }
        Err(e) => {
            progress.abort();
            return Err(e).context("cannot start the run");
        }
    };
    if let Err(e) = progress.await {
        warn!(error = %e, "progress view exited abnormally");
    }

    info!(downloads = report.downloads, "reelsmith finished");
    if report.halted_on_auth {
        bail!("the API rejected the configured key; check REELSMITH_API_KEY and run again");
    }
    Ok(())
}

/// Build the log-level filter, warning loudly if the configured value is
/// not a valid tracing filter expression.
fn init_tracing(cfg: &Config) {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: REELSMITH_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
