//! alertrelay - Alertmanager to AWS SNS batching relay
//!
//! Receives Alertmanager webhooks and republishes them to SNS topics in timed,
//! per-alert-name digests.

use alertrelay::{
    app::App,
    cli::Cli,
    config::{Config, LogFormat},
};
use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Manually initialize logging for this specific error
        tracing_subscriber::fmt().json().init();
        error!("Failed to load configuration: {:#}", err);
        // Exit if configuration fails, as it's a critical step.
        std::process::exit(1);
    });

    init_tracing(&config);

    info!("alertrelay starting up...");

    // Log the loaded configuration settings for visibility
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Log Format: {}", config.log_format);
    info!("Listen Address: {}", config.server.listen_address);
    info!("AWS Region: {}", config.aws_region);
    info!("Batch Wait: {}s", config.batch_wait_seconds);
    info!("Intake Queue Capacity: {}", config.queue_capacity);
    if config.alertnames.is_empty() {
        info!("Allowed Alertnames: all ({:?} policy)", config.empty_allowlist);
    } else {
        info!("Allowed Alertnames: {:?}", config.alertnames);
    }
    for topic in &config.sns_topics {
        info!(
            "SNS Topic: {} ({}) {}-{} UTC, days: {:?}",
            topic.name, topic.arn, topic.start_time, topic.end_time, topic.days_of_week
        );
    }
    info!(
        "Metrics: {}",
        if config.metrics.enabled { "Enabled" } else { "Disabled" }
    );
    info!("-------------------------------------------------------");

    // =========================================================================
    // Create Shutdown Channel
    // =========================================================================
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = match App::builder(config).build(shutdown_rx).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start: {:#}", e);
            return Err(e);
        }
    };
    let app_handle = tokio::spawn(app.run());

    wait_for_shutdown_signal().await?;
    info!("Shutdown signal received. Shutting down gracefully...");

    // Send shutdown signal to all tasks
    let _ = shutdown_tx.send(true);

    app_handle.await??;
    Ok(())
}

fn init_tracing(config: &Config) {
    // RUST_LOG wins over the configured level.
    let (filter, invalid_level) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, false),
        Err(_) => match config.log_level.parse::<LevelFilter>() {
            Ok(level) => (EnvFilter::default().add_directive(level.into()), false),
            Err(_) => (EnvFilter::default().add_directive(LevelFilter::INFO.into()), true),
        },
    };

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    if invalid_level {
        warn!("Invalid log level '{}', defaulting to INFO", config.log_level);
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
