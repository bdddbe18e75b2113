//! The main application logic, decoupled from the entry point.

use crate::{
    batch::PendingBatch,
    config::Config,
    core::{Clock, Publisher, SystemClock},
    dispatch::Dispatcher,
    formatting::DigestFormatter,
    ingest::{AlertIntake, AllowList},
    internal_metrics::MetricsBuilder,
    publisher::SnsPublisher,
    scheduler::FlushScheduler,
    server::{self, AppState, WebhookServer},
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// A handle to the running application.
pub struct App {
    server_tasks: TaskManager,
    scheduler_tasks: TaskManager,
    scheduler_shutdown_tx: watch::Sender<bool>,
    local_addr: SocketAddr,
    shutdown_timeout: Duration,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the webhook server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the shutdown signal, then shuts down in order: the HTTP
    /// server first, then the flush scheduler, which drains what is pending.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.server_tasks.get_shutdown_rx();
        // A dropped sender is treated as a shutdown request.
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
        info!("Shutting down server...");

        match tokio::time::timeout(self.shutdown_timeout, self.server_tasks.shutdown()).await {
            Ok(0) => {}
            Ok(panicked) => warn!(panicked, "Server tasks panicked"),
            Err(_) => warn!(timeout = ?self.shutdown_timeout, "Server forced to shutdown"),
        }

        // The scheduler may already be gone if it panicked.
        let _ = self.scheduler_shutdown_tx.send(true);
        let panicked = self.scheduler_tasks.shutdown().await;
        if panicked > 0 {
            warn!(panicked, "Scheduler panicked; pending alerts were lost");
        }

        info!("Server exiting");
        Ok(())
    }
}

/// Builder for the main application.
///
/// This pattern allows for a clean separation of concerns between constructing
/// the application's components and running the application. It also provides
/// a convenient way to override components for testing purposes.
pub struct AppBuilder {
    config: Config,
    publisher_override: Option<Arc<dyn Publisher>>,
    clock_override: Option<Arc<dyn Clock>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            publisher_override: None,
            clock_override: None,
        }
    }

    /// Overrides the SNS publisher, skipping AWS verification.
    pub fn publisher_override(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher_override = Some(publisher);
        self
    }

    /// Overrides the clock used to evaluate topic windows.
    pub fn clock_override(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock_override = Some(clock);
        self
    }

    /// Builds and starts all application components, returning a runnable `App`.
    ///
    /// Fails if the metrics recorder cannot be installed, the publisher cannot
    /// be verified, or the listen address cannot be bound.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let mut config = self.config;
        config.apply_default_timeouts();

        // =========================================================================
        // 1. Initialize Metrics
        // =========================================================================
        let (metrics, prom_handle) = MetricsBuilder::new(config.metrics.clone()).build()?;
        let metrics = Arc::new(metrics);

        // =========================================================================
        // 2. Pre-flight Checks & Service Instantiation
        // =========================================================================
        let publisher: Arc<dyn Publisher> = match self.publisher_override {
            Some(publisher) => publisher,
            None => Arc::new(
                SnsPublisher::connect(&config)
                    .await
                    .context("Failed to initialize AWS client")?,
            ),
        };
        let clock = self
            .clock_override
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let listener = TcpListener::bind(config.server.listen_address)
            .await
            .with_context(|| format!("Failed to bind {}", config.server.listen_address))?;
        let local_addr = listener.local_addr()?;

        // =========================================================================
        // 3. Build the Pipeline
        // =========================================================================
        let allow_list = AllowList::new(config.alertnames.clone(), config.empty_allowlist);
        let (intake, alert_rx) =
            AlertIntake::channel(allow_list, config.queue_capacity, metrics.clone());

        let dispatcher = Dispatcher::new(
            config.sns_topics.clone(),
            publisher.clone(),
            Box::new(DigestFormatter),
            config.timeouts.aws.api_call_timeout(),
            metrics.clone(),
        );

        let (scheduler_shutdown_tx, scheduler_shutdown_rx) = watch::channel(false);
        let scheduler_tasks = TaskManager::new("scheduler", scheduler_shutdown_rx);
        let scheduler = FlushScheduler::new(
            config.batch_wait(),
            alert_rx,
            Arc::new(PendingBatch::new()),
            dispatcher,
            clock,
        );
        scheduler_tasks.spawn(
            "FlushScheduler",
            scheduler.run(scheduler_tasks.get_shutdown_rx()),
        );

        // =========================================================================
        // 4. Start the Webhook Server
        // =========================================================================
        let server_tasks = TaskManager::new("server", shutdown_rx);
        let state = AppState {
            intake,
            publisher,
            check_timeout: config.timeouts.aws.api_call_timeout(),
        };
        let router = server::router(state, prom_handle);
        server_tasks.spawn(
            "WebhookServer",
            WebhookServer::new(listener, router, server_tasks.get_shutdown_rx()).run(),
        );

        info!(%local_addr, "alertrelay initialized successfully. Waiting for alerts...");

        Ok(App {
            server_tasks,
            scheduler_tasks,
            scheduler_shutdown_tx,
            local_addr,
            shutdown_timeout: Duration::from_secs(config.timeouts.server.shutdown_timeout_seconds),
        })
    }
}
