#![allow(dead_code)]
//! Test harness that runs the full application against a mock publisher.

use super::mock_publisher::MockPublisher;
use super::FixedClock;
use alertrelay::app::App;
use alertrelay::config::Config;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct TestApp {
    pub addr: SocketAddr,
    pub publisher: MockPublisher,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<()>>,
}

impl TestApp {
    pub async fn start(config: Config, now: DateTime<Utc>) -> Self {
        let publisher = MockPublisher::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = App::builder(config)
            .publisher_override(Arc::new(publisher.clone()))
            .clock_override(Arc::new(FixedClock(now)))
            .build(shutdown_rx)
            .await
            .expect("app should build");
        let addr = app.local_addr();
        let handle = tokio::spawn(app.run());
        Self {
            addr,
            publisher,
            shutdown_tx,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signals shutdown and waits for the app to exit.
    pub async fn shutdown(self) {
        self.shutdown_tx.send(true).unwrap();
        self.handle
            .await
            .expect("app task panicked")
            .expect("app returned an error");
    }
}
