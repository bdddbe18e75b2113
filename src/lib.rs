/// alertrelay - Alertmanager to AWS SNS batching relay
///
/// This library receives Alertmanager webhooks, filters them by alert name,
/// accumulates them for a fixed interval, and publishes one digest per alert
/// name to every SNS topic whose availability window is open.
pub mod app;
pub mod availability;
pub mod batch;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod formatting;
pub mod ingest;
pub mod internal_metrics;
pub mod publisher;
pub mod scheduler;
pub mod server;
pub mod task_manager;

// Re-export core types for convenience
pub use core::*;
