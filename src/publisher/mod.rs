//! Outbound transports for formatted alert messages.
//!
//! The pipeline only depends on the `Publisher` trait from `core`; this module
//! holds the concrete implementations.
pub mod sns;

pub use sns::SnsPublisher;
