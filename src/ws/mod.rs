//! Core WebSocket infrastructure.
//!
//! This module provides a reconnecting connection manager that knows nothing
//! about the frames it carries. A [`FrameHandler`] plugs in the vocabulary:
//! which frames to replay when the transport opens, what an inbound text frame
//! means and how lifecycle events are surfaced.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: connection lifecycle, keep-alive probes and reconnection
//! - [`FrameHandler`]: strategy trait for interpreting frames
//! - [`Metrics`]: counters shared between the two
//!
//! # Example
//!
//! ```ignore
//! let metrics = Arc::new(Metrics::new());
//! let connection = ConnectionManager::new(endpoint, Config::default(), Arc::new(handler), metrics);
//! connection.connect().await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod keepalive;
pub mod metrics;
pub mod traits;

pub use config::{Config, ReconnectConfig};
pub use connection::{ConnectionManager, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use traits::*;
