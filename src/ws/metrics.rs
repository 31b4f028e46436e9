use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::keepalive::LatencyWindow;

/// Point-in-time copy of the session counters.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Well-formed inbound frames since construction or the last reset
    pub messages_received: u64,
    /// Inbound frames that could not be decoded
    pub parse_errors: u64,
    /// Reconnect attempts made
    pub reconnect_count: u64,
    /// Rolling average of keep-alive round trips
    pub average_latency: Option<Duration>,
    /// Time since the last well-formed inbound frame
    pub since_last_message: Option<Duration>,
    /// How long the current connection has been open
    pub uptime: Option<Duration>,
    /// Average inbound rate since construction or the last reset
    pub messages_per_second: f64,
}

#[derive(Debug)]
struct Timing {
    started: Instant,
    connected_since: Option<Instant>,
    last_message: Option<Instant>,
    latency: LatencyWindow,
}

impl Timing {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            connected_since: None,
            last_message: None,
            latency: LatencyWindow::default(),
        }
    }
}

/// Counters shared between the connection task and the frame handler.
///
/// Counts only ever grow; [`Metrics::reset`] is the only way to clear them.
#[derive(Debug)]
pub struct Metrics {
    messages_received: AtomicU64,
    parse_errors: AtomicU64,
    reconnects: AtomicU64,
    timing: Mutex<Timing>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            timing: Mutex::new(Timing::new()),
        }
    }

    fn timing(&self) -> MutexGuard<'_, Timing> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.timing().last_message = Some(Instant::now());
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_attempt(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, sample: Duration) {
        self.timing().latency.record(sample);
    }

    pub(crate) fn connection_opened(&self) {
        self.timing().connected_since = Some(Instant::now());
    }

    pub(crate) fn connection_closed(&self) {
        self.timing().connected_since = None;
    }

    /// Clear every counter and the latency window.
    ///
    /// The open-since marker of a live connection is kept.
    pub fn reset(&self) {
        self.messages_received.store(0, Ordering::Relaxed);
        self.parse_errors.store(0, Ordering::Relaxed);
        self.reconnects.store(0, Ordering::Relaxed);

        let mut timing = self.timing();
        timing.started = Instant::now();
        timing.last_message = None;
        timing.latency.clear();
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = Instant::now();
        let messages_received = self.messages_received.load(Ordering::Relaxed);
        let timing = self.timing();

        MetricsSnapshot {
            messages_received,
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            reconnect_count: self.reconnects.load(Ordering::Relaxed),
            average_latency: timing.latency.average(),
            since_last_message: timing.last_message.map(|at| now.duration_since(at)),
            uptime: timing.connected_since.map(|at| now.duration_since(at)),
            messages_per_second: rate(messages_received, now.duration_since(timing.started)),
        }
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "A rate is inherently approximate"
)]
fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}
