//! Liveness probes and round-trip accounting.
//!
//! A probe is a WebSocket ping control frame whose payload is the send time
//! in milliseconds since the Unix epoch, big-endian. The server echoes it in
//! the pong, so the round trip is computed from the echoed value without
//! trusting the server clock.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;

/// Number of round-trip samples kept for the rolling average.
pub const LATENCY_WINDOW: usize = 20;

/// Unanswered probes remembered for staleness checks.
const OUTSTANDING_CAPACITY: usize = 8;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Encode a probe payload carrying `sent_at` milliseconds.
#[must_use]
pub fn encode_probe(sent_at: i64) -> [u8; 8] {
    sent_at.to_be_bytes()
}

/// Decode a pong payload back to the probe timestamp.
///
/// Returns `None` when the payload was not produced by [`encode_probe`].
#[must_use]
pub fn decode_probe(payload: &[u8]) -> Option<i64> {
    let bytes: [u8; 8] = payload.try_into().ok()?;
    Some(i64::from_be_bytes(bytes))
}

/// Round trip for a probe sent at `sent_at` and answered at `now`, both in
/// epoch milliseconds. Clock steps backwards clamp to zero.
#[must_use]
pub fn round_trip(sent_at: i64, now: i64) -> Duration {
    let elapsed = now.saturating_sub(sent_at).max(0);
    Duration::from_millis(u64::try_from(elapsed).unwrap_or_default())
}

/// Probes sent on the current connection that have not been answered yet.
#[derive(Debug, Default)]
pub(crate) struct Probes {
    outstanding: VecDeque<i64>,
}

impl Probes {
    pub(crate) fn sent(&mut self, sent_at: i64) {
        if self.outstanding.len() == OUTSTANDING_CAPACITY {
            self.outstanding.pop_front();
        }
        self.outstanding.push_back(sent_at);
    }

    /// Mark the probe sent at `sent_at` as answered along with every older one.
    ///
    /// Returns `false` when no such probe is outstanding.
    pub(crate) fn answered(&mut self, sent_at: i64) -> bool {
        if !self.outstanding.contains(&sent_at) {
            return false;
        }
        self.outstanding.retain(|&ts| ts > sent_at);
        true
    }

    /// How long the oldest unanswered probe has been waiting.
    pub(crate) fn oldest_pending(&self, now: i64) -> Option<Duration> {
        self.outstanding.front().map(|&ts| round_trip(ts, now))
    }
}

/// Fixed-size window of round-trip samples.
#[derive(Debug, Clone, Default)]
pub struct LatencyWindow {
    samples: VecDeque<Duration>,
}

impl LatencyWindow {
    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == LATENCY_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Mean of the retained samples, `None` before the first one.
    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        let count = u32::try_from(self.samples.len()).ok().filter(|&n| n > 0)?;
        let total: Duration = self.samples.iter().sum();
        Some(total / count)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
