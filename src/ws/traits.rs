//! Seam between the transport and whatever interprets its frames.

use std::time::Duration;

/// Why the connection manager stopped trying to reconnect.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectFailure {
    /// The server closed with a code that must not be retried
    NotRetryable {
        /// Close code received from the server
        code: u16,
    },
    /// Every attempt in the budget failed
    AttemptsExhausted {
        /// Number of attempts made
        attempts: u32,
    },
}

/// Lifecycle notifications raised by the connection manager.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The transport reached the open state
    Connected,
    /// The transport went away
    Disconnected {
        /// Close code, `1005` when the server sent none, `1006` for an abnormal drop
        code: u16,
        /// Close reason, possibly empty
        reason: String,
    },
    /// A reconnect attempt has been scheduled
    Reconnecting {
        /// 1-indexed attempt number
        attempt: u32,
        /// Delay before the attempt is made
        delay: Duration,
    },
    /// The manager gave up; the connection is closed
    ReconnectFailed(ReconnectFailure),
    /// A transport-level error, the state machine is driven by the close that follows
    Error(String),
}

/// What the connection manager should do after a text frame was handled.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Nothing to do
    Nothing,
    /// Write this frame back right away, ahead of queued outbound frames
    Reply(String),
    /// The server answered a liveness probe
    ProbeAnswered {
        /// Send timestamp echoed back, epoch milliseconds
        sent_at: Option<i64>,
    },
}

/// Interprets frames and lifecycle events for a [`super::ConnectionManager`].
///
/// All callbacks run on the connection task, so they must not block.
pub trait FrameHandler: Send + Sync + 'static {
    /// Called when the transport opens, before the state becomes open.
    ///
    /// The returned frames are written in order before anything else queued
    /// for the connection.
    fn on_open(&self) -> Vec<String>;

    /// Called on every exit from the open state.
    fn on_close(&self);

    /// Handle one inbound text frame.
    fn on_text(&self, text: &str) -> Reaction;

    /// Observe a lifecycle event.
    fn on_event(&self, event: ConnectionEvent);
}
