#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::backoff::Backoff as _;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

const DEFAULT_KEEPALIVE_INTERVAL_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_INITIAL_BACKOFF_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF_DURATION: Duration = Duration::from_secs(60);
const DEFAULT_RESET_AFTER_DURATION: Duration = Duration::from_secs(60);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const JITTER_RANDOMIZATION_FACTOR: f64 = 0.5;

/// Close codes that end the session instead of scheduling a reconnect:
/// normal closure, going away, protocol error, policy violation and
/// authentication rejection.
pub const DEFAULT_NON_RETRYABLE_CODES: [u16; 5] = [1000, 1001, 1002, 1008, 4001];

/// Configuration for WebSocket client behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Interval between liveness probes while the transport is open
    pub keepalive_interval: Duration,
    /// When set, the transport is considered dead once the oldest unanswered
    /// probe is older than this
    pub stale_after: Option<Duration>,
    /// Reconnection strategy configuration
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL_DURATION,
            stale_after: None,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Configuration for automatic reconnection behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts before giving up.
    /// `None` means infinite retries.
    pub max_attempts: Option<u32>,
    /// Delay before the first reconnection attempt
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Randomize each delay by up to ±50%
    pub jitter: bool,
    /// A connection that stays open this long restores the full attempt budget
    pub reset_after: Duration,
    /// Close codes that must not trigger a reconnect
    pub non_retryable_codes: Vec<u16>,
}

impl ReconnectConfig {
    /// Whether a transport close with `code` should be followed by a reconnect.
    #[must_use]
    pub fn is_retryable(&self, code: u16) -> bool {
        !self.non_retryable_codes.contains(&code)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            initial_backoff: DEFAULT_INITIAL_BACKOFF_DURATION,
            max_backoff: DEFAULT_MAX_BACKOFF_DURATION,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: false,
            reset_after: DEFAULT_RESET_AFTER_DURATION,
            non_retryable_codes: DEFAULT_NON_RETRYABLE_CODES.to_vec(),
        }
    }
}

impl From<ReconnectConfig> for ExponentialBackoff {
    fn from(config: ReconnectConfig) -> Self {
        let randomization_factor = if config.jitter {
            JITTER_RANDOMIZATION_FACTOR
        } else {
            0.0
        };

        ExponentialBackoffBuilder::default()
            .with_initial_interval(config.initial_backoff)
            .with_max_interval(config.max_backoff)
            .with_multiplier(config.backoff_multiplier)
            .with_randomization_factor(randomization_factor)
            .with_max_elapsed_time(None) // We handle max attempts separately
            .build()
    }
}

/// Attempt accounting for one reconnecting session.
#[derive(Debug)]
pub(crate) struct ReconnectSchedule {
    backoff: ExponentialBackoff,
    attempt: u32,
    max_attempts: Option<u32>,
}

impl ReconnectSchedule {
    pub(crate) fn new(config: &ReconnectConfig) -> Self {
        Self {
            backoff: config.clone().into(),
            attempt: 0,
            max_attempts: config.max_attempts,
        }
    }

    /// The next 1-indexed attempt and the delay to wait before it, or `None`
    /// once the budget is spent.
    pub(crate) fn next_attempt(&mut self) -> Option<(u32, Duration)> {
        if let Some(max) = self.max_attempts
            && self.attempt >= max
        {
            return None;
        }

        let delay = self.backoff.next_backoff()?;
        self.attempt = self.attempt.saturating_add(1);
        Some((self.attempt, delay))
    }

    pub(crate) const fn attempts(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
        self.backoff.reset();
    }
}
