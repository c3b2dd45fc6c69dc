//! Engine configuration.

use std::time::Duration;

/// Default grace period before a dropped user is considered gone.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);
/// Default interval between match retries for a waiting searcher.
pub const DEFAULT_MATCH_RETRY_INTERVAL: Duration = Duration::from_millis(1000);
/// Default upper bound of the random delay added to each match retry.
pub const DEFAULT_MATCH_RETRY_JITTER: Duration = Duration::from_millis(250);
/// Default deduplication window for ephemeral messages.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(1000);
/// Default ceiling of buffered ephemeral messages per random room.
pub const DEFAULT_MAX_BUFFERED_MESSAGES: usize = 1000;
/// Default number of inbound events accepted per connection and window.
pub const DEFAULT_RATE_LIMIT_MAX_EVENTS: usize = 10;
/// Default sliding window for the per-connection event-rate ceiling.
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_millis(1000);

/// Tunables of the matchmaking engine and the realtime relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay between the last connection drop and confirmed-disconnect handling
    pub grace_period: Duration,
    /// Fixed interval between match retries
    pub match_retry_interval: Duration,
    /// Maximum random delay added on top of `match_retry_interval`
    pub match_retry_jitter: Duration,
    /// Window within which identical messages from one sender are one delivery
    pub dedup_window: Duration,
    /// Buffered messages kept per random room; the oldest are dropped beyond this
    pub max_buffered_messages: usize,
    /// Maximum inbound events per connection within `rate_limit_window`
    pub rate_limit_max_events: usize,
    /// Sliding window of the event-rate ceiling
    pub rate_limit_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            match_retry_interval: DEFAULT_MATCH_RETRY_INTERVAL,
            match_retry_jitter: DEFAULT_MATCH_RETRY_JITTER,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            max_buffered_messages: DEFAULT_MAX_BUFFERED_MESSAGES,
            rate_limit_max_events: DEFAULT_RATE_LIMIT_MAX_EVENTS,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
        }
    }
}

impl EngineConfig {
    /// Deduplication window in milliseconds, as compared against message timestamps.
    pub fn dedup_window_millis(&self) -> i64 {
        i64::try_from(self.dedup_window.as_millis()).unwrap_or(i64::MAX)
    }
}
