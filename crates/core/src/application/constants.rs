// Poller constants (no magic values)
use std::time::Duration;

/// Default total wait budget (5 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default time between condition evaluations (1s)
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Smallest interval the poller accepts; zero would spin
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
