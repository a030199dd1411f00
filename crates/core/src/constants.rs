//! Shared constants for the application

use std::time::Duration;

/// Default time an instance stays on screen before the next cycle (1 hour)
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 3600;

/// Delay before retrying when no playlist is active.
/// Short so that a window opening is picked up promptly.
pub const NO_ACTIVE_RETRY_SECS: u64 = 60;

/// Overall bound on a single render call
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 120;

/// Default bound on an external renderer process
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// How often a running external renderer is polled for exit
pub const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on any single wait between cycles (1 week)
pub const MAX_CYCLE_INTERVAL_SECS: u64 = 7 * 24 * 3600;

/// How long a caller blocks waiting for a requested refresh to finish
pub const MANUAL_REFRESH_WAIT_SECS: u64 = 60;
