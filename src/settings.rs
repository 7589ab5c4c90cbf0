//! Feature toggles for a play session.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// How long the automated opponent "thinks" before its move lands.
pub const DEFAULT_THINK_DELAY: Duration = Duration::from_millis(600);

/// User-configurable settings.
///
/// Staged through [`Session::set_settings`](crate::Session::set_settings)
/// and consumed when the session resets; the running round keeps the
/// settings it started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// O is played by the move selector.
    pub automated_opponent: bool,
    /// One random square is blocked each round.
    pub mystery_square: bool,
    /// Deferral before an automated move is applied.
    pub think_delay: Duration,
}

impl Settings {
    /// Creates settings with defaults.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            automated_opponent: true,
            mystery_square: true,
            think_delay: DEFAULT_THINK_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new();
        assert!(settings.automated_opponent);
        assert!(settings.mystery_square);
        assert_eq!(settings.think_delay, Duration::from_millis(600));
    }
}
