// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;

/// Bounded retry budget applied to one window's staging-and-recognition
/// sequence. The whole sequence is retried, not individual steps.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            pause: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, pause: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            pause,
        }
    }
}
