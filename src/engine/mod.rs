pub mod retry_engine;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use retry_engine::RetryEngine;

/// Attempt budget and constant inter-attempt delay for one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    pub fn find_and_click() -> Self {
        Self::new(100, 100)
    }

    pub fn sequence() -> Self {
        Self::new(50, 500)
    }

    pub fn click_until() -> Self {
        Self::new(50, 2000)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The target was detected (and acted on, where the operation acts).
    Success,
    /// Every attempt ran without detecting the target.
    Exhausted,
    /// The template could not be loaded; nothing was attempted.
    Skipped,
    /// The run was stopped before the operation finished.
    Stopped,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Per-step tally of a `click_sequence` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub clicked: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stopped: bool,
}

impl SequenceReport {
    /// True once every step was attempted, whether or not it succeeded.
    pub fn is_complete(&self) -> bool {
        !self.stopped
    }
}
