use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

// Longest uninterrupted sleep inside `pause`.
const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// Cooperative run/stop flag shared by the worker and the stop listeners.
///
/// Cloning yields a handle to the same flag. Once stopped it never runs again.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    cancel_token: CancellationToken,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }

    pub fn stop(&self) {
        if self.is_running() {
            tracing::info!("Stop requested, unwinding at the next loop boundary");
        }
        self.cancel_token.cancel();
    }

    /// Resolves once the flag is flipped.
    pub async fn stopped(&self) {
        self.cancel_token.cancelled().await
    }

    /// Blocking sleep that wakes early on stop. Returns false when stopped.
    pub fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if !self.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(PAUSE_SLICE));
        }
    }
}
