//! Cooperative cancellation and time limits for long-running analyses

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::error::{EngineError, EngineResult};

/// Shared flag that callers flip to stop a running analysis
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cancellation token plus an optional deadline, polled between units of work
#[derive(Debug, Clone)]
pub struct RunControl {
    token: CancellationToken,
    started: Instant,
    timeout: Option<Duration>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    /// No deadline, fresh token
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            started: Instant::now(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Fail if the token was cancelled or the deadline passed
    pub fn check(&self) -> EngineResult<()> {
        if self.token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if let Some(limit) = self.timeout {
            if self.started.elapsed() >= limit {
                return Err(EngineError::TimedOut {
                    limit_ms: limit.as_millis(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_control_passes() {
        assert!(RunControl::new().check().is_ok());
    }

    #[test]
    fn test_cancelled_token_is_reported() {
        let token = CancellationToken::new();
        let control = RunControl::new().with_token(token.clone());
        token.cancel();
        assert_eq!(control.check(), Err(EngineError::Cancelled));
    }

    #[test]
    fn test_zero_timeout_expires() {
        let control = RunControl::new().with_timeout(Duration::ZERO);
        assert!(matches!(control.check(), Err(EngineError::TimedOut { limit_ms: 0 })));
    }
}
