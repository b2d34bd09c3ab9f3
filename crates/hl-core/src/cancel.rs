//! Cooperative cancellation for long-running pipeline stages.
//!
//! Stages call [`CancelToken::check`] at chunk boundaries (after each array
//! chunk, station or time step). A token may also carry a deadline, which is
//! how compute timeouts are expressed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::CoreError;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a token sharing this token's flag that also expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(deadline),
        }
    }

    /// Request cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire) || self.is_expired()
    }

    fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with `Cancelled` if cancellation was requested or the deadline passed.
    pub fn check(&self) -> Result<(), CoreError> {
        if self.flag.load(Ordering::Acquire) {
            return Err(CoreError::Cancelled {
                reason: "cancelled by caller".to_string(),
            });
        }
        if self.is_expired() {
            return Err(CoreError::Cancelled {
                reason: "deadline exceeded".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(clone.check().is_ok());
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(CoreError::Cancelled { .. })));
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let token = CancelToken::new().with_timeout(Duration::ZERO);
        let err = token.check().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Cancelled);
        assert!(err.to_string().contains("deadline"));
    }

    #[test]
    fn timeout_keeps_earlier_deadline() {
        let short = CancelToken::new().with_timeout(Duration::ZERO);
        let long = short.with_timeout(Duration::from_secs(3600));
        assert!(long.is_cancelled());
    }
}
