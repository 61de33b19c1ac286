//! Cooperative cancellation for scan operations.

use tokio_util::sync::CancellationToken;

/// Owns the cancellation token a [`super::scan::Scanner`] checks at each
/// well-defined yield point (per file, per group). Cloning shares the same
/// token, so a caller holding the original can cancel an in-flight scan.
#[derive(Debug, Clone, Default)]
pub struct TaskManager {
    cancel_token: CancellationToken,
}

impl TaskManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing token (e.g. an operation's cancellation signal)
    /// instead of minting a fresh one, so cancelling the operation cancels
    /// the scan it's running.
    #[must_use]
    pub fn from_token(cancel_token: CancellationToken) -> Self {
        Self { cancel_token }
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_observable_through_a_clone() {
        let manager = TaskManager::new();
        let token = manager.token();
        assert!(!token.is_cancelled());

        manager.cancel();
        assert!(token.is_cancelled());
        assert!(manager.is_cancelled());
    }
}
