use std::sync::Arc;

use tokio::sync::watch;

/// Shared cooperative stop signal for a run.
///
/// Cloning yields another handle to the same signal. The orchestrator reads
/// it only at coarse check-points (before each task and after each stage),
/// so a stage already in flight always finishes on its own.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Clear the signal so the token can drive a fresh run.
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that observes every change of the signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_the_signal() {
        let token = CancelToken::new();
        let other = token.clone();
        let mut rx = token.subscribe();
        assert!(!other.is_cancelled());

        token.cancel();
        assert!(other.is_cancelled());
        rx.changed().await.expect("sender alive");
        assert!(*rx.borrow());

        other.reset();
        assert!(!token.is_cancelled());
    }
}
