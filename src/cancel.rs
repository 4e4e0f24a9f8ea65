use tokio::sync::watch;

/// Cancellation handle shared between the state machine and one background
/// reader. Cancelling never blocks; a reader parked in [`CancelToken::cancelled`]
/// wakes up immediately.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives inside every clone, so `wait_for` can only fail if
        // all tokens are gone, in which case nobody is left to wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
