// ── Per-view error slot ──
//
// Holds at most one message. Independent of readiness: a poll can succeed
// while an unrelated action error is still showing.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::stream::StateStream;

#[derive(Debug, Clone)]
pub struct ErrorChannel {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Overwrite the current message. Always notifies subscribers, even
    /// when the text is unchanged.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "view error");
        self.tx.send_replace(Some(message));
    }

    /// Clear the message. No-op (and no notification) when already clear.
    pub fn reset_error(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<Option<String>> {
        StateStream::new(self.tx.subscribe())
    }
}
