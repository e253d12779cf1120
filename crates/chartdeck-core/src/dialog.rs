// ── Per-view modal dialog slot ──
//
// At most one dialog is live. Opening another replaces it without stacking;
// the replaced dialog's pending confirmation resolves as `Superseded`.
// Dialogs are plain data; the presentation layer decides how to render each
// variant and reports the user's choice back through `accept` / `cancel`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use chartdeck_api::ChartSetInfo;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::lock;
use crate::stream::StateStream;

/// Why the service needs a restart before a change takes effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RestartReason {
    /// A previously inactive chart set was enabled.
    ChartSetActivated { title: String },
    /// A chart archive finished uploading.
    UploadComplete { chart_set: Option<String> },
    /// Settings were applied.
    SettingsChanged,
}

/// What to show. Rendering is the front end's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dialog {
    /// Busy indicator while a request is outstanding.
    Spinner,
    /// Informational message.
    Alert { message: String },
    /// Yes/no question.
    Confirm {
        message: String,
        detail: Option<String>,
    },
    /// Offer to restart now; accepting triggers the restart.
    RestartRequired { reason: RestartReason },
    /// A restart is in progress. Dismissed by the first good poll after it.
    RestartTriggered,
    /// `item` was disabled in favour of the active `other`; accept to enable anyway.
    DisabledBy {
        item: ChartSetInfo,
        other: ChartSetInfo,
    },
    /// Fingerprint ready to save.
    Fingerprint {
        file_name: String,
        #[serde(skip)]
        data: Bytes,
    },
}

/// The live dialog plus the id used to dismiss it selectively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogEntry {
    pub id: u64,
    pub dialog: Dialog,
}

/// Why a confirmation did not resolve to "accepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("dialog cancelled")]
    Cancelled,
    #[error("dialog replaced before an answer")]
    Superseded,
}

/// Deferred answer of a confirm-style dialog.
///
/// Resolves `Ok(())` on accept, `Err(Cancelled)` on cancel, and
/// `Err(Superseded)` if the dialog was replaced or hidden first.
#[derive(Debug)]
pub struct Confirmation {
    rx: oneshot::Receiver<bool>,
}

impl Future for Confirmation {
    type Output = Result<(), Rejected>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|answer| match answer {
            Ok(true) => Ok(()),
            Ok(false) => Err(Rejected::Cancelled),
            Err(_) => Err(Rejected::Superseded),
        })
    }
}

struct Responder {
    id: u64,
    tx: oneshot::Sender<bool>,
}

#[derive(Clone)]
pub struct DialogSlot {
    inner: Arc<SlotInner>,
}

struct SlotInner {
    tx: watch::Sender<Option<DialogEntry>>,
    responder: Mutex<Option<Responder>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for DialogSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogSlot")
            .field("current", &*self.inner.tx.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for DialogSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            inner: Arc::new(SlotInner {
                tx,
                responder: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Replace the live dialog. Returns its id.
    pub fn set_dialog(&self, dialog: Dialog) -> u64 {
        self.install(dialog, None)
    }

    /// Show a dialog and wait for the user's answer.
    pub fn open(&self, dialog: Dialog) -> Confirmation {
        let (tx, rx) = oneshot::channel();
        self.install(dialog, Some(tx));
        Confirmation { rx }
    }

    /// Ask a yes/no question.
    pub fn confirm(&self, message: impl Into<String>, detail: Option<String>) -> Confirmation {
        self.open(Dialog::Confirm {
            message: message.into(),
            detail,
        })
    }

    /// Fire-and-forget informational dialog.
    pub fn alert(&self, message: impl Into<String>) -> u64 {
        self.set_dialog(Dialog::Alert {
            message: message.into(),
        })
    }

    /// Clear whatever is showing.
    pub fn hide_dialog(&self) {
        let mut responder = lock(&self.inner.responder);
        responder.take();
        self.inner.tx.send_if_modified(|current| current.take().is_some());
    }

    /// Clear the dialog only if it is still the one identified by `id`.
    pub fn dismiss(&self, id: u64) -> bool {
        self.hide_where(|entry| entry.id == id)
    }

    /// Clear the dialog only if it matches `pred`.
    pub fn hide_if(&self, pred: impl Fn(&Dialog) -> bool) -> bool {
        self.hide_where(|entry| pred(&entry.dialog))
    }

    /// User accepted the live dialog.
    pub fn accept(&self) {
        self.answer(true);
    }

    /// User cancelled the live dialog.
    pub fn cancel(&self) {
        self.answer(false);
    }

    pub fn current(&self) -> Option<DialogEntry> {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<Option<DialogEntry>> {
        StateStream::new(self.inner.tx.subscribe())
    }

    fn install(&self, dialog: Dialog, tx: Option<oneshot::Sender<bool>>) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut responder = lock(&self.inner.responder);
        // Dropping the previous sender resolves its confirmation as Superseded.
        *responder = tx.map(|tx| Responder { id, tx });
        debug!(id, ?dialog, "dialog opened");
        self.inner.tx.send_replace(Some(DialogEntry { id, dialog }));
        id
    }

    fn hide_where(&self, pred: impl Fn(&DialogEntry) -> bool) -> bool {
        let mut responder = lock(&self.inner.responder);
        let hidden = self.inner.tx.send_if_modified(|current| {
            if current.as_ref().is_some_and(&pred) {
                *current = None;
                true
            } else {
                false
            }
        });
        if hidden {
            responder.take();
        }
        hidden
    }

    fn answer(&self, accepted: bool) {
        let mut responder = lock(&self.inner.responder);
        let live = self.inner.tx.borrow().as_ref().map(|entry| entry.id);
        let Some(id) = live else {
            return;
        };
        self.inner.tx.send_replace(None);
        if let Some(r) = responder.take() {
            if r.id == id {
                let _ = r.tx.send(accepted);
            }
        }
        debug!(id, accepted, "dialog answered");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_resolves_and_hides() {
        let slot = DialogSlot::new();
        let confirmation = slot.confirm("Really delete version 2?", Some("OSM".into()));
        assert!(matches!(
            slot.current().unwrap().dialog,
            Dialog::Confirm { .. }
        ));
        slot.accept();
        assert_eq!(confirmation.await, Ok(()));
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn cancel_rejects_and_hides() {
        let slot = DialogSlot::new();
        let confirmation = slot.confirm("Sure?", None);
        slot.cancel();
        assert_eq!(confirmation.await, Err(Rejected::Cancelled));
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn second_dialog_discards_first_resolution() {
        let slot = DialogSlot::new();
        let first = slot.confirm("first", None);
        let second = slot.confirm("second", None);
        slot.accept();
        assert_eq!(first.await, Err(Rejected::Superseded));
        assert_eq!(second.await, Ok(()));
    }

    #[tokio::test]
    async fn plain_dialog_replacing_confirm_supersedes_it() {
        let slot = DialogSlot::new();
        let pending = slot.confirm("question", None);
        slot.set_dialog(Dialog::Spinner);
        assert_eq!(pending.await, Err(Rejected::Superseded));
        assert_eq!(slot.current().unwrap().dialog, Dialog::Spinner);
    }

    #[test]
    fn dismiss_only_matching_id() {
        let slot = DialogSlot::new();
        let spinner = slot.set_dialog(Dialog::Spinner);
        let alert = slot.alert("restart triggered");
        assert!(!slot.dismiss(spinner));
        assert_eq!(slot.current().unwrap().id, alert);
        assert!(slot.dismiss(alert));
        assert!(slot.current().is_none());
    }

    #[test]
    fn hide_if_leaves_other_dialogs() {
        let slot = DialogSlot::new();
        slot.alert("hello");
        assert!(!slot.hide_if(|d| matches!(d, Dialog::RestartTriggered)));
        slot.set_dialog(Dialog::RestartTriggered);
        assert!(slot.hide_if(|d| matches!(d, Dialog::RestartTriggered)));
        assert!(slot.current().is_none());
    }

    #[test]
    fn answering_empty_slot_is_noop() {
        let slot = DialogSlot::new();
        slot.accept();
        slot.cancel();
        assert!(slot.current().is_none());
    }
}
