// ── Chart archive upload session ──
//
// One transfer, observable through two channels: monotonic progress and a
// terminal outcome that is written exactly once. Cancelling wins any race
// with the transfer's own completion, and progress reported after the
// outcome is fixed is ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chartdeck_api::{ChartClient, ErrorKind, TransferProgress, UploadReceipt};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::UploadPolicy;
use crate::error::CoreError;
use crate::stream::StateStream;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// How a transfer ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    Completed(UploadReceipt),
    Failed { kind: ErrorKind, message: String },
    Cancelled,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Check the file before anything goes over the wire. Returns its size.
pub fn validate(path: &Path, policy: &UploadPolicy) -> Result<u64, CoreError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let accepted = extension
        .as_deref()
        .is_some_and(|ext| policy.accepted_extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)));
    if !accepted {
        let list = policy
            .accepted_extensions
            .iter()
            .map(|e| format!(".{e}"))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(CoreError::validation(format!("only files {list} are allowed")));
    }

    let meta = std::fs::metadata(path).map_err(|e| {
        CoreError::validation(format!("cannot read {}: {e}", path.display()))
    })?;
    if !meta.is_file() {
        return Err(CoreError::validation(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    if meta.len() > policy.max_bytes {
        return Err(CoreError::validation(format!(
            "{} is larger than the {} byte limit",
            path.display(),
            policy.max_bytes
        )));
    }
    Ok(meta.len())
}

/// Handle to one upload. Clones share the same transfer.
#[derive(Debug, Clone)]
pub struct UploadSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: u64,
    path: PathBuf,
    cancel: CancellationToken,
    progress: watch::Sender<TransferProgress>,
    outcome: watch::Sender<Option<UploadOutcome>>,
}

impl UploadSession {
    /// Validate `path` and start the transfer in the background.
    ///
    /// Fails with `ValidationFailed` without touching the network when the
    /// file is rejected. Must be called from within a Tokio runtime.
    pub fn start(client: &ChartClient, path: &Path, policy: &UploadPolicy) -> Result<Self, CoreError> {
        let total = validate(path, policy)?;
        let session = Self::detached(path, Some(total));
        info!(id = session.id(), path = %path.display(), total, "upload started");

        let client = client.clone();
        let runner = session.clone();
        tokio::spawn(async move {
            let sink = Arc::clone(&runner.inner);
            let result = client
                .upload_archive(
                    &runner.inner.path,
                    move |p| sink.record_progress(p),
                    runner.inner.cancel.clone(),
                )
                .await;
            let outcome = match result {
                Ok(receipt) => UploadOutcome::Completed(receipt),
                Err(chartdeck_api::Error::UserCancelled) => UploadOutcome::Cancelled,
                Err(e) => UploadOutcome::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                },
            };
            runner.inner.finish(outcome);
        });

        Ok(session)
    }

    fn detached(path: &Path, total: Option<u64>) -> Self {
        let (progress, _) = watch::channel(TransferProgress { loaded: 0, total });
        let (outcome, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
                path: path.to_path_buf(),
                cancel: CancellationToken::new(),
                progress,
                outcome,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn file_name(&self) -> String {
        self.inner
            .path
            .file_name()
            .map_or_else(|| self.inner.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Abort the transfer. The outcome becomes `Cancelled` before this
    /// returns, unless the transfer had already finished.
    pub fn cancel(&self) -> bool {
        self.inner.cancel.cancel();
        self.inner.finish(UploadOutcome::Cancelled)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.outcome.borrow().is_some()
    }

    pub fn current_progress(&self) -> TransferProgress {
        *self.inner.progress.borrow()
    }

    pub fn progress(&self) -> StateStream<TransferProgress> {
        StateStream::new(self.inner.progress.subscribe())
    }

    /// Wait for the terminal outcome.
    pub async fn outcome(&self) -> UploadOutcome {
        let mut rx = self.inner.outcome.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(done) => done.as_ref().cloned().unwrap_or(UploadOutcome::Cancelled),
            Err(_) => UploadOutcome::Cancelled,
        }
    }
}

impl SessionInner {
    fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.outcome.borrow().is_some()
    }

    fn record_progress(&self, update: TransferProgress) {
        if self.is_closed() {
            return;
        }
        self.progress.send_if_modified(|current| {
            if update.loaded < current.loaded {
                return false;
            }
            let total = update.total.or(current.total);
            let changed = update.loaded != current.loaded || total != current.total;
            *current = TransferProgress {
                loaded: update.loaded,
                total,
            };
            changed
        });
    }

    /// Set the outcome if none is set yet. Returns `true` if this call won.
    fn finish(&self, outcome: UploadOutcome) -> bool {
        let won = self.outcome.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            match &outcome {
                UploadOutcome::Completed(receipt) => {
                    info!(id = self.id, chart_set = ?receipt.chart_set, "upload finished");
                }
                UploadOutcome::Failed { message, .. } => {
                    warn!(id = self.id, %message, "upload failed");
                }
                UploadOutcome::Cancelled => info!(id = self.id, "upload cancelled"),
            }
            *current = Some(outcome);
            true
        });
        if !won {
            debug!(id = self.id, "late upload outcome ignored");
        }
        won
    }
}
