// ── Charts screen ──
//
// Polls readiness and re-fetches `status/` when it changes. Owns the
// restart window, the chart set actions (enable, disable, delete), the
// fingerprint download, and at most one archive upload.

use std::path::Path;
use std::sync::{Arc, Mutex, Weak};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chartdeck_api::{ChartClient, ChartSetStatus, ServiceStatus, TransferProgress};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{ConsoleConfig, UploadPolicy};
use crate::dialog::{Dialog, RestartReason};
use crate::error::CoreError;
use crate::lock;
use crate::readiness::ReadinessState;
use crate::restart::{RestartSuppressionWindow, RestartToken};
use crate::stream::StateStream;
use crate::upload::{UploadOutcome, UploadSession};
use crate::view::{Background, ReadinessTracker, View, ViewContext};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartsState {
    pub readiness: ReadinessState,
    pub status: Option<ServiceStatus>,
    pub upload: Option<UploadStatus>,
}

impl ChartsState {
    fn readiness_mut(&mut self) -> &mut ReadinessState {
        &mut self.readiness
    }

    pub fn find_set(&self, name: &str) -> Option<&ChartSetStatus> {
        self.status.as_ref()?.find_set(name)
    }
}

/// The upload currently shown in the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadStatus {
    pub id: u64,
    pub file_name: String,
    pub progress: TransferProgress,
}

#[derive(Debug, Clone)]
pub struct ChartsView {
    inner: Arc<ChartsInner>,
}

#[derive(Debug)]
struct ChartsInner {
    client: ChartClient,
    ctx: ViewContext,
    state: watch::Sender<ChartsState>,
    readiness: ReadinessTracker,
    upload: Mutex<Option<UploadSession>>,
    policy: UploadPolicy,
    background: Background,
}

impl ChartsView {
    pub fn new(client: ChartClient, config: &ConsoleConfig) -> Self {
        let (state, _) = watch::channel(ChartsState::default());
        Self {
            inner: Arc::new(ChartsInner {
                client,
                ctx: ViewContext::new(),
                state,
                readiness: ReadinessTracker::new(RestartSuppressionWindow::new(
                    config.restart_window,
                    config.min_restart_window,
                )),
                upload: Mutex::new(None),
                policy: config.upload.clone(),
                background: Background::default(),
            }),
        }
    }

    fn from_weak(weak: &Weak<ChartsInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> ChartsState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<ChartsState> {
        StateStream::new(self.inner.state.subscribe())
    }

    pub fn readiness(&self) -> ReadinessState {
        self.inner.state.borrow().readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness().is_ready()
    }

    pub fn restart_window(&self) -> RestartSuppressionWindow {
        self.inner.readiness.window()
    }

    /// Restart token to capture before issuing a request.
    pub fn begin_request(&self) -> RestartToken {
        self.inner.readiness.token()
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// One readiness poll, followed by a status fetch if readiness changed.
    pub async fn poll_ready(&self) {
        let issued = self.begin_request();
        let result = self.inner.client.ready().await.map_err(CoreError::from);
        if self.apply_ready(issued, result, Instant::now()) {
            self.refresh_status().await;
        }
    }

    /// Fold a readiness result. Returns `true` if `status/` should be fetched.
    pub fn apply_ready(
        &self,
        issued: RestartToken,
        result: Result<bool, CoreError>,
        now: Instant,
    ) -> bool {
        self.inner.readiness.apply(
            &self.inner.ctx,
            &self.inner.state,
            ChartsState::readiness_mut,
            issued,
            result,
            now,
        )
    }

    /// Fetch `status/` out of band.
    pub async fn refresh_status(&self) {
        let issued = self.begin_request();
        let result = self.inner.client.status().await.map_err(CoreError::from);
        self.apply_status(issued, result, Instant::now());
    }

    pub fn apply_status(
        &self,
        issued: RestartToken,
        result: Result<ServiceStatus, CoreError>,
        now: Instant,
    ) {
        match result {
            Ok(status) => {
                self.inner.state.send_modify(|s| s.status = Some(status));
            }
            Err(e) => {
                if self.inner.readiness.should_suppress(issued, now) {
                    return;
                }
                self.inner
                    .ctx
                    .errors
                    .set_error(format!("Error fetching current status: {e}"));
            }
        }
    }

    // ── Restart ──────────────────────────────────────────────────────

    /// Open the restart window at `now` and show `Restarting`.
    pub fn mark_restart(&self, now: Instant) {
        self.inner
            .readiness
            .begin_restart(&self.inner.state, ChartsState::readiness_mut, now);
    }

    /// Ask the service to restart.
    pub async fn trigger_restart(&self) -> Result<(), CoreError> {
        self.mark_restart(Instant::now());
        match self.inner.client.restart().await {
            Ok(()) => {
                self.inner.ctx.dialogs.set_dialog(Dialog::RestartTriggered);
                self.poll_ready().await;
                Ok(())
            }
            Err(e) => {
                self.inner.readiness.clear();
                Err(self.report(e.into()))
            }
        }
    }

    /// Offer a restart. Accepting the dialog triggers it.
    fn prompt_restart(&self, reason: RestartReason) {
        let answer = self
            .inner
            .ctx
            .dialogs
            .open(Dialog::RestartRequired { reason });
        let weak = Arc::downgrade(&self.inner);
        self.inner.background.spawn(async move {
            if answer.await.is_err() {
                return;
            }
            let Some(view) = Self::from_weak(&weak) else {
                return;
            };
            if let Err(e) = view.trigger_restart().await {
                debug!(error = %e, "restart from prompt failed");
            }
        });
    }

    // ── Chart set actions ────────────────────────────────────────────

    /// Enable or disable a chart set. Returns the service's `changed` flag.
    ///
    /// Enabling a set that another active set has disabled asks first.
    /// Declining resolves to `Ok(false)` without a request.
    pub async fn set_enabled(&self, name: &str, enable: bool) -> Result<bool, CoreError> {
        let set = self.actionable_set(name)?;

        if enable && !set.active {
            if let Some(other) = set
                .disabled_by
                .as_deref()
                .and_then(|other| self.state().find_set(other).cloned())
                .filter(|other| other.active)
            {
                let answer = self.inner.ctx.dialogs.open(Dialog::DisabledBy {
                    item: set.info.clone(),
                    other: other.info,
                });
                if answer.await.is_err() {
                    return Ok(false);
                }
            }
        }

        let changed = match self.inner.client.enable_chart_set(name, enable).await {
            Ok(changed) => changed,
            Err(e) => return Err(self.report(e.into())),
        };
        info!(name, enable, changed, "chart set toggled");
        if changed {
            self.refresh_status().await;
            if enable && !set.active && set.status != "READY" {
                self.prompt_restart(RestartReason::ChartSetActivated {
                    title: set.info.title.clone(),
                });
            }
        }
        Ok(changed)
    }

    /// Delete a chart set after confirmation. `Ok(false)` if declined.
    pub async fn delete_chart_set(&self, name: &str) -> Result<bool, CoreError> {
        let set = self.actionable_set(name)?;
        if !set.can_delete {
            return Err(self.report(CoreError::validation(format!(
                "chart set {name} cannot be deleted"
            ))));
        }

        let dialogs = &self.inner.ctx.dialogs;
        let question = format!("Really delete version {}?", set.info.version);
        if dialogs
            .confirm(question, Some(set.info.title.clone()))
            .await
            .is_err()
        {
            return Ok(false);
        }

        let spinner = dialogs.set_dialog(Dialog::Spinner);
        match self.inner.client.delete_chart_set(name).await {
            Ok(_) => {
                info!(name, "chart set deleted");
                self.refresh_status().await;
                dialogs.dismiss(spinner);
                Ok(true)
            }
            Err(e) => {
                dialogs.dismiss(spinner);
                Err(self.report(e.into()))
            }
        }
    }

    /// Create and download the license fingerprint.
    ///
    /// Leaves a `Fingerprint` dialog holding the decoded file.
    pub async fn fingerprint(&self, for_dongle: bool) -> Result<(String, Bytes), CoreError> {
        let dialogs = &self.inner.ctx.dialogs;
        let spinner = dialogs.set_dialog(Dialog::Spinner);
        match self.fetch_fingerprint(for_dongle).await {
            Ok((file_name, data)) => {
                dialogs.set_dialog(Dialog::Fingerprint {
                    file_name: file_name.clone(),
                    data: data.clone(),
                });
                Ok((file_name, data))
            }
            Err(e) => {
                dialogs.dismiss(spinner);
                Err(self.report(e))
            }
        }
    }

    async fn fetch_fingerprint(&self, for_dongle: bool) -> Result<(String, Bytes), CoreError> {
        let client = &self.inner.client;
        let file_name = client.create_fingerprint(for_dongle).await?;
        let encoded = client.load_fingerprint(&file_name).await?;
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CoreError::Internal(format!("fingerprint is not valid base64: {e}")))?;
        Ok((file_name, Bytes::from(data)))
    }

    // ── Upload ───────────────────────────────────────────────────────

    /// Start uploading a chart archive. Replaces (and cancels) any upload
    /// already running in this view.
    pub fn upload(&self, path: &Path) -> Result<UploadSession, CoreError> {
        let session = UploadSession::start(&self.inner.client, path, &self.inner.policy)
            .map_err(|e| self.report(e))?;

        let previous = lock(&self.inner.upload).replace(session.clone());
        if let Some(previous) = previous {
            debug!(id = previous.id(), "upload replaced");
            previous.cancel();
        }
        self.inner.state.send_modify(|s| {
            s.upload = Some(UploadStatus {
                id: session.id(),
                file_name: session.file_name(),
                progress: session.current_progress(),
            });
        });

        let weak = Arc::downgrade(&self.inner);
        let follower = session.clone();
        self.inner.background.spawn(async move {
            let mut progress = follower.progress();
            let done = follower.outcome();
            tokio::pin!(done);
            let outcome = loop {
                tokio::select! {
                    outcome = &mut done => break outcome,
                    Some(update) = progress.changed() => {
                        let Some(view) = Self::from_weak(&weak) else { return };
                        view.inner.state.send_if_modified(|s| match &mut s.upload {
                            Some(u) if u.id == follower.id() => {
                                u.progress = update;
                                true
                            }
                            _ => false,
                        });
                    }
                }
            };
            if let Some(view) = Self::from_weak(&weak) {
                view.finish_upload(&follower, outcome).await;
            }
        });

        Ok(session)
    }

    /// Cancel the running upload, if any.
    pub fn cancel_upload(&self) -> bool {
        let session = lock(&self.inner.upload).clone();
        session.is_some_and(|s| s.cancel())
    }

    pub fn upload_session(&self) -> Option<UploadSession> {
        lock(&self.inner.upload).clone()
    }

    async fn finish_upload(&self, session: &UploadSession, outcome: UploadOutcome) {
        let was_current = {
            let mut current = lock(&self.inner.upload);
            if current.as_ref().is_some_and(|s| s.id() == session.id()) {
                current.take();
                true
            } else {
                false
            }
        };
        if !was_current {
            return;
        }
        self.inner.state.send_if_modified(|s| {
            if s.upload.as_ref().is_some_and(|u| u.id == session.id()) {
                s.upload = None;
                true
            } else {
                false
            }
        });

        match outcome {
            UploadOutcome::Completed(receipt) => self.prompt_restart(RestartReason::UploadComplete {
                chart_set: receipt.chart_set,
            }),
            UploadOutcome::Failed { message, .. } => self.inner.ctx.errors.set_error(message),
            UploadOutcome::Cancelled => self.inner.ctx.errors.set_error("upload cancelled"),
        }
        self.refresh_status().await;
    }

    /// Wait for prompts and upload watchers spawned by this view.
    pub async fn settle(&self) {
        self.inner.background.settle().await;
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Look up a set in the snapshot; the service must be ready.
    fn actionable_set(&self, name: &str) -> Result<ChartSetStatus, CoreError> {
        if !self.is_ready() {
            return Err(self.report(CoreError::validation(format!(
                "service is {}, not READY",
                self.readiness()
            ))));
        }
        self.state()
            .find_set(name)
            .cloned()
            .ok_or_else(|| self.report(CoreError::UnknownChartSet { name: name.into() }))
    }

    fn report(&self, err: CoreError) -> CoreError {
        self.inner.ctx.errors.set_error(err.to_string());
        err
    }
}

impl View for ChartsView {
    async fn load(&self) {
        self.refresh_status().await;
    }

    async fn tick(&self) {
        self.poll_ready().await;
    }

    fn context(&self) -> &ViewContext {
        &self.inner.ctx
    }
}
