// ── Settings screen ──
//
// Field descriptors are fetched once, values on demand. Edits are staged in
// a PendingChangeSet against the last value snapshot and submitted as one
// diff. The view keeps its own restart window for the restart it offers
// after a successful submit.

use std::sync::{Arc, Weak};

use chartdeck_api::{ChartClient, FieldCatalog};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::ConsoleConfig;
use crate::dialog::{Dialog, RestartReason};
use crate::error::CoreError;
use crate::fields::{self, Catalog, DepthUnit, Field, SettingsGroup};
use crate::pending::{PendingChangeSet, Snapshot};
use crate::readiness::ReadinessState;
use crate::restart::{RestartSuppressionWindow, RestartToken};
use crate::stream::StateStream;
use crate::view::{Background, ReadinessTracker, View, ViewContext};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsState {
    pub readiness: ReadinessState,
    pub catalog: Option<Catalog>,
    pub values: Option<Snapshot>,
    pub pending: PendingChangeSet,
}

impl SettingsState {
    fn readiness_mut(&mut self) -> &mut ReadinessState {
        &mut self.readiness
    }

    /// Unit depth fields are shown in right now.
    pub fn depth_unit(&self) -> DepthUnit {
        self.values
            .as_ref()
            .map_or(DepthUnit::default(), |values| {
                fields::depth_unit(values, &self.pending)
            })
    }

    /// Pending value if staged, else the snapshot value.
    pub fn effective(&self, name: &str) -> Option<f64> {
        let values = self.values.as_ref()?;
        self.pending.effective(name, values)
    }

    pub fn can_submit(&self) -> bool {
        self.pending.has_changes() && self.readiness.is_ready()
    }
}

#[derive(Debug, Clone)]
pub struct SettingsView {
    inner: Arc<SettingsInner>,
}

#[derive(Debug)]
struct SettingsInner {
    client: ChartClient,
    ctx: ViewContext,
    state: watch::Sender<SettingsState>,
    readiness: ReadinessTracker,
    background: Background,
}

impl SettingsView {
    pub fn new(client: ChartClient, config: &ConsoleConfig) -> Self {
        let (state, _) = watch::channel(SettingsState {
            pending: PendingChangeSet::new(config.change_epsilon),
            ..SettingsState::default()
        });
        Self {
            inner: Arc::new(SettingsInner {
                client,
                ctx: ViewContext::new(),
                state,
                readiness: ReadinessTracker::new(RestartSuppressionWindow::new(
                    config.restart_window,
                    config.min_restart_window,
                )),
                background: Background::default(),
            }),
        }
    }

    fn from_weak(weak: &Weak<SettingsInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> SettingsState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<SettingsState> {
        StateStream::new(self.inner.state.subscribe())
    }

    pub fn readiness(&self) -> ReadinessState {
        self.inner.state.borrow().readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness().is_ready()
    }

    pub fn begin_request(&self) -> RestartToken {
        self.inner.readiness.token()
    }

    // ── Fetching ─────────────────────────────────────────────────────

    /// Fetch the field descriptors.
    pub async fn load_catalog(&self) {
        let result = self.inner.client.field_catalog().await.map_err(CoreError::from);
        self.apply_catalog(result);
    }

    pub fn apply_catalog(&self, result: Result<FieldCatalog, CoreError>) {
        match result {
            Ok(catalog) => {
                let catalog = Catalog::from(catalog);
                debug!(
                    important = catalog.important.len(),
                    detail = catalog.detail.len(),
                    "field catalog loaded"
                );
                self.inner.state.send_modify(|s| s.catalog = Some(catalog));
            }
            Err(e) => self
                .inner
                .ctx
                .errors
                .set_error(format!("Error fetching descriptions: {e}")),
        }
    }

    /// Fetch the current values, replacing the snapshot.
    pub async fn refresh_values(&self) {
        let result = self.inner.client.settings().await.map_err(CoreError::from);
        self.apply_values(result);
    }

    pub fn apply_values(&self, result: Result<Snapshot, CoreError>) {
        match result {
            Ok(values) => self.inner.state.send_modify(|s| {
                s.pending.rebase(&values);
                s.values = Some(values);
            }),
            Err(e) => self
                .inner
                .ctx
                .errors
                .set_error(format!("Error fetching current settings: {e}")),
        }
    }

    /// One readiness poll; values are re-fetched when readiness changes.
    pub async fn poll_ready(&self) {
        let issued = self.begin_request();
        let result = self.inner.client.ready().await.map_err(CoreError::from);
        if self.apply_ready(issued, result, Instant::now()) {
            self.refresh_values().await;
        }
    }

    pub fn apply_ready(
        &self,
        issued: RestartToken,
        result: Result<bool, CoreError>,
        now: Instant,
    ) -> bool {
        self.inner.readiness.apply(
            &self.inner.ctx,
            &self.inner.state,
            SettingsState::readiness_mut,
            issued,
            result,
            now,
        )
    }

    // ── Editing ──────────────────────────────────────────────────────

    /// Descriptors listed on one settings page.
    pub fn fields(&self, group: SettingsGroup) -> Vec<Field> {
        self.inner
            .state
            .borrow()
            .catalog
            .as_ref()
            .map(|c| c.group(group).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn field(&self, name: &str) -> Result<Field, CoreError> {
        self.inner
            .state
            .borrow()
            .catalog
            .as_ref()
            .ok_or_else(|| CoreError::validation("field descriptions not loaded"))?
            .find(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownField { name: name.into() })
    }

    pub fn depth_unit(&self) -> DepthUnit {
        self.inner.state.borrow().depth_unit()
    }

    /// Stage a value given in canonical units. Returns `true` if the field
    /// is pending afterwards.
    pub fn set_value(&self, name: &str, canonical: f64) -> Result<bool, CoreError> {
        let mut staged = Err(CoreError::validation("current settings not loaded"));
        self.inner.state.send_if_modified(|s| {
            let Some(values) = s.values.as_ref() else {
                return false;
            };
            let before = s.pending.get(name);
            let pending = s.pending.set(name, canonical, values);
            staged = Ok(pending);
            before != s.pending.get(name)
        });
        staged
    }

    /// Parse `input` in display units and stage it.
    pub fn edit(&self, name: &str, input: &str) -> Result<bool, CoreError> {
        let field = self.field(name)?;
        let canonical = field.parse_input(input, self.depth_unit())?;
        self.set_value(name, canonical)
    }

    /// Stage the declared default of one field.
    pub fn stage_default(&self, name: &str) -> Result<bool, CoreError> {
        let field = self.field(name)?;
        let default = field.default.ok_or_else(|| {
            CoreError::validation(format!("{} has no default value", field.title))
        })?;
        self.set_value(name, default)
    }

    /// Drop every staged edit.
    pub fn reset(&self) {
        self.inner.state.send_if_modified(|s| {
            let had = s.pending.has_changes();
            s.pending.reset();
            had
        });
    }

    /// Stage every default that differs from the snapshot. Returns how many.
    pub fn reset_to_defaults(&self) -> Result<usize, CoreError> {
        let mut staged = Err(CoreError::validation("settings not loaded"));
        self.inner.state.send_if_modified(|s| {
            let (Some(catalog), Some(values)) = (s.catalog.as_ref(), s.values.as_ref()) else {
                return false;
            };
            let count = s.pending.reset_to_defaults(catalog.defaults(), values);
            staged = Ok(count);
            true
        });
        staged
    }

    /// Human readable effective value of a field.
    pub fn display_value(&self, name: &str) -> Option<String> {
        let state = self.inner.state.borrow();
        let field = state.catalog.as_ref()?.find(name)?;
        let value = state.effective(name)?;
        Some(field.format_value(value, state.depth_unit()))
    }

    // ── Submit ───────────────────────────────────────────────────────

    /// Send the staged diff. Returns the service's `hasChanged` flag.
    pub async fn submit(&self) -> Result<bool, CoreError> {
        let (diff, ready) = {
            let state = self.inner.state.borrow();
            (state.pending.diff().clone(), state.readiness.is_ready())
        };
        if diff.is_empty() {
            return Err(CoreError::validation("no pending changes"));
        }
        if !ready {
            return Err(CoreError::validation(format!(
                "service is {}, not READY",
                self.readiness()
            )));
        }

        let dialogs = &self.inner.ctx.dialogs;
        let spinner = dialogs.set_dialog(Dialog::Spinner);
        let result = self.inner.client.update_settings(&diff).await;
        dialogs.dismiss(spinner);

        let has_changed = match result {
            Ok(has_changed) => has_changed,
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.ctx.errors.set_error(err.to_string());
                return Err(err);
            }
        };
        info!(fields = diff.len(), has_changed, "settings submitted");
        self.reset();
        if has_changed {
            self.prompt_restart();
        } else {
            self.inner.ctx.errors.set_error("no changes applied");
        }
        self.refresh_values().await;
        Ok(has_changed)
    }

    // ── Restart ──────────────────────────────────────────────────────

    pub fn mark_restart(&self, now: Instant) {
        self.inner
            .readiness
            .begin_restart(&self.inner.state, SettingsState::readiness_mut, now);
    }

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
                let err = CoreError::from(e);
                self.inner.ctx.errors.set_error(err.to_string());
                Err(err)
            }
        }
    }

    fn prompt_restart(&self) {
        let answer = self.inner.ctx.dialogs.open(Dialog::RestartRequired {
            reason: RestartReason::SettingsChanged,
        });
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

    /// Wait for restart prompts spawned by this view.
    pub async fn settle(&self) {
        self.inner.background.settle().await;
    }
}

impl View for SettingsView {
    async fn load(&self) {
        self.load_catalog().await;
        self.refresh_values().await;
    }

    async fn tick(&self) {
        self.poll_ready().await;
    }

    fn context(&self) -> &ViewContext {
        &self.inner.ctx
    }
}
