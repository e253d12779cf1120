// ── View controllers ──
//
// A view owns one snapshot, one error channel, one dialog slot, and
// whatever else its screen needs. Nothing is shared between views except
// the HTTP client. Mounting a view starts its poll loop; dropping the
// returned guard unmounts it.

pub mod charts;
pub mod settings;
pub mod status;

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::info;

use crate::dialog::{Dialog, DialogSlot};
use crate::error::CoreError;
use crate::error_channel::ErrorChannel;
use crate::lock;
use crate::polling::PollingLoop;
use crate::readiness::ReadinessState;
use crate::restart::{RestartSuppressionWindow, RestartToken};

/// Per-view presentation state: the error line and the dialog slot.
#[derive(Debug, Clone, Default)]
pub struct ViewContext {
    pub errors: ErrorChannel,
    pub dialogs: DialogSlot,
}

impl ViewContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A screen that can be mounted.
pub trait View: Clone + Send + Sync + 'static {
    /// Fetches done once, on the first tick after mounting.
    fn load(&self) -> impl Future<Output = ()> + Send;

    /// One poll.
    fn tick(&self) -> impl Future<Output = ()> + Send;

    fn context(&self) -> &ViewContext;

    fn errors(&self) -> &ErrorChannel {
        &self.context().errors
    }

    fn dialogs(&self) -> &DialogSlot {
        &self.context().dialogs
    }

    /// Start polling. Dropping the returned guard stops it.
    fn mount(&self, interval: Duration) -> PollingLoop {
        let view = self.clone();
        let first = Arc::new(AtomicBool::new(true));
        PollingLoop::start(interval, move || {
            let view = view.clone();
            let first = Arc::clone(&first);
            async move {
                if first.swap(false, Ordering::SeqCst) {
                    view.load().await;
                }
                view.tick().await;
            }
        })
    }
}

/// Follow-up work a view spawns after an action (restart prompts, upload
/// watchers). Aborted when the view is dropped.
#[derive(Debug, Default)]
pub(crate) struct Background {
    tasks: Mutex<JoinSet<()>>,
}

impl Background {
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = lock(&self.tasks);
        // Reap anything already done so the set does not grow unbounded.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Wait until every background task, including ones spawned while
    /// waiting, has finished.
    pub(crate) async fn settle(&self) {
        loop {
            let mut batch = std::mem::take(&mut *lock(&self.tasks));
            if batch.is_empty() {
                return;
            }
            while batch.join_next().await.is_some() {}
        }
    }
}

/// `settings/ready` handling plus the restart window that filters it.
#[derive(Debug)]
pub(crate) struct ReadinessTracker {
    window: Mutex<RestartSuppressionWindow>,
}

impl ReadinessTracker {
    pub(crate) fn new(window: RestartSuppressionWindow) -> Self {
        Self {
            window: Mutex::new(window),
        }
    }

    pub(crate) fn token(&self) -> RestartToken {
        lock(&self.window).token()
    }

    pub(crate) fn trigger(&self, now: Instant) {
        lock(&self.window).trigger(now);
    }

    pub(crate) fn clear(&self) {
        lock(&self.window).clear();
    }

    pub(crate) fn window(&self) -> RestartSuppressionWindow {
        lock(&self.window).clone()
    }

    pub(crate) fn should_suppress(&self, issued: RestartToken, now: Instant) -> bool {
        lock(&self.window).should_suppress(issued, now)
    }

    /// Fold one ready poll into `state`. Returns `true` when readiness
    /// changed, which is the caller's cue to re-fetch its snapshot.
    pub(crate) fn apply<S>(
        &self,
        ctx: &ViewContext,
        state: &watch::Sender<S>,
        readiness: impl Fn(&mut S) -> &mut ReadinessState,
        issued: RestartToken,
        result: Result<bool, CoreError>,
        now: Instant,
    ) -> bool {
        match result {
            Ok(ready) => {
                if lock(&self.window).observe_success(issued, now) {
                    ctx.dialogs
                        .hide_if(|d| matches!(d, Dialog::RestartTriggered));
                }
                let next = ReadinessState::from_ready(ready);
                let changed = state.send_if_modified(|s| {
                    let current = readiness(s);
                    if *current == next {
                        return false;
                    }
                    info!(from = %current, to = %next, "readiness changed");
                    *current = next;
                    true
                });
                if changed {
                    ctx.errors.reset_error();
                }
                changed
            }
            Err(e) => {
                if self.should_suppress(issued, now) {
                    return false;
                }
                state.send_if_modified(|s| {
                    let current = readiness(s);
                    if *current == ReadinessState::Error {
                        return false;
                    }
                    *current = ReadinessState::Error;
                    true
                });
                ctx.errors
                    .set_error(format!("unable to fetch ready state: {e}"));
                false
            }
        }
    }

    /// Force `Restarting` and open the window.
    pub(crate) fn begin_restart<S>(
        &self,
        state: &watch::Sender<S>,
        readiness: impl Fn(&mut S) -> &mut ReadinessState,
        now: Instant,
    ) {
        self.trigger(now);
        state.send_if_modified(|s| {
            let current = readiness(s);
            if *current == ReadinessState::Restarting {
                return false;
            }
            *current = ReadinessState::Restarting;
            true
        });
    }
}
