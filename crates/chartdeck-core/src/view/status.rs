// ── Status screen ──
//
// Read-only view of `status/`. No restart policy: every failure is shown.

use std::sync::Arc;

use chartdeck_api::{ChartClient, ServiceStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::error::CoreError;
use crate::stream::StateStream;
use crate::view::{View, ViewContext};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusState {
    pub status: Option<ServiceStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct StatusView {
    inner: Arc<StatusInner>,
}

#[derive(Debug)]
struct StatusInner {
    client: ChartClient,
    ctx: ViewContext,
    state: watch::Sender<StatusState>,
}

impl StatusView {
    pub fn new(client: ChartClient) -> Self {
        let (state, _) = watch::channel(StatusState::default());
        Self {
            inner: Arc::new(StatusInner {
                client,
                ctx: ViewContext::new(),
                state,
            }),
        }
    }

    pub fn state(&self) -> StatusState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<StatusState> {
        StateStream::new(self.inner.state.subscribe())
    }

    /// Fetch `status/` once.
    pub async fn refresh(&self) {
        let result = self.inner.client.status().await.map_err(CoreError::from);
        self.apply(result);
    }

    /// Fold one fetch result into the view.
    pub fn apply(&self, result: Result<ServiceStatus, CoreError>) {
        match result {
            Ok(status) => {
                debug!(sets = status.chart_manager.chart_sets.len(), "status refreshed");
                self.inner.ctx.errors.reset_error();
                self.inner.state.send_replace(StatusState {
                    status: Some(status),
                    updated_at: Some(Utc::now()),
                });
            }
            Err(e) => self.inner.ctx.errors.set_error(e.to_string()),
        }
    }
}

impl View for StatusView {
    async fn load(&self) {}

    async fn tick(&self) {
        self.refresh().await;
    }

    fn context(&self) -> &ViewContext {
        &self.inner.ctx
    }
}
