//! Shared helpers for command handlers.

use chartdeck_core::{
    ChartClient, ChartsView, CoreError, Dialog, DialogEntry, ErrorKind, SettingsView, View,
};
use tokio::time::Instant;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::presenter::PresenterOptions;

/// Presenter settings implied by the global flags.
pub fn presenter_options(global: &GlobalOpts) -> PresenterOptions {
    PresenterOptions {
        yes: global.yes,
        accept_restart: false,
        quiet: global.quiet,
        out_dir: ".".into(),
    }
}

/// Initial charts fetch: readiness, then `status/`. Errors come back typed
/// instead of going through the view's error line.
pub async fn load_charts(client: &ChartClient, view: &ChartsView) -> Result<(), CliError> {
    let issued = view.begin_request();
    let ready = client.ready().await.map_err(CoreError::from)?;
    view.apply_ready(issued, Ok(ready), Instant::now());

    let issued = view.begin_request();
    let status = client.status().await.map_err(CoreError::from)?;
    view.apply_status(issued, Ok(status), Instant::now());
    Ok(())
}

/// Initial settings fetch: field catalog, values, readiness.
pub async fn load_settings(client: &ChartClient, view: &SettingsView) -> Result<(), CliError> {
    let catalog = client.field_catalog().await.map_err(CoreError::from)?;
    view.apply_catalog(Ok(catalog));

    let values = client.settings().await.map_err(CoreError::from)?;
    view.apply_values(Ok(values));

    let issued = view.begin_request();
    let ready = client.ready().await.map_err(CoreError::from)?;
    view.apply_ready(issued, Ok(ready), Instant::now());
    Ok(())
}

/// Whether a restart is still being waited on in `view`.
pub fn restart_pending<V: View>(view: &V) -> bool {
    matches!(
        view.dialogs().current(),
        Some(DialogEntry {
            dialog: Dialog::RestartTriggered,
            ..
        })
    )
}

/// Error for a failure that only survived as a kind and a message.
pub fn from_kind(kind: ErrorKind, message: String, url: &str) -> CliError {
    match kind {
        ErrorKind::Transport => CliError::ConnectionFailed {
            url: url.to_owned(),
            reason: message,
        },
        ErrorKind::Server | ErrorKind::Application => CliError::Rejected { message },
        ErrorKind::Validation => CliError::Validation {
            field: "file".into(),
            reason: message,
        },
        ErrorKind::UserCancelled => CliError::Cancelled,
    }
}
