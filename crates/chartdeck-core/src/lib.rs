//! State reconciliation between `chartdeck-api` and console front ends.
//!
//! Each screen of the console is a view controller that owns its own state
//! and keeps it in line with a service that changes underneath it:
//!
//! - **[`StatusView`], [`ChartsView`], [`SettingsView`]**: poll the service
//!   through a [`PollingLoop`], replace their snapshot on success, and route
//!   failures into their [`ErrorChannel`].
//!
//! - **[`RestartSuppressionWindow`]**: swallows the burst of poll errors that
//!   follows a user-triggered restart.
//!
//! - **[`PendingChangeSet`]**: staged settings edits diffed against the last
//!   snapshot, with the depth unit handling from [`fields`].
//!
//! - **[`DialogSlot`]**: one live [`Dialog`] per view. Dialogs are plain data;
//!   the front end renders them and answers confirmations.
//!
//! - **[`UploadSession`]**: one chart archive transfer with progress and a
//!   single terminal outcome.
//!
//! Everything observable is exposed as a [`StateStream`].

pub mod config;
pub mod dialog;
pub mod error;
pub mod error_channel;
pub mod fields;
pub mod pending;
pub mod polling;
pub mod readiness;
pub mod restart;
pub mod stream;
pub mod upload;
pub mod view;

use std::sync::{Mutex, MutexGuard, PoisonError};

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConsoleConfig, TlsVerification, UploadPolicy};
pub use dialog::{Confirmation, Dialog, DialogEntry, DialogSlot, Rejected, RestartReason};
pub use error::CoreError;
pub use error_channel::ErrorChannel;
pub use fields::{Catalog, DepthUnit, EnumOption, Field, FieldKind, SettingsGroup};
pub use pending::{PendingChangeSet, Snapshot};
pub use polling::PollingLoop;
pub use readiness::ReadinessState;
pub use restart::{RestartSuppressionWindow, RestartToken, WindowPhase};
pub use stream::StateStream;
pub use upload::{UploadOutcome, UploadSession};
pub use view::charts::{ChartsState, ChartsView, UploadStatus};
pub use view::settings::{SettingsState, SettingsView};
pub use view::status::{StatusState, StatusView};
pub use view::{View, ViewContext};

// Wire types the views hand out unchanged.
pub use chartdeck_api::{
    CacheFillerStatus, ChartClient, ChartSetInfo, ChartSetStatus, ErrorKind, FieldCatalog,
    LoadedPlugin, ServiceStatus, TransferProgress, UploadReceipt,
};

/// Locks never guard an await point, so a poisoned lock still holds
/// consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
