// chartdeck-api: Async Rust client for the chart provider's HTTP surface

pub mod charts;
pub mod client;
pub mod error;
pub mod models;
pub mod settings;
pub mod transport;
pub mod upload;

pub use client::ChartClient;
pub use error::{Error, ErrorKind};
pub use models::{
    CacheFillerStatus, ChartManagerStatus, ChartSetInfo, ChartSetStatus, FieldCatalog,
    FieldDescriptor, LoadedPlugin, PluginStatus, PrefillCount, ServiceStatus,
};
pub use transport::{TlsMode, TransportConfig};
pub use upload::{TransferProgress, UploadReceipt};
