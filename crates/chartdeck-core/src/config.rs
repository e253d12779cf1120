// ── Runtime console configuration ──
//
// These types describe *how* to talk to one chart service and the timing
// policy of the views. They never touch disk: the CLI resolves a profile
// into a `ConsoleConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use chartdeck_api::{ChartClient, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// Default poll interval for every view.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// How long errors are swallowed after a user-triggered restart.
pub const DEFAULT_RESTART_WINDOW: Duration = Duration::from_secs(60);
/// Minimum age of the restart before a successful poll may end suppression.
pub const DEFAULT_MIN_RESTART_WINDOW: Duration = Duration::from_secs(5);
/// Tolerance when comparing a proposed value against the baseline.
pub const DEFAULT_CHANGE_EPSILON: f64 = 1e-5;
/// The service rejects uploads above 1 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed appliances).
    DangerAcceptInvalid,
}

/// Which files an upload will accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Lower-case extensions without the dot.
    pub accepted_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            accepted_extensions: vec!["zip".into()],
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Configuration for talking to a single chart service.
///
/// Built by the CLI, passed to the views -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Service root (e.g., `http://localhost:8082/`).
    pub url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout for ordinary calls. Uploads run without one.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub restart_window: Duration,
    pub min_restart_window: Duration,
    pub change_epsilon: f64,
    pub upload: UploadPolicy,
}

impl ConsoleConfig {
    /// Defaults for everything but the URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_POLL_INTERVAL,
            restart_window: DEFAULT_RESTART_WINDOW,
            min_restart_window: DEFAULT_MIN_RESTART_WINDOW,
            change_epsilon: DEFAULT_CHANGE_EPSILON,
            upload: UploadPolicy::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }

    /// Build the HTTP client shared by every view of this console.
    pub fn build_client(&self) -> Result<ChartClient, CoreError> {
        Ok(ChartClient::new(self.url.clone(), &self.transport())?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_timing() {
        let config = ConsoleConfig::new(Url::parse("http://localhost:8082").unwrap());
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.restart_window, Duration::from_secs(60));
        assert_eq!(config.min_restart_window, Duration::from_secs(5));
        assert_eq!(config.upload.accepted_extensions, vec!["zip".to_owned()]);
    }

    #[test]
    fn insecure_maps_to_accept_invalid() {
        let mut config = ConsoleConfig::new(Url::parse("https://chart-box").unwrap());
        config.tls = TlsVerification::DangerAcceptInvalid;
        assert!(matches!(config.transport().tls, TlsMode::DangerAcceptInvalid));
    }
}
