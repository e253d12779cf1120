//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use chartdeck_config::ConfigError;
use chartdeck_core::CoreError;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const CONNECTION: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const VALIDATION: i32 = 5;
    pub const SERVER: i32 = 6;
    pub const CONFIG: i32 = 7;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to chart service at {url}")]
    #[diagnostic(
        code(chartdeck::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             Reason: {reason}\n\
             Try: chartdeck status --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(chartdeck::timeout),
        help("Increase timeout with --timeout or check service responsiveness.")
    )]
    Timeout,

    #[error("Service did not become ready within {seconds}s")]
    #[diagnostic(
        code(chartdeck::restart_timeout),
        help("Check the service log, then run: chartdeck status")
    )]
    RestartTimeout { seconds: u64 },

    // ── Service ──────────────────────────────────────────────────────
    #[error("Service error (HTTP {status}): {message}")]
    #[diagnostic(code(chartdeck::server_error))]
    Server { status: u16, message: String },

    #[error("Service refused the request: {message}")]
    #[diagnostic(code(chartdeck::rejected))]
    Rejected { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(chartdeck::not_found),
        help("Run: chartdeck {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(chartdeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(chartdeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: chartdeck config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No service configured")]
    #[diagnostic(
        code(chartdeck::no_config),
        help(
            "Create a profile with: chartdeck config init --url http://host:8082\n\
             Or pass --url. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(chartdeck::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Cancelled")]
    #[diagnostic(code(chartdeck::cancelled))]
    Cancelled,

    #[error("Prompt failed: {0}")]
    #[diagnostic(code(chartdeck::prompt))]
    Prompt(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(chartdeck::render))]
    Render(String),

    #[error("Unexpected response: {0}")]
    #[diagnostic(code(chartdeck::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout | Self::RestartTimeout { .. } => {
                exit_code::CONNECTION
            }
            Self::Server { .. } | Self::Rejected { .. } => exit_code::SERVER,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::VALIDATION,
            Self::ProfileNotFound { .. } | Self::NoConfig { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            Self::Cancelled => exit_code::CANCELLED,
            Self::Prompt(_) | Self::Io(_) | Self::Render(_) | Self::Internal(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::Server { status, message } => Self::Server { status, message },
            CoreError::Rejected { message } => Self::Rejected { message },
            CoreError::Internal(message) => Self::Internal(message),
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::UnknownField { name } => Self::NotFound {
                resource_type: "setting".into(),
                identifier: name,
                list_command: "settings show --detail".into(),
            },
            CoreError::UnknownChartSet { name } => Self::NotFound {
                resource_type: "chart set".into(),
                identifier: name,
                list_command: "charts list".into(),
            },
            CoreError::Cancelled => Self::Cancelled,
            CoreError::Config { message } => Self::Validation {
                field: "url".into(),
                reason: message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name, available } => {
                Self::ProfileNotFound { name, available }
            }
            ConfigError::NoProfiles => Self::NoConfig {
                path: chartdeck_config::config_path().display().to_string(),
            },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let unknown: CliError = CoreError::UnknownChartSet { name: "x".into() }.into();
        assert_eq!(unknown.exit_code(), exit_code::NOT_FOUND);

        let invalid: CliError = CoreError::validation("bad").into();
        assert_eq!(invalid.exit_code(), exit_code::VALIDATION);

        let refused: CliError = CoreError::rejected("busy").into();
        assert_eq!(refused.exit_code(), exit_code::SERVER);

        assert_eq!(CliError::from(CoreError::Cancelled).exit_code(), exit_code::CANCELLED);
        assert_eq!(
            CliError::from(ConfigError::NoProfiles).exit_code(),
            exit_code::CONFIG
        );
    }
}
