// ── Core error types ──
//
// User-facing errors from chartdeck-core. Views render these straight into
// their error channel, so every variant's Display is a complete sentence
// fragment. The `From<chartdeck_api::Error>` impl translates transport-layer
// errors into these variants without losing the five-way taxonomy.

use chartdeck_api::ErrorKind;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to chart service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Service errors ───────────────────────────────────────────────
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("{message}")]
    Rejected { message: String },

    #[error("Unexpected response: {0}")]
    Internal(String),

    // ── Client-side errors ───────────────────────────────────────────
    #[error("{message}")]
    ValidationFailed { message: String },

    #[error("Unknown setting: {name}")]
    UnknownField { name: String },

    #[error("Unknown chart set: {name}")]
    UnknownChartSet { name: String },

    #[error("Cancelled")]
    Cancelled,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Classify into the shared five-way taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout | Self::Config { .. } => {
                ErrorKind::Transport
            }
            Self::Server { .. } => ErrorKind::Server,
            Self::Rejected { .. } | Self::Internal(_) => ErrorKind::Application,
            Self::ValidationFailed { .. }
            | Self::UnknownField { .. }
            | Self::UnknownChartSet { .. } => ErrorKind::Validation,
            Self::Cancelled => ErrorKind::UserCancelled,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<chartdeck_api::Error> for CoreError {
    fn from(err: chartdeck_api::Error) -> Self {
        match err {
            chartdeck_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            chartdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            chartdeck_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            chartdeck_api::Error::Server { status, message } => {
                CoreError::Server { status, message }
            }
            chartdeck_api::Error::Application { message } => CoreError::Rejected { message },
            chartdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(message)
            }
            chartdeck_api::Error::Io(e) => CoreError::ValidationFailed {
                message: e.to_string(),
            },
            chartdeck_api::Error::Validation(message) => CoreError::ValidationFailed { message },
            chartdeck_api::Error::UserCancelled => CoreError::Cancelled,
        }
    }
}
