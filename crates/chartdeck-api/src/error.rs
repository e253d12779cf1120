use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the `chartdeck-api` crate.
///
/// Every request path (polling, submission, deletion, upload) reports
/// failures through this one type so callers see a consistent taxonomy.
/// `chartdeck-core` folds these into per-view error messages.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    // ── Application ─────────────────────────────────────────────────
    /// The `{status, info}` envelope reported something other than `OK`.
    #[error("{message}")]
    Application { message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Client side ─────────────────────────────────────────────────
    /// Local file could not be read for an upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A client-side precondition failed before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// The user aborted a transfer.
    #[error("upload cancelled")]
    UserCancelled,
}

/// Coarse error classes shared by every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request never reached the service or never returned.
    Transport,
    /// Non-success HTTP status.
    Server,
    /// Response envelope signalled failure.
    Application,
    /// Client-side precondition (file type, numeric range).
    Validation,
    /// Explicit user abort. Not a real failure.
    UserCancelled,
}

impl Error {
    /// Classify this error into the five-way taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::InvalidUrl(_) | Self::Tls(_) => ErrorKind::Transport,
            Self::Server { .. } => ErrorKind::Server,
            Self::Application { .. } | Self::Deserialization { .. } => ErrorKind::Application,
            Self::Io(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::UserCancelled => ErrorKind::UserCancelled,
        }
    }

    /// Returns `true` if this is a transient error worth retrying on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Server { status: 404, .. } => true,
            _ => false,
        }
    }

    pub(crate) fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_fold_into_taxonomy() {
        assert_eq!(
            Error::Server {
                status: 500,
                message: String::new()
            }
            .kind(),
            ErrorKind::Server
        );
        assert_eq!(
            Error::Deserialization {
                message: "bad".into(),
                body: String::new()
            }
            .kind(),
            ErrorKind::Application
        );
        assert_eq!(
            Error::Validation("only files .zip are allowed".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::UserCancelled.kind(), ErrorKind::UserCancelled);
    }

    #[test]
    fn application_error_displays_bare_message() {
        let err = Error::application("still initializing");
        assert_eq!(err.to_string(), "still initializing");
    }

    #[test]
    fn server_5xx_is_transient() {
        let err = Error::Server {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert!(err.is_transient());
        assert!(!Error::application("x").is_transient());
    }
}
