// Chart provider HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, per-request timeouts, and
// `{status, info}` envelope checking. Endpoint groups (settings, charts,
// upload) are implemented as inherent methods in separate files to keep this
// module focused on transport mechanics.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::Envelope;
use crate::transport::TransportConfig;

const BODY_PREVIEW: usize = 200;

/// Raw HTTP client for the chart provider.
///
/// Every settings, status, and upload response is framed as
/// `{ "status": "OK" | ..., "info": "...", ... }`. Methods return the payload
/// with the frame already checked; a non-`OK` status becomes
/// [`Error::Application`] carrying `info`.
#[derive(Debug, Clone)]
pub struct ChartClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl ChartClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the provider root (e.g. `http://localhost:8082/`).
    /// A missing trailing slash is added so relative joins land under it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, transport.timeout))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, mut base_url: Url, timeout: Duration) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http,
            base_url,
            timeout,
        }
    }

    /// The provider base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve a path relative to the base URL: `{base}{path}`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Resolve a path and append query pairs.
    pub(crate) fn url_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and check the status envelope.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_envelope(resp).await
    }

    /// Send a GET request and parse the body without envelope checking.
    ///
    /// Used for loosely structured documents such as `settings.json`.
    pub(crate) async fn get_unchecked<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {} (unchecked)", url);

        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(Error::Transport)?;

        let body = read_success_body(resp).await?;
        decode(&body)
    }

    /// Send a urlencoded form POST and check the status envelope.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &(impl Serialize + ?Sized + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .timeout(self.timeout)
            .form(form)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_envelope(resp).await
    }
}

/// Fail on non-2xx, otherwise return the body text.
pub(crate) async fn read_success_body(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = match status.canonical_reason() {
            Some(reason) if body.trim().is_empty() => reason.to_owned(),
            _ => preview(&body).to_owned(),
        };
        return Err(Error::Server {
            status: status.as_u16(),
            message,
        });
    }

    resp.text().await.map_err(Error::Transport)
}

/// Parse the `{status, info, ...}` envelope, returning the payload on `OK`
/// or an `Error::Application` carrying `info` (or the status) otherwise.
pub(crate) async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = read_success_body(resp).await?;
    check_envelope(&body)
}

pub(crate) fn check_envelope<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    let envelope: Envelope<T> = decode(body)?;
    trace!(status = ?envelope.status, "envelope decoded");

    match envelope.status.as_deref() {
        Some("OK") => Ok(envelope.body),
        other => Err(Error::Application {
            message: envelope
                .info
                .filter(|info| !info.is_empty())
                .unwrap_or_else(|| other.unwrap_or("missing status").to_owned()),
        }),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(body)),
        body: body.to_owned(),
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(BODY_PREVIEW);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::ReadyBody;

    #[test]
    fn envelope_ok_yields_payload() {
        let ready: ReadyBody = check_envelope(r#"{"status":"OK","ready":true}"#).unwrap();
        assert!(ready.ready);
    }

    #[test]
    fn envelope_error_prefers_info() {
        let err = check_envelope::<serde_json::Value>(
            r#"{"status":"ERROR","info":"still initializing"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Application { ref message } if message == "still initializing"));
    }

    #[test]
    fn envelope_error_falls_back_to_status() {
        let err = check_envelope::<serde_json::Value>(r#"{"status":"BUSY"}"#).unwrap_err();
        assert!(matches!(err, Error::Application { ref message } if message == "BUSY"));
    }

    #[test]
    fn malformed_body_is_deserialization_error() {
        let err = check_envelope::<serde_json::Value>("<html>").unwrap_err();
        assert!(matches!(err, Error::Deserialization { ref body, .. } if body == "<html>"));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = ChartClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://host:8082/provider").unwrap(),
            Duration::from_secs(5),
        );
        assert_eq!(client.base_url().as_str(), "http://host:8082/provider/");
        assert_eq!(
            client.url("settings/ready").unwrap().as_str(),
            "http://host:8082/provider/settings/ready"
        );
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "ä".repeat(150);
        assert!(preview(&body).len() <= BODY_PREVIEW);
    }
}
