// Streamed archive upload
//
// The service reads the raw request body (not multipart), so the file is
// streamed as `application/octet-stream` with an explicit length. Progress is
// reported as chunks are handed to the transport.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{ChartClient, parse_envelope};
use crate::error::Error;
use crate::models::ChartSetBody;

const CHUNK_SIZE: usize = 64 * 1024;

/// Byte counters of an in-flight transfer. `total` is `None` until known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Completion ratio in `0.0..=1.0`, if the total is known.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some((self.loaded as f64 / total as f64).min(1.0)),
        }
    }
}

/// Success payload of an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    /// Chart set created from the archive, when the service reports it.
    pub chart_set: Option<String>,
}

impl ChartClient {
    /// Upload a chart archive.
    ///
    /// `POST upload/uploadzip` with the raw file as body. `on_progress` is
    /// called after every chunk with monotonically increasing counters.
    /// Cancelling `cancel` aborts the request and yields
    /// [`Error::UserCancelled`]. No request timeout is applied.
    pub async fn upload_archive<F>(
        &self,
        path: &Path,
        on_progress: F,
        cancel: CancellationToken,
    ) -> Result<UploadReceipt, Error>
    where
        F: Fn(TransferProgress) + Send + Sync + 'static,
    {
        let url = self.url("upload/uploadzip")?;
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        debug!(path = %path.display(), total, "POST {}", url);

        let mut chunks = ReaderStream::with_capacity(file, CHUNK_SIZE);
        let body_stream = async_stream::stream! {
            let mut loaded: u64 = 0;
            on_progress(TransferProgress { loaded, total: Some(total) });
            while let Some(chunk) = chunks.next().await {
                if let Ok(bytes) = &chunk {
                    loaded = loaded.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
                    on_progress(TransferProgress { loaded, total: Some(total) });
                }
                yield chunk;
            }
        };

        let request = self
            .http()
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body_stream))
            .send();

        let exchange = async {
            let resp = request.await.map_err(Error::Transport)?;
            parse_envelope::<ChartSetBody>(resp).await
        };

        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(path = %path.display(), "upload cancelled");
                return Err(Error::UserCancelled);
            }
            result = exchange => result?,
        };

        info!(path = %path.display(), chart_set = ?body.chart_set, "upload complete");
        Ok(UploadReceipt {
            chart_set: body.chart_set,
        })
    }
}
