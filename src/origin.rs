//! Origin fetch client
//!
//! Wraps a [`reqwest::Client`] with bounded connect and request timeouts so
//! a stalled origin cannot block the lookup chain indefinitely. Origin
//! failures are surfaced with the origin's status and body text and are not
//! retried; the caching layer above absorbs transient misses on the next
//! window.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap},
};
use tracing::{debug, trace};
use url::Url;

use crate::{Error, Result};

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default request timeout
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// A successful origin response body with its reported media type
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    /// The raw response body
    pub bytes: Bytes,
    /// The `content-type` the origin reported, if any
    pub media_type: Option<String>,
}

/// HTTP client for fetching assets from their origin URLs
#[derive(Debug, Clone)]
pub struct OriginClient {
    client: Client,
}

impl OriginClient {
    /// Create a client with the default timeouts
    pub fn new() -> Result<Self> {
        Self::with_timeouts(
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Create a client with custom connect and request timeouts
    pub fn with_timeouts(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch an asset from its origin URL.
    ///
    /// `forwarded_headers` carries the inbound request's negotiation headers
    /// (e.g. `Accept` for format auto-negotiation); scheduled refreshes pass
    /// `None` for an unconditioned fetch. Non-2xx responses fail with
    /// [`Error::OriginStatus`] carrying the origin's status and body text.
    pub async fn fetch(
        &self,
        url: &Url,
        forwarded_headers: Option<&HeaderMap>,
    ) -> Result<FetchedAsset> {
        debug!("Fetching origin: {}", url);

        let mut request = self.client.get(url.clone());
        if let Some(headers) = forwarded_headers {
            request = request.headers(headers.clone());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::OriginStatus {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        trace!("Origin returned {} bytes from {}", bytes.len(), url);

        Ok(FetchedAsset { bytes, media_type })
    }
}
