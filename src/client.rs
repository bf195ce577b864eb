//! Authenticated HTTP transport.
//!
//! [`LogdnaHttpClient`] posts pre-serialized batches to the ingestion
//! endpoint with a Basic credential derived from the API key. It does not
//! retry and does not interpret the response; that is the delivery
//! engine's job.

use std::io::Write;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderStringWriter;
use bytes::Bytes;
use reqwest::Response;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, trace, warn};

use crate::{Error, Result};

/// Something that can deliver one batch payload over HTTP POST.
///
/// Implementations must be safe to call from several in-flight flushes at
/// once.
///
/// Delivery engines receive the client as `Arc<dyn HttpClient>`. Dropping
/// the last clone is the disposal; [`LogdnaHttpClient::dispose`] is only
/// reachable while the client is still uniquely owned.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `content` to `uri` and return the response as received.
    ///
    /// Non-2xx statuses are returned as `Ok`; only transport failures are
    /// errors.
    async fn post(&self, uri: &str, content: Bytes) -> Result<Response>;
}

/// Build the `Authorization` header value for an API key.
///
/// The key is the user name and the password is empty, so the encoded
/// credential is `base64("<api_key>:")`. The plaintext pair is streamed
/// into the encoder and never assembled in memory; the encoded buffer is
/// moved into the header without a copy.
pub fn basic_authorization(api_key: &str) -> Result<HeaderValue> {
    let mut encoder = EncoderStringWriter::from_consumer(String::from("Basic "), &STANDARD);
    encoder.write_all(api_key.as_bytes())?;
    encoder.write_all(b":")?;
    let encoded = encoder.into_inner();

    let mut value = HeaderValue::from_maybe_shared(Bytes::from(encoded))?;
    value.set_sensitive(true);
    Ok(value)
}

/// HTTP client that authenticates every request against LogDNA.
pub struct LogdnaHttpClient {
    client: Option<reqwest::Client>,
    authorization: HeaderValue,
}

impl LogdnaHttpClient {
    /// Create a client for `api_key`.
    ///
    /// The credential is computed here once and reused for every request.
    pub fn new(api_key: &str) -> Result<Self> {
        let authorization = basic_authorization(api_key)?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization.clone());

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client: Some(client),
            authorization,
        })
    }

    /// The `Authorization` header sent with every request.
    pub fn authorization(&self) -> &HeaderValue {
        &self.authorization
    }

    /// Check whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.client.is_none()
    }

    /// Release the pooled connections.
    ///
    /// Calling this more than once is a no-op. Later posts fail with
    /// [`Error::Disposed`].
    pub fn dispose(&mut self) {
        if self.client.take().is_some() {
            debug!("LogDNA HTTP client disposed");
        }
    }
}

#[async_trait]
impl HttpClient for LogdnaHttpClient {
    async fn post(&self, uri: &str, content: Bytes) -> Result<Response> {
        let Some(client) = self.client.as_ref() else {
            warn!(uri, "post attempted on a disposed LogDNA HTTP client");
            return Err(Error::Disposed);
        };

        trace!(uri, bytes = content.len(), "posting batch");
        let response = client
            .post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(content)
            .send()
            .await?;
        trace!(uri, status = %response.status(), "batch posted");

        Ok(response)
    }
}

impl Drop for LogdnaHttpClient {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for LogdnaHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogdnaHttpClient")
            .field("authorization", &self.authorization)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
