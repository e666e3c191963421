//! Records API seam and its HTTP implementation.
//!
//! Controllers only see [`ResourceApi`]; [`HttpApi`] speaks to the real
//! service with `reqwest`, and tests substitute in-memory fakes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clinic_models::{ProblemDetails, RecordId, ResourceKind};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ApiTimeouts;
use crate::error::{ConsoleError, FetchError};

/// Header carrying the per-process request identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

const MESSAGE_LIMIT: usize = 200;

/// One call shape per records API operation.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// `GET /api/{kind}` with an optional server-side `q` filter.
    async fn list(&self, kind: ResourceKind, query: Option<&str>) -> Result<Value, FetchError>;

    /// `GET /api/{kind}/{id}`.
    async fn get(&self, kind: ResourceKind, id: &RecordId) -> Result<Value, FetchError>;

    /// `POST /api/{kind}`; returns the created record.
    async fn create(&self, kind: ResourceKind, body: &Value) -> Result<Value, FetchError>;

    /// `PUT /api/{kind}/{id}`; returns the updated record.
    async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        body: &Value,
    ) -> Result<Value, FetchError>;

    /// `DELETE /api/{kind}/{id}`.
    async fn delete(&self, kind: ResourceKind, id: &RecordId) -> Result<(), FetchError>;

    /// `DELETE /api/{kind}` with a JSON array of identifiers.
    async fn delete_many(&self, kind: ResourceKind, ids: &[RecordId]) -> Result<(), FetchError>;
}

#[async_trait]
impl<T: ResourceApi + ?Sized> ResourceApi for Arc<T> {
    async fn list(&self, kind: ResourceKind, query: Option<&str>) -> Result<Value, FetchError> {
        (**self).list(kind, query).await
    }

    async fn get(&self, kind: ResourceKind, id: &RecordId) -> Result<Value, FetchError> {
        (**self).get(kind, id).await
    }

    async fn create(&self, kind: ResourceKind, body: &Value) -> Result<Value, FetchError> {
        (**self).create(kind, body).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        body: &Value,
    ) -> Result<Value, FetchError> {
        (**self).update(kind, id, body).await
    }

    async fn delete(&self, kind: ResourceKind, id: &RecordId) -> Result<(), FetchError> {
        (**self).delete(kind, id).await
    }

    async fn delete_many(&self, kind: ResourceKind, ids: &[RecordId]) -> Result<(), FetchError> {
        (**self).delete_many(kind, ids).await
    }
}

/// Unclassified response captured by [`HttpApi::probe`].
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Requested URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

/// `reqwest`-backed [`ResourceApi`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    timeouts: ApiTimeouts,
}

impl HttpApi {
    /// Build a client that tags every request with `request_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] if the identifier is not a valid header value
    /// or the TLS backend cannot be initialised.
    pub fn new(base_url: Url, timeouts: ApiTimeouts, request_id: &str) -> Result<Self, ConsoleError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(request_id).map_err(|_| ConsoleError::InvalidHeader {
            header: HEADER_REQUEST_ID,
        })?;
        headers.insert(HEADER_REQUEST_ID, value);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| ConsoleError::HttpClient { source })?;
        Ok(Self::with_client(client, base_url, timeouts))
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: Client, base_url: Url, timeouts: ApiTimeouts) -> Self {
        Self {
            client,
            base_url,
            timeouts,
        }
    }

    /// API root.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /api/{kind}` without status classification, for payload diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] only for transport failures; any HTTP status is reported.
    pub async fn probe(&self, kind: ResourceKind) -> Result<RawResponse, FetchError> {
        let url = self.endpoint(kind, None)?;
        let timeout = self.timeouts.list;
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| transport_error(&err, &url, timeout))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport_error(&err, &url, timeout))?;
        Ok(RawResponse {
            url: url.to_string(),
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    fn endpoint(&self, kind: ResourceKind, id: Option<&RecordId>) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url.path_segments_mut().map_err(|()| FetchError::Request {
                message: format!("API URL {} cannot carry a path", self.base_url),
            })?;
            // Resource paths sit beneath any prefix the base URL carries.
            segments.pop_if_empty().push("api").push(kind.path_segment());
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        url: &Url,
        timeout: Duration,
    ) -> Result<Response, FetchError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| transport_error(&err, url, timeout))?;
        debug!(url = %url, status = response.status().as_u16(), "response received");
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(response, url).await)
        }
    }
}

#[async_trait]
impl ResourceApi for HttpApi {
    async fn list(&self, kind: ResourceKind, query: Option<&str>) -> Result<Value, FetchError> {
        let mut url = self.endpoint(kind, None)?;
        if let Some(query) = query.map(str::trim).filter(|query| !query.is_empty()) {
            url.query_pairs_mut().append_pair("q", query);
        }
        let timeout = self.timeouts.list;
        let response = self
            .execute(self.client.get(url.clone()), &url, timeout)
            .await?;
        read_json(response, &url, timeout).await
    }

    async fn get(&self, kind: ResourceKind, id: &RecordId) -> Result<Value, FetchError> {
        let url = self.endpoint(kind, Some(id))?;
        let timeout = self.timeouts.single;
        let response = self
            .execute(self.client.get(url.clone()), &url, timeout)
            .await?;
        read_json(response, &url, timeout).await
    }

    async fn create(&self, kind: ResourceKind, body: &Value) -> Result<Value, FetchError> {
        let url = self.endpoint(kind, None)?;
        let timeout = self.timeouts.mutation;
        let response = self
            .execute(self.client.post(url.clone()).json(body), &url, timeout)
            .await?;
        read_json(response, &url, timeout).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        body: &Value,
    ) -> Result<Value, FetchError> {
        let url = self.endpoint(kind, Some(id))?;
        let timeout = self.timeouts.mutation;
        let response = self
            .execute(self.client.put(url.clone()).json(body), &url, timeout)
            .await?;
        read_json(response, &url, timeout).await
    }

    async fn delete(&self, kind: ResourceKind, id: &RecordId) -> Result<(), FetchError> {
        let url = self.endpoint(kind, Some(id))?;
        self.execute(self.client.delete(url.clone()), &url, self.timeouts.mutation)
            .await?;
        Ok(())
    }

    async fn delete_many(&self, kind: ResourceKind, ids: &[RecordId]) -> Result<(), FetchError> {
        let url = self.endpoint(kind, None)?;
        self.execute(
            self.client.delete(url.clone()).json(ids),
            &url,
            self.timeouts.mutation,
        )
        .await?;
        Ok(())
    }
}

fn transport_error(err: &reqwest::Error, url: &Url, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if err.is_decode() {
        FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        FetchError::Network {
            message: format!("{url}: {err}"),
        }
    }
}

async fn status_error(response: Response, url: &Url) -> FetchError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let problem = serde_json::from_slice::<ProblemDetails>(&bytes).ok();
    let body = String::from_utf8_lossy(&bytes);
    let body = body.trim();

    let message = problem
        .as_ref()
        .and_then(ProblemDetails::best_message)
        .map(str::to_string)
        .or_else(|| (!body.is_empty()).then(|| body.chars().take(MESSAGE_LIMIT).collect()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    FetchError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        message,
    }
}

async fn read_json(response: Response, url: &Url, timeout: Duration) -> Result<Value, FetchError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|err| transport_error(&err, url, timeout))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|err| FetchError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })
}
