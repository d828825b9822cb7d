/// Record-storage API client implementation.
///
/// This module provides `HttpRecordClient` for making synchronous JSON requests to the
/// record API, along with error types and the builder used to configure it.
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use super::types::{BatchEnvelope, Envelope, FetchParams};

/// Errors that can occur while talking to the record API.
///
/// These are transport-level failures. An envelope with `success: false` is
/// not an error at this layer; callers inspect the envelope.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl RecordError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }
}

/// Operations of the generic record API, one collection (`table`) at a time.
///
/// This trait enables mocking in tests and keeps the store adapter
/// independent of the transport.
pub trait RecordClient: Send + Sync {
    /// Queries records matching `params`.
    fn fetch(&self, table: &str, params: &FetchParams) -> Result<Envelope<Vec<Value>>, RecordError>;

    /// Loads one record. `fields` limits the returned columns; empty means all.
    fn get_by_id(&self, table: &str, id: i64, fields: &[String])
    -> Result<Envelope<Value>, RecordError>;

    /// Creates records in one batch.
    fn create(&self, table: &str, records: Vec<Value>) -> Result<BatchEnvelope, RecordError>;

    /// Updates records in one batch. Every record carries its `Id`.
    fn update(&self, table: &str, records: Vec<Value>) -> Result<BatchEnvelope, RecordError>;

    /// Deletes records by id in one batch.
    fn delete(&self, table: &str, ids: &[i64]) -> Result<BatchEnvelope, RecordError>;
}

/// Builder for constructing `HttpRecordClient` instances.
///
/// # Examples
///
/// ```
/// use inkdrop::record::HttpRecordClientBuilder;
///
/// let client = HttpRecordClientBuilder::new()
///     .base_url("http://localhost:8787")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.base_url(), "http://localhost:8787");
/// ```
#[derive(Debug, Default)]
pub struct HttpRecordClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
}

impl HttpRecordClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the record API (e.g. "https://records.example").
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the bearer token sent with every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builds the client.
    ///
    /// # Environment Variables
    ///
    /// If `base_url()` was not called, `INKDROP_API_URL` is used, falling back
    /// to `http://localhost:8787`. If `api_key()` was not called,
    /// `INKDROP_API_KEY` is used when set.
    pub fn build(self) -> Result<HttpRecordClient, RecordError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => std::env::var("INKDROP_API_URL")
                .unwrap_or_else(|_| "http://localhost:8787".to_string()),
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        let api_key = self
            .api_key
            .or_else(|| std::env::var("INKDROP_API_KEY").ok())
            .filter(|k| !k.is_empty());

        reqwest::Url::parse(&base_url)
            .map_err(|e| RecordError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(RecordError::Network)?;

        Ok(HttpRecordClient {
            client,
            base_url,
            api_key,
        })
    }
}

/// Blocking JSON-over-HTTP client for the record API.
///
/// Each operation is a `POST {base_url}/tables/{table}/{operation}`.
pub struct HttpRecordClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRecordClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, table: &str, operation: &str) -> String {
        format!("{}/tables/{}/{}", self.base_url, table, operation)
    }

    fn post<B, R>(&self, table: &str, operation: &str, body: &B) -> Result<R, RecordError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(table, operation);
        debug!(%url, "record API request");

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(RecordError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecordError::Http {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(RecordError::from_reqwest)?;
        serde_json::from_slice(&bytes).map_err(RecordError::Serialization)
    }
}

impl RecordClient for HttpRecordClient {
    fn fetch(&self, table: &str, params: &FetchParams) -> Result<Envelope<Vec<Value>>, RecordError> {
        self.post(table, "fetch", params)
    }

    fn get_by_id(
        &self,
        table: &str,
        id: i64,
        fields: &[String],
    ) -> Result<Envelope<Value>, RecordError> {
        self.post(table, "get", &json!({ "id": id, "fields": fields }))
    }

    fn create(&self, table: &str, records: Vec<Value>) -> Result<BatchEnvelope, RecordError> {
        self.post(table, "create", &json!({ "records": records }))
    }

    fn update(&self, table: &str, records: Vec<Value>) -> Result<BatchEnvelope, RecordError> {
        self.post(table, "update", &json!({ "records": records }))
    }

    fn delete(&self, table: &str, ids: &[i64]) -> Result<BatchEnvelope, RecordError> {
        self.post(table, "delete", &json!({ "RecordIds": ids }))
    }
}
