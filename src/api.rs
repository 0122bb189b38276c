//! The request and response formats of the chunk endpoint, and the HTTP transport posting them.

use futures::{future::BoxFuture, FutureExt};
use reqwest::{multipart::Form, Client};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Reqwest error: {0:?}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Server responded with status {0}. Response: {1}")]
    StatusError(u16, String),
    #[error("Serde JSON parsing error: {0:?}. Response: {1}")]
    SerdeJSONError(#[source] serde_json::Error, String),
}

/// The form fields posted for a single chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkForm {
    /// Data URL of the chunk bytes.
    pub data: String,
    pub file_name: String,
    pub file_type: String,
    pub chunks_count: u64,
    /// Zero-based chunk index.
    pub file_num: u64,
}

impl ChunkForm {
    /// Field names and values in the order they are posted.
    pub fn fields(&self) -> [(&'static str, String); 5] {
        [
            ("data", self.data.clone()),
            ("fileName", self.file_name.clone()),
            ("fileType", self.file_type.clone()),
            ("chunksCount", self.chunks_count.to_string()),
            ("fileNum", self.file_num.to_string()),
        ]
    }

    pub fn into_multipart(self) -> Form {
        self.fields()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
    }
}

/// What the server says about a chunk it accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkResponse {
    /// Only a JSON `true` under `complete` counts, anything else leaves this `false`.
    pub complete: bool,
}

impl ChunkResponse {
    pub fn from_body(body: &str) -> Result<Self, Error> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| Error::SerdeJSONError(e, body.to_owned()))?;

        Ok(ChunkResponse {
            complete: value.get("complete") == Some(&Value::Bool(true)),
        })
    }
}

/// Posts one chunk form to an endpoint and hands back the parsed response.
pub trait Transport: Send + Sync {
    fn post(&self, url: &str, form: ChunkForm) -> BoxFuture<'static, Result<ChunkResponse, Error>>;
}

/// [`Transport`] over HTTP, posting `multipart/form-data` bodies.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// No request timeout is applied.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        HttpTransport { client }
    }

    pub fn with_client(client: Client) -> Self {
        HttpTransport { client }
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, form: ChunkForm) -> BoxFuture<'static, Result<ChunkResponse, Error>> {
        let request = self
            .client
            .post(url)
            .header("accept", "application/json")
            .multipart(form.into_multipart());

        async move {
            let resp = request.send().await?;
            let status = resp.status();
            let body = resp.text().await?;

            if !status.is_success() {
                return Err(Error::StatusError(status.as_u16(), body));
            }
            ChunkResponse::from_body(&body)
        }
        .boxed()
    }
}
