//! Raw request execution against the Tableau REST API
//!
//! The transport knows nothing about projects or pagination: it sends one
//! request, checks the status and hands back the body. Retries are a caller
//! decision.

use crate::config::TableauConfig;
use crate::error::{Result, TableauError};
use async_trait::async_trait;
use reqwest::Method;

const AUTH_HEADER: &str = "X-Tableau-Auth";

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `method path` with an optional JSON body and return the raw
    /// response body of a successful response
    async fn execute(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>>;
}

/// reqwest-backed transport bound to one site-scoped API URL
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
    auth_token: String,
}

impl HttpTransport {
    pub fn new(config: &TableauConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_url: config.api_url.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Full URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        tracing::trace!("{} {}", method, path);

        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .header(AUTH_HEADER, &self.auth_token)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(TableauError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes.to_vec())
    }
}
