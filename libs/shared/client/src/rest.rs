use std::sync::Arc;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::{ApiError, CredentialProvider};

/// Raw status and body of a response, for callers that interpret the
/// protocol themselves (booking submissions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// No HTTP response was obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Could not connect to server: {0}")]
    Connect(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport failure: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidRequest(msg) => ApiError::Configuration(msg),
            other => ApiError::Network(other.to_string()),
        }
    }
}

pub struct HospitalApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HospitalApiClient {
    pub fn new(config: &AppConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn get_headers(&self) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        match self.credentials.access_token() {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| TransportError::InvalidRequest(format!("bad access token: {}", e)))?;
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!("No access token available, sending unauthenticated request"),
        }

        Ok(headers)
    }

    fn prepare(&self, method: Method, path: &str, body: Option<&Value>) -> Result<RequestBuilder, TransportError> {
        if self.base_url.is_empty() {
            return Err(TransportError::InvalidRequest("API base URL is not configured".to_string()));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.get_headers()?);

        if let Some(body_data) = body {
            req = req.json(body_data);
        }

        Ok(req)
    }

    /// Typed request: non-2xx statuses become `ApiError`, success bodies are
    /// decoded into `T`.
    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let reply = self.send(method, path, body).await?;

        if !(200..300).contains(&reply.status) {
            let error_text = reply.body_text();
            error!("API error ({}): {}", reply.status, error_text);
            return Err(ApiError::from_status(reply.status, &error_text));
        }

        serde_json::from_slice::<T>(&reply.body).map_err(|e| {
            error!("Failed to decode response from {}: {}", path, e);
            ApiError::Decoding(e.to_string())
        })
    }

    /// Raw request: any HTTP response, whatever its status, is returned as an
    /// `HttpReply`; only transport failures are errors.
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<HttpReply, TransportError> {
        let response = self.prepare(method, path, body.as_ref())?.send().await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!("Received {} ({} bytes) from {}", status, body.len(), path);

        Ok(HttpReply { status, body })
    }
}
