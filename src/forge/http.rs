//! HTTP plumbing for Forge REST calls
//!
//! A thin wrapper over reqwest that owns the base URL and credentials,
//! logs each request, checks response status, and decodes JSON bodies.
//! Errors are typed so callers can attach traversal context to them.

use super::auth::Credentials;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Maximum length of an error body quoted in logs and messages.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// A failed Forge API call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{method} {url}: HTTP {status}: {message}")]
    Http {
        method: &'static str,
        url: String,
        status: StatusCode,
        message: String,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// HTTP client bound to one Forge instance.
#[derive(Clone)]
pub struct ForgeHttp {
    http: reqwest::Client,
    base: Url,
    credentials: Credentials,
}

impl ForgeHttp {
    /// Create a client for the given base URL.
    ///
    /// The base keeps any path prefix it carries; endpoint paths are
    /// joined relative to it.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("forgectl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            credentials,
        })
    }

    /// Build a full URL from a relative endpoint path and query pairs.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self.base.join(path)?;
        for (key, value) in query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.url(path, query)?;
        let body = self.send("GET", &url, self.http.get(url.clone())).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST a JSON payload, decoding the JSON response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path, &[])?;
        let request = self.http.post(url.clone()).json(payload);
        let body = self.send("POST", &url, request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// PUT a JSON payload, decoding the JSON response.
    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path, &[])?;
        let request = self.http.put(url.clone()).json(payload);
        let body = self.send("PUT", &url, request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// DELETE a resource; the response body, if any, is discarded.
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.url(path, &[])?;
        self.send("DELETE", &url, self.http.delete(url.clone()))
            .await?;
        Ok(())
    }

    /// Authorize, send, and status-check one request, returning the body.
    async fn send(
        &self,
        method: &'static str,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<String, ClientError> {
        tracing::debug!("{} {}", method, url);

        let response = self.credentials.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("API error: {} {} - {}", method, status, sanitize_for_log(&body));
            return Err(ClientError::Http {
                method,
                url: url.to_string(),
                status,
                message: error_message(&body),
            });
        }

        Ok(body)
    }
}

/// Pull the service's error message out of a failure body.
///
/// Forge reports errors as `{"message": ...}` (occasionally `{"error":
/// ...}`); anything else is quoted truncated.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = value.get(key).and_then(|m| m.as_str()) {
                return message.to_string();
            }
        }
    }
    sanitize_for_log(body)
}

/// Sanitize a response body for logging: truncate long bodies and strip
/// non-printable characters.
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}
