//! Forge authentication
//!
//! Credentials live in a small YAML file holding exactly one of three
//! schemes: a bearer token, a static API key, or basic username/password.
//! Schemes are tried in that order when the file is parsed.

use anyhow::{Context, Result};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::path::Path;

/// One authentication scheme for the Forge API.
///
/// Deliberately not `Debug`: scheme values are secrets.
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// `token: <value>` sent as `Authorization: Bearer <value>`.
    Bearer { token: String },
    /// `api-key: <value>` sent as `X-Api-Key: <value>`.
    ApiKey {
        #[serde(rename = "api-key")]
        api_key: String,
    },
    /// `basic: { username, password }` sent as HTTP basic auth.
    Basic { basic: BasicAuth },
}

#[derive(Clone, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Load credentials from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read credentials file {}", path.display()))?;
        let credentials: Credentials = serde_yaml::from_str(&content).with_context(|| {
            format!(
                "credentials file {} does not hold a token, api-key, or basic scheme",
                path.display()
            )
        })?;

        tracing::debug!("loaded {} credentials from {}", credentials.scheme(), path.display());
        Ok(credentials)
    }

    /// Short scheme name for logging.
    pub fn scheme(&self) -> &'static str {
        match self {
            Credentials::Bearer { .. } => "bearer-token",
            Credentials::ApiKey { .. } => "api-key",
            Credentials::Basic { .. } => "basic",
        }
    }

    /// Attach this scheme's headers to an outgoing request.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Bearer { token } => request.bearer_auth(token),
            Credentials::ApiKey { api_key } => request.header("X-Api-Key", api_key),
            Credentials::Basic { basic } => {
                request.basic_auth(&basic.username, Some(&basic.password))
            }
        }
    }
}
