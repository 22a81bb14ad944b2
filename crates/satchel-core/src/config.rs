//! Gateway configuration and session credentials.
//!
//! Satchel talks to a single backend gateway for uploads and authenticated
//! downloads. The gateway base URL and the consuming agent endpoint identity
//! are provisioned here; secret credentials travel separately as
//! [`SessionCredentials`].

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const ENV_API_BASE_URL: &str = "SATCHEL_API_BASE_URL";
const ENV_AGENT_ENDPOINT: &str = "SATCHEL_AGENT_ENDPOINT";

/// Default endpoint identity when none is provisioned.
pub const DEFAULT_AGENT_ENDPOINT: &str = "agents";

/// Backend gateway configuration for upload and download operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL, without a trailing slash.
    pub api_base_url: String,
    /// Identity of the agent pipeline that consumes the attachments.
    pub agent_endpoint: String,
}

impl GatewayConfig {
    /// Create a configuration from explicit values.
    pub fn new(api_base_url: impl Into<String>, agent_endpoint: impl Into<String>) -> Result<Self> {
        let api_base_url = normalize_base_url(api_base_url.into().as_str())?;
        let agent_endpoint = normalize_text_option(Some(agent_endpoint.into())).ok_or_else(|| {
            Error::InvalidInput("Agent endpoint cannot be empty".to_string())
        })?;
        Ok(Self {
            api_base_url,
            agent_endpoint,
        })
    }

    /// Load gateway configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no satchel variables are set.
    /// Returns an error when the base URL is missing or invalid while other
    /// variables are provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }
}

fn parse_config(get: impl Fn(&str) -> Option<String>) -> Result<Option<GatewayConfig>> {
    let base_url = get(ENV_API_BASE_URL);
    let endpoint = get(ENV_AGENT_ENDPOINT);

    if base_url.is_none() && endpoint.is_none() {
        return Ok(None);
    }

    let Some(base_url) = base_url else {
        return Err(Error::InvalidInput(format!(
            "{ENV_AGENT_ENDPOINT} is set but {ENV_API_BASE_URL} is missing"
        )));
    };

    let endpoint = endpoint.unwrap_or_else(|| DEFAULT_AGENT_ENDPOINT.to_string());
    GatewayConfig::new(base_url, endpoint).map(Some)
}

/// Normalize a gateway base URL: trim, strip trailing slashes, require an
/// http(s) scheme.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(Error::InvalidInput(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&base) {
        return Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}

/// Identity and credential of the signed-in user driving this session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub user_id: String,
    pub access_token: String,
}

impl SessionCredentials {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Whether the credential carries a usable token.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionCredentials")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
