//! Authenticated blob retrieval for attachment previews.

use async_trait::async_trait;
use tracing::warn;

use crate::config::{GatewayConfig, SessionCredentials};
use crate::error::{Error, Result};
use crate::models::FileId;
use crate::preview::PreviewRef;
use crate::util::compact_text;

/// Resolves a persisted file identifier to a renderable preview reference.
///
/// Resolution never fails hard: any transport or authorization problem is
/// logged and surfaces as `None`, and callers fall back to the raw stored
/// path.
#[async_trait]
pub trait BlobResolver: Send + Sync {
    async fn resolve(&self, file_id: &FileId) -> Option<PreviewRef>;
}

/// HTTP blob fetcher using the gateway's per-user download route.
#[derive(Debug, Clone)]
pub struct AuthenticatedBlobFetcher {
    base_url: String,
    credentials: SessionCredentials,
    client: reqwest::Client,
}

impl AuthenticatedBlobFetcher {
    /// Build a fetcher for the configured gateway and signed-in user.
    pub fn new(config: &GatewayConfig, credentials: SessionCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Transport(format!("Failed to construct HTTP client: {error}")))?;
        Ok(Self {
            base_url: config.api_base_url.clone(),
            credentials,
            client,
        })
    }

    async fn fetch(&self, file_id: &FileId) -> Result<PreviewRef> {
        if !self.credentials.has_token() {
            return Err(Error::Transport(
                "No access token available for blob retrieval".to_string(),
            ));
        }

        let url = format!(
            "{}/v1/files/download/{}/{}",
            self.base_url,
            urlencoding::encode(&self.credentials.user_id),
            urlencoding::encode(file_id.as_str())
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "Blob retrieval failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?;

        Ok(PreviewRef::from_bytes(mime_type, bytes))
    }
}

#[async_trait]
impl BlobResolver for AuthenticatedBlobFetcher {
    async fn resolve(&self, file_id: &FileId) -> Option<PreviewRef> {
        match self.fetch(file_id).await {
            Ok(preview) => Some(preview),
            Err(error) => {
                warn!(file_id = %file_id, "Blob retrieval failed, using fallback: {error}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_without_token_falls_back_to_none() {
        let config =
            GatewayConfig::new("https://api.example.invalid", "agents").unwrap();
        let fetcher =
            AuthenticatedBlobFetcher::new(&config, SessionCredentials::new("user-1", " "))
                .unwrap();

        assert!(fetcher.resolve(&FileId::from("abc")).await.is_none());
    }
}
