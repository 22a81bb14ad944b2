//! Upload service boundary.
//!
//! Submissions always mark themselves as direct message/prompt attachments
//! (`message_file=true`) rather than generic library ingestion, and carry the
//! provisional identifier so acknowledgments can be correlated back to the
//! registry record that started them.

pub(crate) mod pipeline;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::{GatewayConfig, SessionCredentials};
use crate::error::{Error, Result};
use crate::models::{FileHandle, FileId, ResourceCategory};
use crate::util::compact_text;

pub use pipeline::{run_upload, UploadTask};

/// One file submission to the upload service.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Identity of the agent pipeline consuming this attachment.
    pub endpoint: String,
    /// Original file name.
    pub file_name: String,
    /// Content MIME type.
    pub mime_type: String,
    /// Raw file bytes.
    pub bytes: Bytes,
    /// Provisional identifier used for correlation.
    pub provisional_id: FileHandle,
    /// Pixel width, images only.
    pub width: Option<u32>,
    /// Pixel height, images only.
    pub height: Option<u32>,
    /// Category tag, if the caller specified one.
    pub tool_resource: Option<ResourceCategory>,
}

/// Service acknowledgment for a persisted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Echo of the provisional identifier the submission carried.
    pub temp_file_id: String,
    /// Authoritative identifier assigned by the service.
    pub file_id: FileId,
    /// Final storage path.
    pub filepath: String,
}

/// Upload submission seam. Implemented over HTTP in production and by mocks
/// in tests.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt>;
}

/// HTTP upload service posting multipart submissions to the gateway.
#[derive(Debug, Clone)]
pub struct HttpUploadService {
    base_url: String,
    credentials: SessionCredentials,
    client: reqwest::Client,
}

impl HttpUploadService {
    /// Build an upload client for the configured gateway and signed-in user.
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

    fn build_form(request: UploadRequest) -> Result<reqwest::multipart::Form> {
        let file_part = reqwest::multipart::Part::bytes(request.bytes.to_vec())
            .file_name(urlencoding::encode(&request.file_name).into_owned())
            .mime_str(&request.mime_type)?;

        let mut form = reqwest::multipart::Form::new()
            .text("endpoint", request.endpoint)
            .text("file_id", request.provisional_id.to_string())
            .text("message_file", "true")
            .part("file", file_part);

        if let Some(width) = request.width {
            form = form.text("width", width.to_string());
        }
        if let Some(height) = request.height {
            form = form.text("height", height.to_string());
        }
        if let Some(category) = request.tool_resource {
            form = form.text("tool_resource", category.as_str());
        }
        Ok(form)
    }
}

#[async_trait]
impl UploadService for HttpUploadService {
    async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt> {
        let url = format!("{}/v1/files/message", self.base_url);
        let form = Self::build_form(request)?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.credentials.access_token)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "Upload failed with HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        Ok(response.json::<UploadReceipt>().await?)
    }
}
