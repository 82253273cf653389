//! Upload client for the hosted image service.
//!
//! Sends an unsigned multipart upload (`file`, `upload_preset`, `folder`)
//! to `{base}/v1_1/{cloud}/image/upload`. The file body is streamed in
//! chunks so progress can be reported while the transfer is in flight.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use wasura_core::error::CoreError;
use wasura_core::upload::{ImageFile, ImageRules};

/// Size of each streamed body chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Progress callback receiving whole percentages (0-100).
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    /// HTTPS delivery URL.
    #[serde(rename = "secure_url")]
    pub url: String,
    /// Opaque asset identifier on the media host.
    pub public_id: String,
}

/// Errors from the media upload layer.
#[derive(Debug, thiserror::Error)]
pub enum MediaApiError {
    /// The file failed local validation; nothing was sent.
    #[error("Rejected before upload: {0}")]
    Rejected(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The media host returned a non-2xx status code.
    #[error("Media API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<MediaApiError> for CoreError {
    fn from(err: MediaApiError) -> Self {
        match err {
            MediaApiError::Rejected(msg) => CoreError::Validation(msg),
            MediaApiError::Request(e) => CoreError::network(e.to_string()),
            MediaApiError::ApiError { status, body } => {
                let detail = serde_json::from_str::<serde_json::Value>(&body).ok();
                let message = detail
                    .as_ref()
                    .and_then(|d| d.pointer("/error/message"))
                    .and_then(|m| m.as_str())
                    .map(|m| format!("Upload failed: {m}"))
                    .unwrap_or_else(|| "Upload failed".to_string());
                CoreError::Transport {
                    status: Some(status),
                    message,
                    detail,
                }
            }
        }
    }
}

/// HTTP client for one media host account.
pub struct MediaApi {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
    folder: String,
    rules: ImageRules,
}

impl MediaApi {
    /// Create an upload client.
    ///
    /// * `base_url`   - API origin, e.g. `https://api.cloudinary.com`.
    /// * `cloud_name` - account name embedded in the upload path.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        cloud_name: &str,
        upload_preset: String,
        folder: String,
        rules: ImageRules,
    ) -> Self {
        Self {
            client,
            upload_url: format!(
                "{}/v1_1/{}/image/upload",
                base_url.trim_end_matches('/'),
                cloud_name
            ),
            upload_preset,
            folder,
            rules,
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    pub fn rules(&self) -> &ImageRules {
        &self.rules
    }

    /// Validate and upload one image.
    ///
    /// `on_progress` receives whole percentages as body chunks are handed
    /// to the transport, ending at 100.
    pub async fn upload(
        &self,
        file: ImageFile,
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadedImage, MediaApiError> {
        self.rules
            .validate(&file)
            .map_err(|e| MediaApiError::Rejected(e.to_string()))?;

        let total = file.data.len();
        let data = Arc::clone(&file.data);
        let chunks = futures::stream::iter((0..total).step_by(CHUNK_SIZE).map(move |start| {
            let end = (start + CHUNK_SIZE).min(total);
            if let Some(report) = &on_progress {
                report(percent(end, total));
            }
            Ok::<_, std::io::Error>(data[start..end].to_vec())
        }));

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(chunks), total as u64)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", self.folder.clone());

        tracing::debug!(file = %file.name, bytes = total, "Uploading image");

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::error!(file = %file.name, status = status.as_u16(), body = %body, "Image upload failed");
            return Err(MediaApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded = response.json::<UploadedImage>().await?;
        tracing::info!(file = %file.name, public_id = %uploaded.public_id, "Image uploaded");
        Ok(uploaded)
    }
}

fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

// ---------------------------------------------------------------------------
// Delivery URL transforms
// ---------------------------------------------------------------------------

/// Insert resize/quality/format transforms into a delivery URL.
///
/// URLs without an `/upload/` segment are returned unchanged.
pub fn optimized_url(url: &str, width: u32, quality: &str, format: &str) -> String {
    url.replacen(
        "/upload/",
        &format!("/upload/w_{width},q_{quality},f_{format}/"),
        1,
    )
}

/// 200px-wide thumbnail of a delivery URL.
pub fn thumbnail_url(url: &str) -> String {
    optimized_url(url, 200, "auto", "auto")
}
