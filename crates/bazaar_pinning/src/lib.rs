//! Upload client for the content-pinning service.
//!
//! Takes a local image file plus metadata strings, validates it, and POSTs it
//! as a multipart payload to the pinning endpoint. The returned content
//! identifier is what the mint flow writes into the contract.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

/// Maximum accepted file size: 100 MiB.
pub const MAX_FILE_BYTES: u64 = 100 * 1024 * 1024;

const DEFAULT_NAME: &str = "NFT Image";
const DEFAULT_DESCRIPTION: &str = "NFT description";

#[derive(Debug, thiserror::Error)]
pub enum PinningError {
    #[error("file not found: {0}")]
    MissingFile(String),

    #[error("file too large ({size} bytes, max {MAX_FILE_BYTES})")]
    TooLarge { size: u64 },

    #[error("only image files can be pinned: {0}")]
    NotAnImage(String),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("pinning service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response from pinning service: {0}")]
    UnexpectedResponse(String),
}

/// Anything that can turn a local file into a content identifier.
///
/// [`PinningClient`] is the production implementation; tests substitute an
/// in-memory one.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn pin_file(
        &self,
        path: &Path,
        name: &str,
        description: &str,
    ) -> Result<String, PinningError>;
}

/// Client for the pinning-service upload endpoint.
pub struct PinningClient {
    client: Client,
    endpoint: String,
    jwt: String,
}

impl PinningClient {
    pub fn new(endpoint: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            jwt: jwt.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AssetUploader for PinningClient {
    /// Upload one image file and return its content identifier.
    ///
    /// Validation (presence, size, image MIME type) happens before any
    /// network traffic; a validation failure never results in a partial
    /// upload. Any `Err` means "do not proceed to mint".
    async fn pin_file(
        &self,
        path: &Path,
        name: &str,
        description: &str,
    ) -> Result<String, PinningError> {
        let metadata = std::fs::metadata(path)
            .map_err(|_| PinningError::MissingFile(path.display().to_string()))?;
        if !metadata.is_file() {
            return Err(PinningError::MissingFile(path.display().to_string()));
        }
        if metadata.len() > MAX_FILE_BYTES {
            return Err(PinningError::TooLarge {
                size: metadata.len(),
            });
        }
        let mime = image_mime_for(path)
            .ok_or_else(|| PinningError::NotAnImage(path.display().to_string()))?;

        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime)
            .map_err(|e| PinningError::UnexpectedResponse(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("pinataMetadata", metadata_json(name, description));

        debug!(path = %path.display(), mime, "uploading to pinning service");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PinningError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinningError::Service {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PinningError::UnexpectedResponse(e.to_string()))?;
        let cid = body
            .get("IpfsHash")
            .and_then(Value::as_str)
            .ok_or_else(|| PinningError::UnexpectedResponse(body.to_string()))?;

        info!(cid, "file pinned");
        Ok(cid.to_string())
    }
}

/// Metadata object attached to the upload, with placeholder defaults for
/// empty fields.
fn metadata_json(name: &str, description: &str) -> String {
    let name = if name.trim().is_empty() { DEFAULT_NAME } else { name };
    let description = if description.trim().is_empty() {
        DEFAULT_DESCRIPTION
    } else {
        description
    };
    serde_json::json!({ "name": name, "description": description }).to_string()
}

/// Best provider-supplied error message from a failure body, with a generic
/// fallback for unparsable responses.
fn extract_error_message(body: &str) -> String {
    let fallback = "failed to upload to pinning service".to_string();
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return fallback;
    };
    match value.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(error) => error
            .get("details")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(fallback),
        None => fallback,
    }
}

/// MIME type for a file with an image extension, `None` otherwise.
fn image_mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "bmp" => Some("image/bmp"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    // Endpoint that must never be contacted: validation failures return first.
    fn client() -> PinningClient {
        PinningClient::new("http://127.0.0.1:1/pin", "test-jwt")
    }

    #[tokio::test]
    async fn missing_file_rejected_before_upload() {
        let result = client()
            .pin_file(Path::new("/does/not/exist.png"), "a", "b")
            .await;
        assert!(matches!(result, Err(PinningError::MissingFile(_))));
    }

    #[tokio::test]
    async fn oversize_file_rejected_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        let file = std::fs::File::create(&path).unwrap();
        // Sparse file just over the limit; nothing is actually written.
        file.set_len(MAX_FILE_BYTES + 1).unwrap();

        let result = client().pin_file(&path, "a", "b").await;
        assert!(matches!(result, Err(PinningError::TooLarge { size }) if size == MAX_FILE_BYTES + 1));
    }

    #[tokio::test]
    async fn non_image_rejected_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let result = client().pin_file(&path, "a", "b").await;
        assert!(matches!(result, Err(PinningError::NotAnImage(_))));
    }

    #[tokio::test]
    async fn valid_file_reaches_the_network_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        // The unreachable endpoint proves validation passed.
        let result = client().pin_file(&path, "a", "b").await;
        assert!(matches!(result, Err(PinningError::Network(_))));
    }

    #[test]
    fn image_mime_covers_common_extensions() {
        assert_eq!(image_mime_for(&PathBuf::from("a.png")), Some("image/png"));
        assert_eq!(image_mime_for(&PathBuf::from("a.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_for(&PathBuf::from("a.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_for(&PathBuf::from("a.webp")), Some("image/webp"));
        assert_eq!(image_mime_for(&PathBuf::from("a.txt")), None);
        assert_eq!(image_mime_for(&PathBuf::from("noext")), None);
    }

    #[test]
    fn metadata_defaults_for_empty_fields() {
        let value: Value = serde_json::from_str(&metadata_json("", "  ")).unwrap();
        assert_eq!(value["name"], "NFT Image");
        assert_eq!(value["description"], "NFT description");

        let value: Value = serde_json::from_str(&metadata_json("Sunset", "Oil")).unwrap();
        assert_eq!(value["name"], "Sunset");
        assert_eq!(value["description"], "Oil");
    }

    #[test]
    fn extracts_provider_error_details() {
        assert_eq!(
            extract_error_message(r#"{"error":{"details":"invalid JWT"}}"#),
            "invalid JWT"
        );
        assert_eq!(
            extract_error_message(r#"{"error":"rate limited"}"#),
            "rate limited"
        );
        assert_eq!(
            extract_error_message("<html>gateway timeout</html>"),
            "failed to upload to pinning service"
        );
        assert_eq!(
            extract_error_message(r#"{"something":"else"}"#),
            "failed to upload to pinning service"
        );
    }
}
