//! images.rs
//!
//! Service layer for the external image blob store.
//!
//! The store is an opaque collaborator: it takes a byte stream with its
//! content type and answers with a stable URL for the stored blob. Failures
//! are surfaced to the caller as-is; there is no retry and no buffering of
//! the bytes beyond the one request.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;
use tracing::info;

use crate::config::ImageStoreConfig;

/// Errors from one upload attempt.
#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// The request never produced a usable response.
    #[error("image store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The store answered with a non-success status.
    #[error("image store rejected upload: {status}")]
    Rejected { status: StatusCode },
}

/// Response from the blob store on a stored upload.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Client for the image blob store API.
#[derive(Clone)]
pub struct ImageStoreClient {
    /// Base URL of the store.
    base_url: String,
    /// Bearer key authorizing uploads.
    api_key: String,
    /// Container (bucket) the blobs land in.
    container: String,
    /// Async HTTP client.
    http_client: reqwest::Client,
}

impl ImageStoreClient {
    /// Creates and configures the client from the application settings.
    pub fn from_config(config: &ImageStoreConfig) -> Self {
        Self {
            base_url: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            container: config.container.clone(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Stores one image and returns the URL the store assigned to it.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ImageStoreError> {
        let size = bytes.len();

        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, self.container))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageStoreError::Rejected { status });
        }

        let uploaded = response.json::<UploadResponse>().await?;
        info!("Stored image: {} bytes, {} -> {}", size, content_type, uploaded.url);
        Ok(uploaded.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ImageStoreClient {
        ImageStoreClient::from_config(&ImageStoreConfig {
            endpoint: server.uri(),
            api_key: "test-key".to_string(),
            container: "venue-images".to_string(),
        })
    }

    #[tokio::test]
    async fn upload_returns_stored_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/venue-images"))
            .and(header("content-type", "image/png"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": "https://blobs.example.com/venue-images/abc123.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = client_for(&server)
            .upload(vec![0x89, 0x50, 0x4e, 0x47], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "https://blobs.example.com/venue-images/abc123.png");
    }

    #[tokio::test]
    async fn non_success_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/venue-images"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .upload(vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap_err();
        match err {
            ImageStoreError::Rejected { status } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_store_response_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/venue-images"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .upload(vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageStoreError::Transport(_)));
    }
}
