//! Image pipeline: upload to the image host, fetch the hosted copy back, ask the image model
//! to describe it, and reply with the description plus the public link.

use crate::event::MediaRef;
use crate::llm::{ImageModel, LlmError};
use crate::media::{MediaError, MediaSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub const IMAGE_ANALYSIS_PROMPT: &str = "Analyze the image keenly and explain its content. If it's text, translate it and identify the language.";
pub const IMAGE_ERROR_REPLY: &str = "🚨 Error analyzing the image. Please try again later.";

const UPLOAD_FILE_NAME: &str = "attachment.jpg";
const IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum ImageHostError {
    #[error("image host request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("image host api error: {0}")]
    Api(String),
    #[error("image host response has no image.url")]
    MissingUrl,
}

/// Hosting service that turns bytes into a public URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload and return the public URL.
    async fn upload(&self, bytes: &[u8]) -> Result<String, ImageHostError>;
    /// Download the bytes behind a hosted URL.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageHostError>;
}

/// An image after one round-trip through the host.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub public_url: String,
    pub bytes: Vec<u8>,
}

/// im.ge-compatible host: `POST /api/1/upload` with multipart `source` and `X-API-Key`.
#[derive(Clone)]
pub struct ImgeClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    /// Used instead of `client` for URLs on the base URL's origin only.
    host_client: Option<reqwest::Client>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    image: Option<UploadedImageInfo>,
}

#[derive(Debug, Deserialize)]
struct UploadedImageInfo {
    #[serde(default)]
    url: Option<String>,
}

impl ImgeClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            host_client: None,
        }
    }

    /// Client for requests to the configured host itself, e.g. one that skips certificate
    /// checks. Hosted image URLs on any other origin keep the default client.
    pub fn with_host_client(mut self, client: reqwest::Client) -> Self {
        self.host_client = Some(client);
        self
    }

    fn client_for(&self, url: &str) -> &reqwest::Client {
        match &self.host_client {
            Some(host_client) if same_origin(&self.base_url, url) => host_client,
            _ => &self.client,
        }
    }
}

fn same_origin(a: &str, b: &str) -> bool {
    match (reqwest::Url::parse(a), reqwest::Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

#[async_trait]
impl ImageHost for ImgeClient {
    async fn upload(&self, bytes: &[u8]) -> Result<String, ImageHostError> {
        let url = format!("{}/api/1/upload", self.base_url);
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(IMAGE_MIME)?;
        let form = reqwest::multipart::Form::new().part("source", part);
        let res = self
            .client_for(&url)
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .multipart(form)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ImageHostError::Api(format!("upload {} {}", status, body)));
        }
        let data: UploadResponse = res.json().await?;
        data.image
            .and_then(|i| i.url)
            .filter(|u| !u.trim().is_empty())
            .ok_or(ImageHostError::MissingUrl)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageHostError> {
        let res = self.client_for(url).get(url).send().await?;
        if !res.status().is_success() {
            return Err(ImageHostError::Api(format!("fetch {}", res.status())));
        }
        Ok(res.bytes().await?.to_vec())
    }
}

/// Any step of the pipeline failing.
#[derive(Debug, thiserror::Error)]
pub enum ImageAnalysisError {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Host(#[from] ImageHostError),
    #[error(transparent)]
    Model(#[from] LlmError),
}

pub struct ImagePipeline {
    media: Arc<dyn MediaSource>,
    host: Arc<dyn ImageHost>,
    model: Arc<dyn ImageModel>,
}

impl ImagePipeline {
    pub fn new(
        media: Arc<dyn MediaSource>,
        host: Arc<dyn ImageHost>,
        model: Arc<dyn ImageModel>,
    ) -> Self {
        Self { media, host, model }
    }

    /// Resolve the handle, then [`analyze`](Self::analyze). Never fails.
    pub async fn analyze_media(&self, media: &MediaRef) -> String {
        match self.media.load(media).await {
            Ok(bytes) => self.analyze(&bytes).await,
            Err(e) => {
                log::error!("error loading image attachment: {}", e);
                IMAGE_ERROR_REPLY.to_string()
            }
        }
    }

    /// Analysis reply or the fixed fallback. Never fails.
    pub async fn analyze(&self, image_bytes: &[u8]) -> String {
        match self.try_analyze(image_bytes).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("error processing image attachment: {}", e);
                IMAGE_ERROR_REPLY.to_string()
            }
        }
    }

    async fn try_analyze(&self, image_bytes: &[u8]) -> Result<String, ImageAnalysisError> {
        let image = self.upload(image_bytes).await?;
        let description = self
            .model
            .describe(IMAGE_ANALYSIS_PROMPT, &image.bytes, IMAGE_MIME)
            .await?;
        Ok(format_analysis(&description, &image.public_url))
    }

    /// Upload, then re-fetch from the public URL; the model needs bytes, not a link.
    async fn upload(&self, image_bytes: &[u8]) -> Result<UploadedImage, ImageHostError> {
        let public_url = self.host.upload(image_bytes).await?;
        log::info!("image uploaded successfully: {}", public_url);
        let bytes = self.host.fetch(&public_url).await?;
        Ok(UploadedImage { public_url, bytes })
    }
}

fn format_analysis(description: &str, url: &str) -> String {
    format!(
        "🖼️ Image Analysis:\n{}\n\n🔗 View Image: {}",
        description, url
    )
}
