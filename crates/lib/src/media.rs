//! Resolve attachment handles to raw bytes.

use crate::event::MediaRef;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media download failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("media download returned {0}")]
    Status(reqwest::StatusCode),
}

/// Turns a [`MediaRef`] into bytes.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn load(&self, media: &MediaRef) -> Result<Vec<u8>, MediaError>;
}

/// Inline bytes are returned as is; URLs are fetched over HTTP.
pub struct MediaFetcher {
    client: reqwest::Client,
}

impl MediaFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaSource for MediaFetcher {
    async fn load(&self, media: &MediaRef) -> Result<Vec<u8>, MediaError> {
        match media {
            MediaRef::Inline(bytes) => Ok(bytes.clone()),
            MediaRef::Url(url) => {
                log::debug!("fetching media from {}", url);
                let res = self.client.get(url).send().await?;
                if !res.status().is_success() {
                    return Err(MediaError::Status(res.status()));
                }
                Ok(res.bytes().await?.to_vec())
            }
        }
    }
}
