use crate::api::{Article, ImageBytes};
use crate::util::{media_type, read_limited_bytes, validate_web_url, BodyError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failures while loading a row image.
///
/// Row-scoped: the row renders without an image and nothing is cached, so a
/// later bind of the same article can try again.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Not an image (content type {0})")]
    NotAnImage(String),
    #[error("Empty image body")]
    Empty,
    #[error("Image too large (exceeds {0} bytes)")]
    TooLarge(usize),
    #[error("Incomplete image: expected {expected} bytes, received {received}")]
    Incomplete { expected: u64, received: usize },
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),
}

impl From<BodyError> for ImageLoadError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::Network(e) if e.is_timeout() => ImageLoadError::Timeout,
            BodyError::Network(e) => ImageLoadError::Network(e),
            BodyError::TooLarge(limit) => ImageLoadError::TooLarge(limit),
            BodyError::Incomplete { expected, received } => {
                ImageLoadError::Incomplete { expected, received }
            }
        }
    }
}

/// Loads the `medium440` image of an article and memoizes it on the article.
#[derive(Clone)]
pub struct ImageLoader {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl ImageLoader {
    pub fn new(client: reqwest::Client, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            client,
            timeout,
            max_bytes,
        }
    }

    /// Returns the article's image bytes.
    ///
    /// - `Ok(None)`: the article has no media or no `medium440` variant
    /// - cached bytes are returned without a network call
    /// - otherwise the variant URL is fetched once and stored on the article
    pub async fn load(&self, article: &Article) -> Result<Option<ImageBytes>, ImageLoadError> {
        let Some((_, variant)) = article.lead_image() else {
            return Ok(None);
        };

        if let Some(cached) = article.image() {
            tracing::trace!(article_id = %article.id, "Image cache hit");
            return Ok(Some(Arc::clone(cached)));
        }

        validate_web_url(&variant.url)
            .map_err(|e| ImageLoadError::InvalidUrl(e.to_string()))?;

        let bytes = tokio::time::timeout(self.timeout, self.download(variant.url.clone()))
            .await
            .map_err(|_| ImageLoadError::Timeout)??;

        tracing::debug!(article_id = %article.id, bytes = bytes.len(), "Image loaded");
        Ok(Some(article.store_image(Arc::from(bytes))))
    }

    async fn download(&self, url: url::Url) -> Result<Vec<u8>, ImageLoadError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageLoadError::HttpStatus(status.as_u16()));
        }

        match media_type(&response) {
            Some(m) if m.starts_with("image/") => {}
            other => {
                return Err(ImageLoadError::NotAnImage(
                    other.unwrap_or_else(|| "<none>".to_string()),
                ))
            }
        }

        let bytes = read_limited_bytes(response, self.max_bytes).await?;
        if bytes.is_empty() {
            return Err(ImageLoadError::Empty);
        }
        Ok(bytes)
    }
}
