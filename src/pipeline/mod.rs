//! Per-list article pipeline: cache, snapshot engine and list controllers.

mod cache;
mod controller;
mod events;
mod snapshot;

pub use cache::ResponseCache;
pub use controller::{ListController, LoadOutcome, LoadPhase};
pub use events::PipelineEvent;
pub use snapshot::{diff, EnginePhase, ListSnapshotEngine, RowChange, SnapshotDiff};

use crate::api::{ArticleFetcher, ListId};
use crate::config::{Config, ConfigError};
use crate::images::{ImageLoadCoordinator, ImageLoader};
use crate::util::{validate_base_url, UrlValidationError};
use reqwest::redirect::Policy;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] UrlValidationError),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        // Host only: list request URLs carry the API key.
        tracing::debug!(
            to = url.host_str().unwrap_or("<none>"),
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// Shared HTTP client for list and image requests.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .build()
}

/// Composition root: one shared cache and fetcher, one controller per list.
pub struct Pipeline {
    cache: Arc<ResponseCache>,
    fetcher: ArticleFetcher,
    controllers: [Arc<ListController>; 3],
}

impl Pipeline {
    /// Builds the pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Fails if no API key is configured, the base URL is invalid or
    /// insecure, or the HTTP client cannot be built.
    pub fn new(config: &Config, events: mpsc::Sender<PipelineEvent>) -> Result<Self, PipelineError> {
        let api_key = config.resolve_api_key()?;
        Self::with_api_key(config, api_key, events)
    }

    /// Like [`Pipeline::new`] with an explicit key instead of env/config lookup.
    pub fn with_api_key(
        config: &Config,
        api_key: SecretString,
        events: mpsc::Sender<PipelineEvent>,
    ) -> Result<Self, PipelineError> {
        let base_url = validate_base_url(&config.base_url)?;
        let timeout = config.request_timeout();
        let client = build_http_client(timeout)?;

        let fetcher = ArticleFetcher::new(client.clone(), base_url, api_key, timeout);
        let loader = ImageLoader::new(client, timeout, config.max_image_bytes);
        let cache = Arc::new(ResponseCache::new());

        let controllers = ListId::ALL.map(|list| {
            Arc::new(ListController::new(
                list,
                Arc::clone(&cache),
                fetcher.clone(),
                config.settle_delay(),
                events.clone(),
                ImageLoadCoordinator::new(list, loader.clone(), events.clone()),
            ))
        });

        tracing::debug!(base_url = %config.base_url, "Pipeline ready");
        Ok(Self {
            cache,
            fetcher,
            controllers,
        })
    }

    pub fn controller(&self, list: ListId) -> &Arc<ListController> {
        &self.controllers[list.index()]
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn fetcher(&self) -> &ArticleFetcher {
        &self.fetcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> Config {
        Config {
            base_url: base_url.to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_controllers_indexed_by_list() {
        let (tx, _rx) = mpsc::channel(1);
        let pipeline = Pipeline::with_api_key(
            &config("https://api.example.com/v2"),
            SecretString::from("k".to_string()),
            tx,
        )
        .unwrap();

        for list in ListId::ALL {
            assert_eq!(pipeline.controller(list).list(), list);
        }
        assert!(pipeline.cache().is_empty());
        assert_eq!(pipeline.fetcher().in_flight_count(), 0);
    }

    #[test]
    fn test_insecure_base_url_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let result = Pipeline::with_api_key(
            &config("http://api.example.com/v2"),
            SecretString::from("k".to_string()),
            tx,
        );
        assert!(matches!(result, Err(PipelineError::BaseUrl(_))));
    }

    #[test]
    fn test_loopback_http_allowed() {
        let (tx, _rx) = mpsc::channel(1);
        assert!(Pipeline::with_api_key(
            &config("http://127.0.0.1:8080/v2"),
            SecretString::from("k".to_string()),
            tx,
        )
        .is_ok());
    }
}
