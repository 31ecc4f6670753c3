use super::decode::{decode_collection, DecodeError};
use super::models::{ArticleCollection, ListId};
use crate::util::{has_media_type, media_type, read_limited_bytes, BodyError};
use futures::future::{BoxFuture, FutureExt, Shared};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Ranking period requested from the API (the seven most recent days).
pub const PERIOD_DAYS: u32 = 7;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Transport-level failures of a list request.
///
/// `Clone` so that every caller coalesced onto one in-flight request receives
/// its own copy of the outcome; the `reqwest` error is shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(Arc<reqwest::Error>),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response was not `application/json`
    #[error("Unexpected content type: {0}")]
    ContentType(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was shorter than its Content-Length
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Request URL could not be built from the base URL
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(Arc::new(e))
        }
    }
}

impl From<BodyError> for TransportError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::Network(e) => e.into(),
            BodyError::TooLarge(_) => TransportError::ResponseTooLarge,
            BodyError::Incomplete { expected, received } => {
                TransportError::IncompleteResponse { expected, received }
            }
        }
    }
}

/// Errors from fetching one ranked list.
///
/// Both kinds end the list's loading state and leave the cache untouched;
/// neither is retried automatically.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

type InFlight = Shared<BoxFuture<'static, Result<Arc<ArticleCollection>, FetchError>>>;

/// Fetches ranked lists from the remote API.
///
/// Cheap to clone; clones share the HTTP client and the in-flight map.
/// Concurrent [`fetch`](ArticleFetcher::fetch) calls for the same list are
/// coalesced onto a single request.
#[derive(Clone)]
pub struct ArticleFetcher {
    inner: Arc<FetcherInner>,
}

struct FetcherInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    timeout: Duration,
    in_flight: Mutex<HashMap<ListId, InFlight>>,
}

impl ArticleFetcher {
    /// `base_url` should already have passed [`crate::util::validate_base_url`].
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        api_key: SecretString,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                client,
                base_url,
                api_key,
                timeout,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Request URL for `list`: `<base>/<segment>/7.json?api-key=<key>`.
    ///
    /// Contains the API key; never log the result.
    pub fn request_url(&self, list: ListId) -> Result<Url, TransportError> {
        self.inner.request_url(list)
    }

    /// Fetches and decodes the ranked list for `list`.
    ///
    /// If a fetch for the same list is already in flight, waits for that
    /// request's outcome instead of issuing a second one.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Transport`] for network failures, timeouts, non-2xx
    ///   status, a non-JSON content type or an oversized body
    /// - [`FetchError::Decode`] when the body does not match the schema
    pub async fn fetch(&self, list: ListId) -> Result<Arc<ArticleCollection>, FetchError> {
        let flight = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(&list) {
                Some(existing) => {
                    tracing::debug!(list = %list, "Joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let flight = async move { inner.fetch_once(list).await.map(Arc::new) }
                        .boxed()
                        .shared();
                    in_flight.insert(list, flight.clone());
                    flight
                }
            }
        };

        // Removes the entry even when this waiter is dropped mid-request, so
        // a later fetch never joins a flight whose timeout is already running.
        let _guard = FlightGuard {
            inner: &self.inner,
            list,
            flight: flight.clone(),
        };

        flight.await
    }

    /// Number of lists with a request currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct FlightGuard<'a> {
    inner: &'a FetcherInner,
    list: ListId,
    flight: InFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(&self.list)
            .is_some_and(|f| f.ptr_eq(&self.flight))
        {
            in_flight.remove(&self.list);
        }
    }
}

impl FetcherInner {
    fn request_url(&self, list: ListId) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(list.segment())
            .push(&format!("{PERIOD_DAYS}.json"));
        url.query_pairs_mut()
            .append_pair("api-key", self.api_key.expose_secret());
        Ok(url)
    }

    async fn fetch_once(&self, list: ListId) -> Result<ArticleCollection, FetchError> {
        let url = self.request_url(list)?;
        tracing::debug!(list = %list, "Requesting ranked list");

        let bytes = tokio::time::timeout(self.timeout, self.download(url))
            .await
            .map_err(|_| TransportError::Timeout)??;

        let collection = decode_collection(&bytes).inspect_err(|e| {
            tracing::warn!(list = %list, path = %e.path, error = %e.message, "Failed to decode ranked list");
        })?;

        tracing::info!(
            list = %list,
            articles = collection.results.len(),
            status = %collection.status,
            "Fetched ranked list"
        );
        Ok(collection)
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        if !has_media_type(&response, "application/json") {
            let found = media_type(&response).unwrap_or_else(|| "<none>".to_string());
            return Err(TransportError::ContentType(found));
        }

        Ok(read_limited_bytes(response, MAX_RESPONSE_SIZE).await?)
    }
}
