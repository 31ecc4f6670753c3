use super::cache::ResponseCache;
use super::events::PipelineEvent;
use super::snapshot::ListSnapshotEngine;
use crate::api::{Article, ArticleFetcher, ArticleId, ArticleRow, FetchError, ListId};
use crate::images::ImageLoadCoordinator;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// Loading state of one list page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    /// Cache lookup or network fetch in progress.
    Loading,
    /// Fetched; waiting out the settle delay before committing.
    Settling,
}

/// Result of [`ListController::load`].
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Committed { rows: usize, from_cache: bool },
    Failed(FetchError),
}

impl LoadOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, LoadOutcome::Committed { .. })
    }
}

/// Orchestrates one list: cache, fetch, settle, commit.
///
/// The same type serves all three lists; it is parameterized by its
/// [`ListId`] and the shared cache and fetcher it is given.
pub struct ListController {
    list: ListId,
    cache: Arc<ResponseCache>,
    fetcher: ArticleFetcher,
    engine: Mutex<ListSnapshotEngine>,
    phase: Mutex<LoadPhase>,
    load_lock: tokio::sync::Mutex<()>,
    settle_delay: Duration,
    events: mpsc::Sender<PipelineEvent>,
    images: ImageLoadCoordinator,
}

/// Restores `Idle` and stops the indicator if a load is dropped midway
/// (task aborted at a suspension point).
struct LoadGuard<'a> {
    controller: &'a ListController,
    finished: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let c = self.controller;
        c.set_phase(LoadPhase::Idle);
        c.engine().abort_loading();
        let _ = c.events.try_send(PipelineEvent::LoadingStopped {
            list: c.list,
            ok: false,
        });
        tracing::debug!(list = %c.list, "Load dropped before completion");
    }
}

impl ListController {
    pub fn new(
        list: ListId,
        cache: Arc<ResponseCache>,
        fetcher: ArticleFetcher,
        settle_delay: Duration,
        events: mpsc::Sender<PipelineEvent>,
        images: ImageLoadCoordinator,
    ) -> Self {
        Self {
            list,
            cache,
            fetcher,
            engine: Mutex::new(ListSnapshotEngine::new(list)),
            phase: Mutex::new(LoadPhase::Idle),
            load_lock: tokio::sync::Mutex::new(()),
            settle_delay,
            events,
            images,
        }
    }

    pub fn list(&self) -> ListId {
        self.list
    }

    pub fn phase(&self) -> LoadPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: LoadPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn engine(&self) -> MutexGuard<'_, ListSnapshotEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the list and commits it to the snapshot.
    ///
    /// A cache hit commits immediately. A miss fetches, waits out the settle
    /// delay, stores the result in the cache and commits. `LoadingStopped`
    /// is sent on every path. Calls for the same list are serialized: a
    /// second caller waits for the first and then resolves from the cache.
    pub async fn load(&self) -> LoadOutcome {
        let _serial = self.load_lock.lock().await;
        let mut guard = LoadGuard {
            controller: self,
            finished: false,
        };

        self.set_phase(LoadPhase::Loading);
        self.engine().begin_loading();
        self.emit(PipelineEvent::LoadingStarted { list: self.list })
            .await;

        let (collection, from_cache) = match self.cache.get(self.list) {
            Some(cached) => {
                tracing::debug!(list = %self.list, "Response cache hit");
                (cached, true)
            }
            None => match self.fetcher.fetch(self.list).await {
                Ok(fetched) => {
                    self.set_phase(LoadPhase::Settling);
                    tokio::time::sleep(self.settle_delay).await;
                    self.cache.put(self.list, Arc::clone(&fetched));
                    (fetched, false)
                }
                Err(error) => {
                    tracing::warn!(list = %self.list, error = %error, "Failed to load ranked list");
                    self.engine().abort_loading();
                    self.set_phase(LoadPhase::Idle);
                    guard.finished = true;
                    self.emit(PipelineEvent::FetchFailed {
                        list: self.list,
                        error: error.clone(),
                    })
                    .await;
                    self.emit(PipelineEvent::LoadingStopped {
                        list: self.list,
                        ok: false,
                    })
                    .await;
                    return LoadOutcome::Failed(error);
                }
            },
        };

        let (diff, articles) = {
            let mut engine = self.engine();
            let diff = engine.diff_and_apply(&collection.results);
            (diff, engine.articles().to_vec())
        };
        let rows = articles.len();

        self.set_phase(LoadPhase::Idle);
        guard.finished = true;
        self.emit(PipelineEvent::SnapshotCommitted {
            list: self.list,
            diff,
            articles,
            from_cache,
        })
        .await;
        self.emit(PipelineEvent::LoadingStopped {
            list: self.list,
            ok: true,
        })
        .await;

        tracing::info!(list = %self.list, rows, from_cache, "Committed ranked list");
        LoadOutcome::Committed { rows, from_cache }
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Err(e) = self.events.send(event).await {
            tracing::warn!(list = %self.list, error = %e, "Channel send failed (receiver dropped)");
        }
    }

    /// Resolves a selected row to its full article.
    pub fn article(&self, id: ArticleId) -> Option<Arc<Article>> {
        self.engine().article(id)
    }

    /// Articles of the committed snapshot, in order.
    pub fn articles(&self) -> Vec<Arc<Article>> {
        self.engine().articles().to_vec()
    }

    /// Row view-models of the committed snapshot, in order.
    pub fn rows(&self) -> Vec<ArticleRow> {
        self.engine()
            .articles()
            .iter()
            .map(|a| ArticleRow::from(a.as_ref()))
            .collect()
    }

    pub fn images(&self) -> &ImageLoadCoordinator {
        &self.images
    }

    /// True once a collection for this list is in the response cache.
    pub fn is_cached(&self) -> bool {
        self.cache.contains(self.list)
    }
}
