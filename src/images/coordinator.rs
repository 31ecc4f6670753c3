use super::loader::ImageLoader;
use crate::api::{Article, ArticleId, ImageBytes, ListId};
use crate::pipeline::PipelineEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A reusable row position in the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of binding an article to a slot.
#[derive(Debug, Clone)]
pub enum BindOutcome {
    /// The slot already shows this article; nothing was restarted.
    Unchanged,
    /// The article has no displayable image.
    NoImage,
    /// The image was already memoized on the article.
    Cached(ImageBytes),
    /// A load was started; its completion event carries `generation`.
    Loading { generation: u64 },
}

struct SlotBinding {
    article_id: ArticleId,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl SlotBinding {
    /// Aborts the in-flight load, if any. Returns true if one was running.
    fn cancel(self) -> bool {
        match self.handle {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }
}

/// Per-slot image loading with cancellation.
///
/// Loads are tracked by slot, not by article: rebinding a slot aborts the
/// load issued for that slot only, so a load for the same article running in
/// another slot is never affected. Each bind gets a fresh generation; the
/// presentation layer paints a completion only if
/// [`is_current`](ImageLoadCoordinator::is_current) still holds.
pub struct ImageLoadCoordinator {
    list: ListId,
    loader: ImageLoader,
    events: mpsc::Sender<PipelineEvent>,
    slots: Mutex<HashMap<SlotId, SlotBinding>>,
    generation: AtomicU64,
}

impl ImageLoadCoordinator {
    pub fn new(list: ListId, loader: ImageLoader, events: mpsc::Sender<PipelineEvent>) -> Self {
        Self {
            list,
            loader,
            events,
            slots: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<SlotId, SlotBinding>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `article` to `slot`, cancelling whatever the slot was loading.
    ///
    /// Must be called from within a Tokio runtime when a load is needed.
    pub fn bind(&self, slot: SlotId, article: Arc<Article>) -> BindOutcome {
        let mut slots = self.slots();

        if slots.get(&slot).is_some_and(|b| b.article_id == article.id) {
            return BindOutcome::Unchanged;
        }

        if let Some(previous) = slots.remove(&slot) {
            let previous_id = previous.article_id;
            if previous.cancel() {
                tracing::debug!(
                    list = %self.list,
                    slot = %slot,
                    article_id = %previous_id,
                    "Cancelled image load for rebound slot"
                );
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let mut binding = SlotBinding {
            article_id: article.id,
            generation,
            handle: None,
        };

        let outcome = if article.lead_image().is_none() {
            BindOutcome::NoImage
        } else if let Some(bytes) = article.image() {
            BindOutcome::Cached(Arc::clone(bytes))
        } else {
            binding.handle = Some(self.spawn_load(slot, generation, article));
            BindOutcome::Loading { generation }
        };

        slots.insert(slot, binding);
        outcome
    }

    /// Unbinds `slot` (row scrolled off-screen). An in-flight load is
    /// cancelled silently. Returns true if a load was cancelled.
    pub fn release(&self, slot: SlotId) -> bool {
        let Some(binding) = self.slots().remove(&slot) else {
            return false;
        };
        let article_id = binding.article_id;
        let cancelled = binding.cancel();
        if cancelled {
            tracing::debug!(list = %self.list, slot = %slot, article_id = %article_id, "Cancelled image load for released slot");
        }
        cancelled
    }

    /// Unbinds every slot, e.g. when the page goes away.
    pub fn release_all(&self) {
        let drained: Vec<SlotBinding> = self.slots().drain().map(|(_, b)| b).collect();
        let cancelled = drained
            .into_iter()
            .map(SlotBinding::cancel)
            .filter(|c| *c)
            .count();
        if cancelled > 0 {
            tracing::debug!(list = %self.list, cancelled, "Cancelled image loads on release_all");
        }
    }

    /// True if `generation` is the latest bind of `slot`.
    pub fn is_current(&self, slot: SlotId, generation: u64) -> bool {
        self.slots()
            .get(&slot)
            .is_some_and(|b| b.generation == generation)
    }

    /// The article currently bound to `slot`.
    pub fn bound_article(&self, slot: SlotId) -> Option<ArticleId> {
        self.slots().get(&slot).map(|b| b.article_id)
    }

    /// Number of slots with a load still running.
    pub fn loading_count(&self) -> usize {
        self.slots()
            .values()
            .filter(|b| b.handle.as_ref().is_some_and(|h| !h.is_finished()))
            .count()
    }

    fn spawn_load(&self, slot: SlotId, generation: u64, article: Arc<Article>) -> JoinHandle<()> {
        let list = self.list;
        let loader = self.loader.clone();
        let tx = self.events.clone();

        tokio::spawn(async move {
            let article_id = article.id;
            let event = match loader.load(&article).await {
                Ok(Some(image)) => PipelineEvent::ImageLoaded {
                    list,
                    slot,
                    article_id,
                    generation,
                    image,
                },
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(list = %list, article_id = %article_id, error = %e, "Error fetching image");
                    PipelineEvent::ImageFailed {
                        list,
                        slot,
                        article_id,
                        generation,
                        error: e.to_string(),
                    }
                }
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(error = %e, event = "Image", "Channel send failed (receiver dropped)");
            }
        })
    }
}

impl Drop for ImageLoadCoordinator {
    fn drop(&mut self) {
        self.release_all();
    }
}
