use super::snapshot::SnapshotDiff;
use crate::api::{Article, ArticleId, FetchError, ImageBytes, ListId};
use crate::images::SlotId;
use std::sync::Arc;

/// Events sent from the pipeline to the presentation layer.
///
/// Cancelled image loads send nothing.
#[derive(Debug)]
pub enum PipelineEvent {
    /// A list started loading; show its loading indicator.
    LoadingStarted { list: ListId },
    /// A new ordered snapshot was committed for `list`.
    ///
    /// Fields:
    /// - `diff`: Minimal row changes from the previously committed order
    /// - `articles`: The full committed order
    /// - `from_cache`: True if the collection came from the response cache
    SnapshotCommitted {
        list: ListId,
        diff: SnapshotDiff,
        articles: Vec<Arc<Article>>,
        from_cache: bool,
    },
    /// A list fetch failed; non-fatal notice for the user.
    FetchFailed { list: ListId, error: FetchError },
    /// Loading finished for `list`, successfully or not; stop the indicator.
    LoadingStopped { list: ListId, ok: bool },
    /// An image finished loading for the article bound to `slot`.
    ///
    /// Paint only if `generation` is still current for the slot.
    ImageLoaded {
        list: ListId,
        slot: SlotId,
        article_id: ArticleId,
        generation: u64,
        image: ImageBytes,
    },
    /// An image load failed; the row stays without an image.
    ImageFailed {
        list: ListId,
        slot: SlotId,
        article_id: ArticleId,
        generation: u64,
        error: String,
    },
}
