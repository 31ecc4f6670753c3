//! Pipeline event processing.
//!
//! Applies events sent by list controllers and image loads to the UI state.

use crate::app::{App, SlotImage, View};
use crate::pipeline::{PipelineEvent, RowChange};

/// Apply one pipeline event to the app state.
pub(super) fn handle_pipeline_event(app: &mut App, event: PipelineEvent) {
    match event {
        PipelineEvent::LoadingStarted { list } => {
            app.page_for(list).loading = true;
        }

        PipelineEvent::SnapshotCommitted {
            list,
            diff,
            articles,
            from_cache,
        } => {
            tracing::debug!(
                list = %list,
                rows = articles.len(),
                inserted = diff.count(|c| matches!(c, RowChange::Insert { .. })),
                removed = diff.count(|c| matches!(c, RowChange::Remove { .. })),
                moved = diff.count(|c| matches!(c, RowChange::Move { .. })),
                reloaded = diff.count(|c| matches!(c, RowChange::Reload { .. })),
                from_cache,
                "Snapshot committed"
            );
            // slots are rebound by position after the next draw
            app.page_for(list).commit(&diff, articles);
        }

        PipelineEvent::FetchFailed { list, error } => {
            let msg = format!("{}: {}", list.title(), error);
            app.page_for(list).error = Some(error.to_string());
            if list == app.active {
                app.set_status(msg);
            }
        }

        PipelineEvent::LoadingStopped { list, ok } => {
            tracing::debug!(list = %list, ok, "Loading stopped");
            app.page_for(list).loading = false;
        }

        PipelineEvent::ImageLoaded {
            list,
            slot,
            article_id,
            generation,
            image,
        } => {
            if !app.controller(list).images().is_current(slot, generation) {
                tracing::trace!(list = %list, slot = %slot, article_id = %article_id, "Dropping stale image");
                return;
            }
            if let Some(paint) = app.page_for(list).slots.get_mut(&slot) {
                if paint.article_id == article_id {
                    paint.image = SlotImage::Loaded(image);
                }
            }
        }

        PipelineEvent::ImageFailed {
            list,
            slot,
            article_id,
            generation,
            error,
        } => {
            if !app.controller(list).images().is_current(slot, generation) {
                return;
            }
            if let Some(paint) = app.page_for(list).slots.get_mut(&slot) {
                if paint.article_id == article_id {
                    paint.image = SlotImage::Failed;
                }
            }
            if app.view == View::Detail
                && app.detail.as_ref().is_some_and(|a| a.id == article_id)
            {
                app.set_status(format!("Image failed: {}", error));
            }
        }
    }
}
