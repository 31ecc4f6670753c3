//! Helper functions for UI operations.
//!
//! Background list loads, browser hand-off and panic containment for
//! spawned tasks.

use crate::api::{Article, ListId};
use crate::app::App;
use crate::util::validate_web_url;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Wraps a future to catch panics and convert them to errors.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Spawns a load of `list` unless one is already running.
///
/// The controller reports progress through pipeline events; the task
/// result itself is only logged. Returns false if a load was already running.
pub(super) fn spawn_list_load(app: &mut App, list: ListId) -> bool {
    let slot = &mut app.load_handles[list.index()];
    if slot.as_ref().is_some_and(|h| !h.is_finished()) {
        tracing::debug!(list = %list, "Load already running");
        return false;
    }

    let controller = Arc::clone(app.pipeline.controller(list));
    *slot = Some(tokio::spawn(async move {
        match catch_task_panic(controller.load()).await {
            Ok(outcome) => tracing::debug!(list = %list, ?outcome, "Load task finished"),
            Err(panic_msg) => {
                tracing::error!(list = %list, error = %panic_msg, "Load task panicked");
            }
        }
    }));
    app.page_for(list).loading = true;
    true
}

/// Opens the article in the system browser.
pub(super) fn open_in_browser(app: &mut App, article: &Article) {
    if let Err(e) = validate_web_url(&article.url) {
        app.set_status(e.to_string());
    } else if let Err(e) = open::that(article.url.as_str()) {
        app.set_status(format!("Failed to open browser: {}", e));
    } else {
        app.set_status("Opening article in browser...");
    }
}
