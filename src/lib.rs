//! Most-popular article lists: fetch, cache, diff and display.
//!
//! The core is [`pipeline`]: one [`pipeline::ListController`] per list,
//! sharing a response cache and a coalescing fetcher, committing ordered
//! snapshots and coordinating per-slot image loads. [`ui`] drives it from a
//! terminal.

pub mod api;
pub mod app;
pub mod config;
pub mod images;
pub mod keybindings;
pub mod pipeline;
pub mod ui;
pub mod util;
