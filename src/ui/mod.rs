//! Terminal User Interface module.
//!
//! The presentation side of the pipeline: tabs for the three lists, row
//! rendering with per-slot image state, and a detail view.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Pipeline event processing
//! - `render` - View rendering dispatch and tab bar
//! - `helpers` - Background loads and browser hand-off
//! - `list` - Ranked list widget
//! - `detail` - Article detail widget
//! - `status` - Status bar widget

mod detail;
mod events;
mod helpers;
mod input;
mod list;
mod loop_runner;
mod render;
mod status;

pub use loop_runner::{run, Action};
