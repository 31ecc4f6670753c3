//! Utility functions shared by the pipeline and the terminal UI.
//!
//! - **Text**: control-character stripping for API-supplied strings,
//!   width-aware truncation and human-readable byte sizes
//! - **HTTP bodies**: size-limited streaming reads and content-type checks
//! - **URL validation**: policy checks for the configured API base URL and
//!   for media URLs handed to the image loader

mod body;
mod text;
mod url_validator;

pub use body::{has_media_type, media_type, read_limited_bytes, BodyError};
pub use text::{format_bytes, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_base_url, validate_web_url, UrlValidationError};
