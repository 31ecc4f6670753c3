//! Row image loading.
//!
//! [`ImageLoader`] downloads and memoizes one article image;
//! [`ImageLoadCoordinator`] ties loads to display slots so that a slot
//! rebound to another article never shows a stale image.

mod coordinator;
mod loader;

pub use coordinator::{BindOutcome, ImageLoadCoordinator, SlotId};
pub use loader::{ImageLoadError, ImageLoader};
