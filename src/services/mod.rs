//! Services module - pure game logic that doesn't hold session state.
//!
//! # Components
//!
//! - [`ImageSetProvider`]: Builds each round's candidate set from a [`FlaggedPool`]
//!   and the distractor URL template
//! - [`avatar`]: Data-URL avatar recompression used when saving settings
//! - [`crop`]: Offline preprocessing that trims the bottom of flagged images
//!
//! The services have no dependency on the front-end and take every input as
//! an explicit parameter.

pub mod avatar;
pub mod crop;
pub mod image_set;

pub use avatar::{AvatarError, compress_data_url};
pub use crop::{CropReport, crop_bottom};
pub use image_set::{FlaggedPool, ImageSetError, ImageSetProvider, ImageSetWarning, RoundSet};
