//! Helpers for addressing assets: URL joining, reference filters, base-URL
//! rotation and loose asset discovery.
//!
//! Each concern lives in its own submodule so the path arithmetic can be tested
//! without touching the filesystem.

mod filters;
mod rotation;
mod scanning;
mod urls;

pub use filters::{is_absolute_url, is_external_reference};
pub use rotation::BaseUrlRotation;
pub use scanning::scan_assets;
pub use urls::{append_query, base_path, join_url, normalize_relative, parent_dir};
