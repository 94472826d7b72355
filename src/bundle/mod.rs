//! Stages applied to a resolved bundle before and after it is written.

pub mod combine;
pub mod minify;
pub mod styles;

pub use combine::{combine_files, render_delimiter};
pub use minify::{CommandMinifier, Minifier};
pub use styles::StylesheetRewriter;
