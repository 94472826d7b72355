#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod asset_paths;
pub mod builder;
pub mod bundle;
pub mod config;
pub mod error;
pub mod graph;
pub mod manager;
pub mod models;
pub mod resolver;
pub mod versions;

pub use builder::BundleBuilder;
pub use bundle::{CommandMinifier, Minifier};
pub use config::{AssetConfig, AssetOptions, AssetsConfig, KindConfig};
pub use error::{PipelineError, Result};
pub use graph::BundleGraph;
pub use manager::{AssetManager, FoundAsset};
pub use models::{BuildReport, BuiltBundle, Kind};
pub use resolver::{Clock, FixedClock, SystemClock, UrlResolver};
pub use versions::{VersionFormat, VersionMap, VersionStore, Versioner};
