//! Owning façade wiring configuration, bundle graphs and versions together.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::asset_paths::{BaseUrlRotation, scan_assets};
use crate::builder::BundleBuilder;
use crate::bundle::{CommandMinifier, Minifier, StylesheetRewriter};
use crate::config::AssetConfig;
use crate::error::{PipelineError, Result};
use crate::graph::BundleGraph;
use crate::models::{BuildReport, Kind};
use crate::resolver::{Clock, SystemClock, UrlResolver};
use crate::versions::{VersionFormat, VersionStore, Versioner};

/// A loose asset found under one of the configured roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundAsset {
  /// Configured root, relative to the common path.
  pub root: String,
  /// Path of the file relative to `root`, using forward slashes.
  pub path: String,
}

impl FoundAsset {
  /// File key of the asset relative to the common path.
  pub fn key(&self) -> String {
    match self.root.trim_matches('/') {
      "" | "." => self.path.clone(),
      root => format!("{root}/{}", self.path),
    }
  }
}

/// Owns everything needed to build bundles and address them from pages.
pub struct AssetManager {
  config: AssetConfig,
  css: BundleGraph,
  js: BundleGraph,
  versions: VersionStore,
  rotation: BaseUrlRotation,
  rewriter: StylesheetRewriter,
  minifier: Box<dyn Minifier>,
  clock: Box<dyn Clock>,
}

impl AssetManager {
  /// Create a manager using the system clock and the configured minify commands.
  pub fn new(config: AssetConfig) -> Result<Self> {
    Self::with_clock(config, Box::new(SystemClock))
  }

  /// Create a manager reading time from `clock`.
  pub fn with_clock(config: AssetConfig, clock: Box<dyn Clock>) -> Result<Self> {
    config.validate()?;
    let css = BundleGraph::new(Kind::Css, config.css.map.clone()).with_max_depth(config.max_depth);
    let js = BundleGraph::new(Kind::Js, config.js.map.clone()).with_max_depth(config.max_depth);
    let rotation = BaseUrlRotation::new(config.base_urls.clone())?;
    let rewriter = StylesheetRewriter::new(&config.css_url_pattern)?;
    let minifier: Box<dyn Minifier> = Box::new(CommandMinifier::from_config(&config));

    debug!(css = css.len(), js = js.len(), debug = config.debug, "asset manager ready");
    Ok(Self {
      config,
      css,
      js,
      versions: VersionStore::new(),
      rotation,
      rewriter,
      minifier,
      clock,
    })
  }

  /// Replace the minifier collaborator.
  pub fn with_minifier(mut self, minifier: Box<dyn Minifier>) -> Self {
    self.minifier = minifier;
    self
  }

  /// Active configuration.
  pub fn config(&self) -> &AssetConfig {
    &self.config
  }

  /// Bundle graph for `kind`.
  pub fn graph(&self, kind: Kind) -> Result<&BundleGraph> {
    match kind {
      Kind::Css => Ok(&self.css),
      Kind::Js => Ok(&self.js),
      Kind::Generic => Err(PipelineError::Config("generic assets have no bundle graph".into())),
    }
  }

  /// Build stylesheet bundles, then script bundles.
  pub fn build(&mut self) -> BuildReport {
    let mut report = BuildReport::default();
    for kind in Kind::BUNDLED {
      report.extend(self.build_kind(kind));
    }
    report
  }

  /// Build every bundle of one kind.
  pub fn build_kind(&mut self, kind: Kind) -> BuildReport {
    let graph = match kind {
      Kind::Css => &self.css,
      Kind::Js => &self.js,
      Kind::Generic => {
        let mut report = BuildReport::default();
        report
          .failures
          .push((kind.to_string(), PipelineError::Config("generic assets are not bundled".into())));
        return report;
      }
    };
    let builder = BundleBuilder::new(
      &self.config,
      &self.rotation,
      self.minifier.as_ref(),
      self.clock.as_ref(),
      &self.rewriter,
    );
    builder.build_graph(graph, &mut self.versions)
  }

  fn resolver(&self) -> UrlResolver<'_> {
    UrlResolver::new(&self.config, &self.rotation, self.clock.as_ref(), &self.versions)
  }

  /// URLs referencing bundle `key` of `kind`.
  pub fn urls_for(&self, kind: Kind, key: &str) -> Result<Vec<String>> {
    self.resolver().urls_for(self.graph(kind)?, key)
  }

  /// Public URL for any file key, such as a loose asset.
  pub fn url_for(&self, key: &str) -> String {
    self.resolver().url_for(key)
  }

  /// Markup referencing bundle `key` of `kind`.
  pub fn markup_for(
    &self,
    kind: Kind,
    key: &str,
    overrides: &BTreeMap<String, String>,
    delimiter: Option<&str>,
  ) -> Result<String> {
    self.resolver().markup_for(self.graph(kind)?, key, overrides, delimiter)
  }

  /// Loose assets under every configured root.
  pub fn find_assets(&self) -> Result<Vec<FoundAsset>> {
    let mut found = Vec::new();
    for root in self.config.assets.roots() {
      let options = self.config.assets.options_for(root)?;
      let pattern = Regex::new(&options.pattern)
        .map_err(|err| PipelineError::Config(format!("asset pattern for `{root}`: {err}")))?;
      let paths = scan_assets(&self.config.common_path.join(root), &pattern, options.recurse)?;
      debug!(root, count = paths.len(), "scanned asset root");
      found.extend(paths.into_iter().map(|path| FoundAsset {
        root: root.to_string(),
        path,
      }));
    }
    Ok(found)
  }

  /// Record versions for loose assets under roots with versioning enabled.
  ///
  /// Returns the number of assets versioned.
  pub fn version_assets(&mut self) -> Result<usize> {
    let mut versioned = 0;
    for root in self.config.assets.roots() {
      let options = self.config.assets.options_for(root)?;
      if !options.version {
        continue;
      }
      let versioner: Versioner = options.versioner.parse()?;
      let pattern = Regex::new(&options.pattern)
        .map_err(|err| PipelineError::Config(format!("asset pattern for `{root}`: {err}")))?;
      let keys: Vec<String> = scan_assets(&self.config.common_path.join(root), &pattern, options.recurse)?
        .into_iter()
        .map(|path| {
          FoundAsset {
            root: root.to_string(),
            path,
          }
          .key()
        })
        .collect();
      self
        .versions
        .map_versions(versioner, &self.config.common_path, &keys)?;
      versioned += keys.len();
    }
    info!(versioned, "versioned loose assets");
    Ok(versioned)
  }

  /// Version tokens recorded so far.
  pub fn versions(&self) -> &VersionStore {
    &self.versions
  }

  /// Persist the version map.
  pub fn save_versions(&self, path: &Path, format: VersionFormat) -> Result<()> {
    self.versions.write(path, format)?;
    info!(path = %path.display(), entries = self.versions.len(), "saved versions");
    Ok(())
  }

  /// Merge a persisted version map into this manager's versions.
  pub fn load_versions(&mut self, path: &Path, format: VersionFormat) -> Result<()> {
    self.versions.read(path, format)?;
    info!(path = %path.display(), entries = self.versions.len(), "loaded versions");
    Ok(())
  }
}
