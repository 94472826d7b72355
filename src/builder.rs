//! Build orchestrator that turns every bundle of a graph into one output file.

use std::fs;
use std::io;
use std::path::Path;

use same_file::is_same_file;
use tracing::{debug, info, warn};

use crate::asset_paths::{BaseUrlRotation, is_absolute_url};
use crate::bundle::{Minifier, StylesheetRewriter, combine_files};
use crate::config::AssetConfig;
use crate::error::{PipelineError, Result};
use crate::graph::BundleGraph;
use crate::models::{BuildReport, BuiltBundle, Kind};
use crate::resolver::{Clock, cache_bust_param};
use crate::versions::{VersionStore, Versioner};

/// Combines, minifies, rewrites and versions the bundles of one graph.
pub struct BundleBuilder<'a> {
  config: &'a AssetConfig,
  rotation: &'a BaseUrlRotation,
  minifier: &'a dyn Minifier,
  clock: &'a dyn Clock,
  rewriter: &'a StylesheetRewriter,
}

impl<'a> BundleBuilder<'a> {
  /// Create a builder borrowing the manager's collaborators.
  pub fn new(
    config: &'a AssetConfig,
    rotation: &'a BaseUrlRotation,
    minifier: &'a dyn Minifier,
    clock: &'a dyn Clock,
    rewriter: &'a StylesheetRewriter,
  ) -> Self {
    Self {
      config,
      rotation,
      minifier,
      clock,
      rewriter,
    }
  }

  /// Build every declared bundle of `graph`, one at a time in declaration order.
  ///
  /// A failing bundle is reported and skipped; bundles built before or after
  /// it are unaffected.
  pub fn build_graph(&self, graph: &BundleGraph, versions: &mut VersionStore) -> BuildReport {
    let mut report = BuildReport::default();
    for key in graph.keys() {
      match self.build_bundle(graph, key, versions) {
        Ok(built) => report.built.push(built),
        Err(err) => {
          warn!(kind = %graph.kind(), key, error = %err, "bundle failed");
          report.failures.push((key.to_string(), err));
        }
      }
    }
    info!(
      kind = %graph.kind(),
      built = report.built.len(),
      failed = report.failures.len(),
      "built bundles"
    );
    report
  }

  /// Build one bundle and return where it was written.
  pub fn build_bundle(&self, graph: &BundleGraph, key: &str, versions: &mut VersionStore) -> Result<BuiltBundle> {
    let kind = graph.kind();
    let settings = self
      .config
      .kind(kind)
      .ok_or_else(|| PipelineError::Config(format!("{kind} assets cannot be bundled")))?;
    let versioner = if settings.version {
      Some(settings.versioner.parse::<Versioner>()?)
    } else {
      None
    };

    let leaves = graph.resolve(key)?;
    let local: Vec<&str> = leaves
      .iter()
      .map(String::as_str)
      .filter(|leaf| {
        let remote = is_absolute_url(leaf);
        if remote {
          debug!(key, leaf, "skipping remote member while combining");
        }
        !remote
      })
      .collect();

    let mut buffer = combine_files(&self.config.common_path, &local, &self.config.delimiter)?;
    if settings.minify {
      buffer = self
        .minifier
        .minify(kind, &buffer)
        .map_err(|err| PipelineError::MinificationFailed {
          key: key.to_string(),
          kind,
          reason: format!("{err:#}"),
        })?;
    }

    let output = self.config.build_path.join(key);
    if let Some(parent) = output.parent() {
      fs::create_dir_all(parent).map_err(|err| PipelineError::io(parent, err))?;
    }
    self.ensure_not_a_source(&output, &local)?;
    fs::write(&output, &buffer).map_err(|err| PipelineError::io(&output, err))?;

    if kind == Kind::Css {
      let cache_bust = self.config.debug.then(|| cache_bust_param(self.clock));
      let rewritten = self
        .rewriter
        .rewrite_file(&output, key, self.rotation, cache_bust.as_deref())?;
      debug!(key, rewritten, "rewrote stylesheet references");
    }

    let version = match versioner {
      Some(versioner) => {
        let token = versioner.version_file(&output)?;
        versions.record(key, token.clone());
        Some(token)
      }
      None => None,
    };

    info!(%kind, key, leaves = local.len(), output = %output.display(), "wrote bundle");
    Ok(BuiltBundle {
      kind,
      key: key.to_string(),
      output,
      leaf_count: local.len(),
      version,
    })
  }

  fn ensure_not_a_source(&self, output: &Path, leaves: &[&str]) -> Result<()> {
    if !output.exists() {
      return Ok(());
    }
    for leaf in leaves {
      let source = self.config.common_path.join(leaf);
      if is_same_file(&source, output).unwrap_or(false) {
        return Err(PipelineError::io(
          output,
          io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("bundle output would overwrite its own source `{leaf}`"),
          ),
        ));
      }
    }
    Ok(())
  }
}
