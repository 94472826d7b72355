//! Data structures shared between the builder, resolver and manager.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Asset kind tagging a bundle graph and selecting its configuration subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
  /// Stylesheets.
  Css,
  /// Scripts.
  Js,
  /// Loose assets such as images; never bundled.
  Generic,
}

impl Kind {
  /// Bundled kinds, in build order.
  pub const BUNDLED: [Kind; 2] = [Kind::Css, Kind::Js];

  /// Lowercase tag handed to minifiers and used in messages.
  pub fn as_str(self) -> &'static str {
    match self {
      Kind::Css => "css",
      Kind::Js => "js",
      Kind::Generic => "generic",
    }
  }
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Kind {
  type Err = PipelineError;

  fn from_str(value: &str) -> Result<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "css" => Ok(Kind::Css),
      "js" => Ok(Kind::Js),
      "generic" => Ok(Kind::Generic),
      other => Err(PipelineError::Config(format!("unknown asset kind `{other}`"))),
    }
  }
}

/// A bundle written to the build location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltBundle {
  /// Kind of the graph the bundle came from.
  pub kind: Kind,
  /// Bundle key, also the output path relative to the build root.
  pub key: String,
  /// Absolute or build-root-joined path of the written file.
  pub output: PathBuf,
  /// Number of leaf files concatenated into the bundle.
  pub leaf_count: usize,
  /// Version token recorded for the bundle, when versioning is enabled.
  pub version: Option<String>,
}

/// Outcome of building one or more bundle graphs.
///
/// Failures are collected per bundle so one broken bundle does not hide the
/// bundles that did build.
#[derive(Debug, Default)]
pub struct BuildReport {
  /// Bundles written successfully, in build order.
  pub built: Vec<BuiltBundle>,
  /// Bundle keys that failed together with their error.
  pub failures: Vec<(String, PipelineError)>,
}

impl BuildReport {
  /// Returns `true` when every bundle built.
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }

  /// Fold another report into this one.
  pub fn extend(&mut self, other: BuildReport) {
    self.built.extend(other.built);
    self.failures.extend(other.failures);
  }

  /// Convert into a result, surfacing the first failure.
  pub fn into_result(mut self) -> Result<Vec<BuiltBundle>> {
    if self.failures.is_empty() {
      Ok(self.built)
    } else {
      Err(self.failures.remove(0).1)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_kind_tags_case_insensitively() {
    assert_eq!("CSS".parse::<Kind>().unwrap(), Kind::Css);
    assert_eq!(" js ".parse::<Kind>().unwrap(), Kind::Js);
    assert!("sass".parse::<Kind>().is_err());
  }

  #[test]
  fn report_surfaces_first_failure() {
    let mut report = BuildReport::default();
    report.failures.push(("a.css".into(), PipelineError::Config("first".into())));
    report.failures.push(("b.css".into(), PipelineError::Config("second".into())));

    let err = report.into_result().unwrap_err();
    assert!(err.to_string().contains("first"));
  }
}
