//! Error taxonomy shared by every stage of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Kind;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures raised while resolving, building or addressing bundles.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// Bundle resolution re-entered a bundle on the current path or ran past the depth bound.
  #[error("bundle `{key}` could not be resolved: {chain} (is the bundle map cyclic?)")]
  CycleOrDepthExceeded {
    /// Bundle key that was being resolved.
    key: String,
    /// Expansion chain leading to the failure, joined with ` -> `.
    chain: String,
  },

  /// A bundle key was requested that the graph does not declare.
  #[error("unknown {kind} bundle `{key}`")]
  UnknownBundle {
    /// Kind of graph that was queried.
    kind: Kind,
    /// Requested key.
    key: String,
  },

  /// The external minifier exited unsuccessfully or its pipe broke.
  #[error("minifying {kind} bundle `{key}` failed: {reason}")]
  MinificationFailed {
    /// Bundle key being minified.
    key: String,
    /// Kind tag handed to the minifier.
    kind: Kind,
    /// Description of the failure.
    reason: String,
  },

  /// Reading, writing or creating directories failed.
  #[error("i/o error at {}: {source}", path.display())]
  BuildIo {
    /// Path involved in the failed operation.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },

  /// A versioning strategy or codec name is not recognised.
  #[error("unknown versioner or codec `{name}`")]
  UnknownVersionerOrCodec {
    /// Requested name.
    name: String,
  },

  /// A recognised codec whose cargo feature was not compiled in.
  #[error("version codec `{format}` is not available in this build (enable the `{format}` feature)")]
  CodecUnavailable {
    /// Codec name.
    format: &'static str,
  },

  /// A version map could not be encoded or decoded.
  #[error("failed to process version map {}: {reason}", path.display())]
  Codec {
    /// File being read or written.
    path: PathBuf,
    /// Description of the failure.
    reason: String,
  },

  /// Configuration could not be parsed or failed validation.
  #[error("invalid configuration: {0}")]
  Config(String),
}

impl PipelineError {
  /// Wrap an I/O error together with the path it occurred at.
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::BuildIo {
      path: path.into(),
      source,
    }
  }
}
