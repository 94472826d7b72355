//! Self-referential bundle maps and their flattening into leaf file keys.

use indexmap::IndexMap;

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{PipelineError, Result};
use crate::models::Kind;

/// Ordered mapping from bundle key to member keys.
///
/// A member that is itself a key of the graph is expanded in place; any other
/// member is a leaf file key emitted verbatim.
#[derive(Debug, Clone)]
pub struct BundleGraph {
  kind: Kind,
  bundles: IndexMap<String, Vec<String>>,
  max_depth: usize,
}

struct Frame<'a> {
  key: &'a str,
  members: &'a [String],
  next: usize,
}

impl BundleGraph {
  /// Create a graph of the given kind from declared bundles.
  pub fn new(kind: Kind, bundles: IndexMap<String, Vec<String>>) -> Self {
    Self {
      kind,
      bundles,
      max_depth: DEFAULT_MAX_DEPTH,
    }
  }

  /// Bound the nesting depth accepted by [`BundleGraph::resolve`].
  pub fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth.max(1);
    self
  }

  /// Kind tag selecting this graph's configuration subtree.
  pub fn kind(&self) -> Kind {
    self.kind
  }

  /// Returns `true` when `key` is a declared bundle.
  pub fn contains(&self, key: &str) -> bool {
    self.bundles.contains_key(key)
  }

  /// Declared bundle keys in declaration order.
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.bundles.keys().map(String::as_str)
  }

  /// Number of declared bundles.
  pub fn len(&self) -> usize {
    self.bundles.len()
  }

  /// Returns `true` when no bundles are declared.
  pub fn is_empty(&self) -> bool {
    self.bundles.is_empty()
  }

  /// Flatten `key` into its leaf file keys.
  ///
  /// Order follows declaration order with nested bundles expanded in place and
  /// duplicates preserved. A key that is not declared expands to itself, and an
  /// empty bundle expands to nothing. Re-entering a bundle already on the
  /// current expansion path, or nesting deeper than the configured bound, fails
  /// with [`PipelineError::CycleOrDepthExceeded`].
  pub fn resolve(&self, key: &str) -> Result<Vec<String>> {
    let Some(members) = self.bundles.get(key) else {
      return Ok(vec![key.to_string()]);
    };

    let mut leaves = Vec::new();
    let mut stack = vec![Frame {
      key,
      members,
      next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
      let members = frame.members;
      let Some(member) = members.get(frame.next) else {
        stack.pop();
        continue;
      };
      frame.next += 1;

      let Some((nested_key, nested_members)) = self.bundles.get_key_value(member) else {
        leaves.push(member.clone());
        continue;
      };
      let nested_key = nested_key.as_str();

      if stack.iter().any(|open| open.key == nested_key) {
        return Err(cycle_error(key, &stack, nested_key, "cycle"));
      }
      if stack.len() >= self.max_depth {
        return Err(cycle_error(key, &stack, nested_key, "depth limit exceeded"));
      }

      stack.push(Frame {
        key: nested_key,
        members: nested_members,
        next: 0,
      });
    }

    Ok(leaves)
  }

  /// Like [`BundleGraph::resolve`], but an undeclared key is an error.
  pub fn resolve_declared(&self, key: &str) -> Result<Vec<String>> {
    if !self.contains(key) {
      return Err(PipelineError::UnknownBundle {
        kind: self.kind,
        key: key.to_string(),
      });
    }
    self.resolve(key)
  }
}

fn cycle_error(root: &str, stack: &[Frame<'_>], offending: &str, reason: &str) -> PipelineError {
  let mut chain: Vec<&str> = stack.iter().map(|frame| frame.key).collect();
  chain.push(offending);
  PipelineError::CycleOrDepthExceeded {
    key: root.to_string(),
    chain: format!("{reason}: {}", chain.join(" -> ")),
  }
}
