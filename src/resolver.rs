//! Public URLs and markup for bundles and assets.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::Utc;
use regex::{Captures, Regex};

use crate::asset_paths::{BaseUrlRotation, append_query, is_absolute_url, join_url};
use crate::config::AssetConfig;
use crate::error::{PipelineError, Result};
use crate::graph::BundleGraph;
use crate::versions::VersionStore;

/// Source of the wall-clock reading used for debug cache-busting.
pub trait Clock {
  /// Current time in unix seconds.
  fn now(&self) -> i64;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> i64 {
    Utc::now().timestamp()
  }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
  fn now(&self) -> i64 {
    self.0
  }
}

/// Query parameter appended to URLs in debug mode.
pub fn cache_bust_param(clock: &dyn Clock) -> String {
  format!("t={}", clock.now())
}

/// Answers "which URLs or markup represent this key" for one manager.
pub struct UrlResolver<'a> {
  config: &'a AssetConfig,
  rotation: &'a BaseUrlRotation,
  clock: &'a dyn Clock,
  versions: &'a VersionStore,
}

impl<'a> UrlResolver<'a> {
  /// Borrow the pieces of a manager needed to generate URLs.
  pub fn new(
    config: &'a AssetConfig,
    rotation: &'a BaseUrlRotation,
    clock: &'a dyn Clock,
    versions: &'a VersionStore,
  ) -> Self {
    Self {
      config,
      rotation,
      clock,
      versions,
    }
  }

  /// Public URL for a single key.
  ///
  /// Absolute `http(s)` keys are returned as-is; everything else is prefixed
  /// with the next base URL. Debug mode appends the current time, otherwise a
  /// recorded version token is appended when one exists.
  pub fn url_for(&self, key: &str) -> String {
    let url = if is_absolute_url(key) {
      key.to_string()
    } else {
      join_url(self.rotation.next_base(), key)
    };

    if self.config.debug {
      append_query(&url, &cache_bust_param(self.clock))
    } else if let Some(token) = self.versions.get(key) {
      append_query(&url, &format!("v={token}"))
    } else {
      url
    }
  }

  /// URLs referencing a bundle.
  ///
  /// Debug mode yields one URL per resolved leaf; production yields the built
  /// bundle's URL and requires the key to be declared.
  pub fn urls_for(&self, graph: &BundleGraph, key: &str) -> Result<Vec<String>> {
    if self.config.debug {
      let leaves = graph.resolve(key)?;
      return Ok(leaves.iter().map(|leaf| self.url_for(leaf)).collect());
    }

    if !graph.contains(key) {
      return Err(PipelineError::UnknownBundle {
        kind: graph.kind(),
        key: key.to_string(),
      });
    }
    Ok(vec![self.url_for(key)])
  }

  /// Markup referencing a bundle, one rendered template per URL.
  ///
  /// `overrides` replace the kind's template defaults field by field. Lines are
  /// joined with `delimiter`, or a newline when absent.
  pub fn markup_for(
    &self,
    graph: &BundleGraph,
    key: &str,
    overrides: &BTreeMap<String, String>,
    delimiter: Option<&str>,
  ) -> Result<String> {
    let kind = graph.kind();
    let settings = self
      .config
      .kind(kind)
      .ok_or_else(|| PipelineError::Config(format!("no markup template for {kind} assets")))?;

    let mut fields = settings.html_defaults.clone();
    fields.extend(overrides.iter().map(|(name, value)| (name.clone(), value.clone())));

    let lines: Vec<String> = self
      .urls_for(graph, key)?
      .into_iter()
      .map(|url| {
        let mut fields = fields.clone();
        for name in ["href", "src", "url"] {
          fields.insert(name.to_string(), url.clone());
        }
        render_template(&settings.html, &fields)
      })
      .collect();

    Ok(lines.join(delimiter.unwrap_or("\n")))
  }
}

fn placeholder_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"\{(\?)?([A-Za-z_][A-Za-z0-9_-]*)\}").expect("invalid placeholder regex")
  })
}

/// Fill `{field}` placeholders with attribute-escaped values.
///
/// `{?field}` renders ` field="value"` when the value is non-empty and nothing
/// otherwise. Unknown fields render empty.
pub fn render_template(template: &str, fields: &BTreeMap<String, String>) -> String {
  placeholder_pattern()
    .replace_all(template, |caps: &Captures<'_>| {
      let optional = caps.get(1).is_some();
      let name = &caps[2];
      let value = fields.get(name).map(String::as_str).unwrap_or_default();
      match (optional, value.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!(" {name}=\"{}\"", escape_attribute(value)),
        (false, _) => escape_attribute(value),
      }
    })
    .into_owned()
}

fn escape_attribute(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for ch in value.chars() {
    match ch {
      '&' => escaped.push_str("&amp;"),
      '"' => escaped.push_str("&quot;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      other => escaped.push(other),
    }
  }
  escaped
}
