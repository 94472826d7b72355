//! Configuration loader describing bundle maps, build layout and URL generation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{PipelineError, Result};
use crate::models::Kind;

const DEFAULT_CONFIG_FILES: [&str; 3] = [
  "assets.config.json",
  "assets.config.yaml",
  "assets.config.yml",
];

/// Default bound on nested bundle inclusion.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
  /// Serve individual, cache-busted source files instead of built bundles.
  pub debug: bool,
  /// Root that leaf file keys are relative to.
  pub common_path: PathBuf,
  /// Root that built bundles are written under.
  pub build_path: PathBuf,
  /// Base URLs rotated across successive URL generations.
  pub base_urls: Vec<String>,
  /// Banner written before each concatenated file; `{name}` is the file's base name.
  pub delimiter: String,
  /// Tool path substituted for `{minifier}` in minify commands.
  pub minifier_path: String,
  /// Pattern locating `url(...)` references in stylesheets.
  pub css_url_pattern: String,
  /// Maximum nesting depth accepted while resolving bundles.
  pub max_depth: usize,
  /// Stylesheet bundles.
  pub css: KindConfig,
  /// Script bundles.
  pub js: KindConfig,
  /// Loose asset discovery.
  pub assets: AssetsConfig,
}

/// Kind-specific settings consulted by bundle graphs of that kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KindConfig {
  /// Bundle key to ordered member keys.
  pub map: IndexMap<String, Vec<String>>,
  /// Pipe combined bundles through the minifier.
  pub minify: bool,
  /// Minifier command line template.
  pub minify_cmd: String,
  /// Record a version token for every built bundle.
  pub version: bool,
  /// Versioning strategy name.
  pub versioner: String,
  /// Markup template for one URL.
  pub html: String,
  /// Fallback values for template placeholders.
  pub html_defaults: BTreeMap<String, String>,
}

/// Loose asset roots and their discovery options.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetsConfig {
  /// Root directory to partial options overriding `default_options`; `false`
  /// disables a root.
  pub paths: IndexMap<String, Value>,
  /// Options applied to every root.
  pub default_options: AssetOptions,
}

/// Discovery and versioning options for one asset root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssetOptions {
  /// Regex matched against forward-slash paths relative to the root.
  pub pattern: String,
  /// Descend into subdirectories.
  pub recurse: bool,
  /// Record versions for discovered assets.
  pub version: bool,
  /// Versioning strategy name.
  pub versioner: String,
}

impl AssetsConfig {
  /// Configured roots, skipping any disabled with `false`.
  pub fn roots(&self) -> impl Iterator<Item = &str> {
    self
      .paths
      .iter()
      .filter(|(_, options)| !matches!(options, Value::Bool(false)))
      .map(|(root, _)| root.as_str())
  }

  /// Options for a configured root, deep-merged over the defaults.
  pub fn options_for(&self, root: &str) -> Result<AssetOptions> {
    let base = serde_json::to_value(&self.default_options)
      .map_err(|err| PipelineError::Config(err.to_string()))?;
    let overlay = self.paths.get(root).cloned().unwrap_or(Value::Null);
    let merged = match overlay {
      Value::Null => base,
      overlay => merge_config(base, overlay),
    };
    serde_json::from_value(merged)
      .map_err(|err| PipelineError::Config(format!("asset path `{root}`: {err}")))
  }
}

impl Default for AssetConfig {
  fn default() -> Self {
    // The built-in defaults always deserialize.
    serde_json::from_value(Self::defaults_value()).unwrap_or_else(|err| {
      unreachable!("built-in configuration defaults are invalid: {err}")
    })
  }
}

impl AssetConfig {
  /// Built-in defaults as a JSON tree, ready to be merged with overrides.
  pub fn defaults_value() -> Value {
    json!({
      "debug": false,
      "common_path": ".",
      "build_path": "build",
      "base_urls": ["/media"],
      "delimiter": "\n/* BEGIN {name} */\n",
      "minifier_path": "yuicompressor-2.4.2.jar",
      "css_url_pattern":
        r#"url\(\s*['"]?(?P<filename>[^'"()?#\s]+\.[A-Za-z0-9]{2,5})(?P<fragment>#[\w-]+)?['"]?\s*\)"#,
      "max_depth": DEFAULT_MAX_DEPTH,
      "css": {
        "map": {},
        "minify": false,
        "minify_cmd": "java -jar {minifier} --type css",
        "version": false,
        "versioner": "SHA1Sum",
        "html": r#"<link rel="{rel}" type="{type}" href="{href}" media="{media}"{?title}{?class} />"#,
        "html_defaults": {
          "rel": "stylesheet",
          "type": "text/css",
          "media": "all",
          "title": "",
          "class": ""
        }
      },
      "js": {
        "map": {},
        "minify": false,
        "minify_cmd": "java -jar {minifier} --type js",
        "version": false,
        "versioner": "SHA1Sum",
        "html": r#"<script type="{type}" charset="{charset}" src="{src}"></script>"#,
        "html_defaults": {
          "type": "text/javascript",
          "charset": "utf-8"
        }
      },
      "assets": {
        "paths": { ".": {} },
        "default_options": {
          "pattern": r"\.(png|jpg|jpeg|gif|svg|swf|ico|woff2?)$",
          "recurse": true,
          "version": false,
          "versioner": "SHA1Sum"
        }
      }
    })
  }

  /// Deep-merge `overrides` over the built-in defaults and validate the result.
  pub fn from_overrides(overrides: Value) -> Result<Self> {
    let merged = merge_config(Self::defaults_value(), overrides);
    let config: Self =
      serde_json::from_value(merged).map_err(|err| PipelineError::Config(err.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Read configuration overrides from a JSON or YAML file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
    let overrides = parse_overrides(path, &content)?;
    Self::from_overrides(overrides)
  }

  /// Look for a configuration file in `dir`, falling back to defaults when none exists.
  pub fn discover(dir: &Path) -> Result<Self> {
    for name in DEFAULT_CONFIG_FILES {
      let candidate = dir.join(name);
      if candidate.is_file() {
        return Self::from_path(&candidate);
      }
    }
    let config = Self::default();
    config.validate()?;
    Ok(config)
  }

  /// Settings for a bundled kind; generic assets have none.
  pub fn kind(&self, kind: Kind) -> Option<&KindConfig> {
    match kind {
      Kind::Css => Some(&self.css),
      Kind::Js => Some(&self.js),
      Kind::Generic => None,
    }
  }

  /// Check invariants that deserialization cannot express.
  pub fn validate(&self) -> Result<()> {
    if self.base_urls.is_empty() {
      return Err(PipelineError::Config("`base_urls` must not be empty".into()));
    }

    let url_pattern = Regex::new(&self.css_url_pattern)
      .map_err(|err| PipelineError::Config(format!("`css_url_pattern`: {err}")))?;
    if !url_pattern.capture_names().flatten().any(|name| name == "filename") {
      return Err(PipelineError::Config(
        "`css_url_pattern` must define a `filename` group".into(),
      ));
    }

    if self.max_depth == 0 {
      return Err(PipelineError::Config("`max_depth` must be at least 1".into()));
    }

    for root in self.assets.roots() {
      let options = self.assets.options_for(root)?;
      Regex::new(&options.pattern).map_err(|err| {
        PipelineError::Config(format!("asset pattern for `{root}`: {err}"))
      })?;
    }

    Ok(())
  }
}

fn parse_overrides(path: &Path, content: &str) -> Result<Value> {
  let extension = path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(str::to_ascii_lowercase);

  match extension.as_deref() {
    Some("yaml" | "yml") => parse_yaml(path, content),
    _ => serde_json::from_str(content)
      .map_err(|err| PipelineError::Config(format!("{}: {err}", path.display()))),
  }
}

#[cfg(feature = "yaml")]
fn parse_yaml(path: &Path, content: &str) -> Result<Value> {
  serde_yaml::from_str(content)
    .map_err(|err| PipelineError::Config(format!("{}: {err}", path.display())))
}

#[cfg(not(feature = "yaml"))]
fn parse_yaml(_path: &Path, _content: &str) -> Result<Value> {
  Err(PipelineError::CodecUnavailable { format: "yaml" })
}

/// Recursively overlay `overlay` onto `base`.
///
/// Objects merge key by key; any other overlay value replaces the base value.
/// Keys present on only one side are kept.
pub fn merge_config(base: Value, overlay: Value) -> Value {
  match (base, overlay) {
    (Value::Object(mut base_map), Value::Object(overlay_map)) => {
      for (key, overlay_value) in overlay_map {
        match base_map.get_mut(&key) {
          Some(slot) => {
            let base_value = slot.take();
            *slot = merge_config(base_value, overlay_value);
          }
          None => {
            base_map.insert(key, overlay_value);
          }
        }
      }
      Value::Object(base_map)
    }
    (_, overlay) => overlay,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn deep_merge_keeps_sibling_keys() {
    let merged = merge_config(json!({"a": {"x": 1}}), json!({"a": {"y": 2}}));
    assert_eq!(merged, json!({"a": {"x": 1, "y": 2}}));
  }

  #[test]
  fn deep_merge_replaces_scalars_and_arrays() {
    let merged = merge_config(
      json!({"a": 1, "list": [1, 2], "nested": {"keep": true, "swap": "old"}}),
      json!({"a": 2, "list": [3], "nested": {"swap": "new"}}),
    );
    assert_eq!(
      merged,
      json!({"a": 2, "list": [3], "nested": {"keep": true, "swap": "new"}})
    );
  }

  #[test]
  fn overrides_merge_into_kind_subtrees() {
    let config = AssetConfig::from_overrides(json!({
      "css": {"minify": true, "html_defaults": {"media": "screen"}},
    }))
    .unwrap();

    assert!(config.css.minify);
    assert_eq!(config.css.versioner, "SHA1Sum");
    assert_eq!(config.css.html_defaults["media"], "screen");
    assert_eq!(config.css.html_defaults["rel"], "stylesheet");
  }

  #[test]
  fn bundle_maps_keep_declaration_order() {
    let config = AssetConfig::from_overrides(json!({
      "js": {"map": {"z.js": ["a.js"], "a.js.bundle": ["b.js"], "m.js": []}},
    }))
    .unwrap();

    let keys: Vec<&str> = config.js.map.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z.js", "a.js.bundle", "m.js"]);
  }

  #[test]
  fn rejects_empty_base_urls() {
    let err = AssetConfig::from_overrides(json!({"base_urls": []})).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
  }

  #[test]
  fn rejects_url_pattern_without_filename_group() {
    let err = AssetConfig::from_overrides(json!({"css_url_pattern": r"url\((.*)\)"})).unwrap_err();
    assert!(err.to_string().contains("filename"));
  }

  #[test]
  fn asset_root_options_override_defaults() {
    let config = AssetConfig::from_overrides(json!({
      "assets": {"paths": {"img": {"recurse": false}}},
    }))
    .unwrap();

    let options = config.assets.options_for("img").unwrap();
    assert!(!options.recurse);
    assert_eq!(options.versioner, "SHA1Sum");
    assert_eq!(config.assets.options_for(".").unwrap(), config.assets.default_options);
  }

  #[test]
  fn discover_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let config = AssetConfig::discover(dir.path()).unwrap();
    assert_eq!(config.base_urls, vec!["/media".to_string()]);
    assert!(!config.debug);
  }

  #[test]
  fn discover_reads_json_file() {
    let dir = tempdir().unwrap();
    fs::write(
      dir.path().join("assets.config.json"),
      r#"{"debug": true, "base_urls": ["http://a", "http://b"]}"#,
    )
    .unwrap();

    let config = AssetConfig::discover(dir.path()).unwrap();
    assert!(config.debug);
    assert_eq!(config.base_urls.len(), 2);
    assert_eq!(config.build_path, PathBuf::from("build"));
  }

  #[cfg(feature = "yaml")]
  #[test]
  fn reads_yaml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("assets.config.yaml");
    fs::write(&path, "css:\n  map:\n    css/site.css:\n      - css/reset.css\n").unwrap();

    let config = AssetConfig::from_path(&path).unwrap();
    assert_eq!(config.css.map["css/site.css"], vec!["css/reset.css".to_string()]);
  }
}
