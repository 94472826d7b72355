//! Stylesheet helpers anchoring relative `url(...)` references to public URLs.

use std::fs;
use std::path::Path;

use regex::bytes::{Captures, Regex};
use tracing::{debug, warn};

use crate::asset_paths::{
  BaseUrlRotation, append_query, base_path, is_external_reference, join_url, normalize_relative,
  parent_dir,
};
use crate::error::{PipelineError, Result};

/// Rewrites `url(...)` references in built stylesheets.
#[derive(Debug, Clone)]
pub struct StylesheetRewriter {
  pattern: Regex,
}

impl StylesheetRewriter {
  /// Compile the configured reference pattern; it must name a `filename` group.
  pub fn new(pattern: &str) -> Result<Self> {
    let pattern = Regex::new(pattern)
      .map_err(|err| PipelineError::Config(format!("`css_url_pattern`: {err}")))?;
    if !pattern.capture_names().flatten().any(|name| name == "filename") {
      return Err(PipelineError::Config(
        "`css_url_pattern` must define a `filename` group".into(),
      ));
    }
    Ok(Self { pattern })
  }

  /// Rewrite every reference in `css` for a stylesheet built at `bundle_key`.
  ///
  /// Relative references are resolved against the bundle's directory; rooted
  /// references lose any configured base-URL path and are re-based as-is. Each
  /// rewritten reference consumes one base URL from `rotation`. `cache_bust` is
  /// appended as a query parameter when present. Bytes outside the matched
  /// references are kept as they are, whatever their encoding. Returns the new
  /// content and the number of references rewritten.
  pub fn rewrite(
    &self,
    css: &[u8],
    bundle_key: &str,
    rotation: &BaseUrlRotation,
    cache_bust: Option<&str>,
  ) -> (Vec<u8>, usize) {
    let dir = parent_dir(bundle_key);
    let mut rewritten = 0;
    let mut output = Vec::with_capacity(css.len());

    for line in css.split_inclusive(|byte| *byte == b'\n') {
      let replaced = self.pattern.replace_all(line, |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or(&[][..], |m| m.as_bytes()).to_vec();
        let Some(filename) = caps
          .name("filename")
          .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
          .map(str::trim)
        else {
          return whole;
        };
        if is_external_reference(filename) {
          debug!(filename, "leaving external stylesheet reference");
          return whole;
        }

        let base = rotation.next_base();
        let mut url = if filename.starts_with('/') {
          join_url(base, strip_base_path(filename, rotation.bases()))
        } else {
          let (relative, escaped) = normalize_relative(dir, filename);
          if escaped {
            warn!(bundle_key, filename, resolved = %relative, "stylesheet reference climbs above the asset root");
          }
          join_url(base, &relative)
        };
        if let Some(param) = cache_bust {
          url = append_query(&url, param);
        }
        if let Some(fragment) = caps.name("fragment") {
          url.push_str(&String::from_utf8_lossy(fragment.as_bytes()));
        }

        rewritten += 1;
        format!("url(\"{url}\")").into_bytes()
      });
      output.extend_from_slice(&replaced);
    }

    (output, rewritten)
  }

  /// Rewrite the stylesheet at `path` in place.
  pub fn rewrite_file(
    &self,
    path: &Path,
    bundle_key: &str,
    rotation: &BaseUrlRotation,
    cache_bust: Option<&str>,
  ) -> Result<usize> {
    let css = fs::read(path).map_err(|err| PipelineError::io(path, err))?;
    let (updated, rewritten) = self.rewrite(&css, bundle_key, rotation, cache_bust);
    if rewritten > 0 {
      fs::write(path, updated).map_err(|err| PipelineError::io(path, err))?;
    }
    Ok(rewritten)
  }
}

/// Drop the first configured base-URL path that prefixes `reference`.
fn strip_base_path<'a>(reference: &'a str, bases: &[String]) -> &'a str {
  bases
    .iter()
    .map(|base| base_path(base))
    .filter(|path| !path.is_empty())
    .find_map(|path| {
      reference
        .strip_prefix(path)
        .filter(|rest| rest.starts_with('/'))
    })
    .unwrap_or(reference)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AssetConfig;
  use tempfile::tempdir;

  fn rewriter() -> StylesheetRewriter {
    StylesheetRewriter::new(&AssetConfig::default().css_url_pattern).unwrap()
  }

  fn rotation(bases: &[&str]) -> BaseUrlRotation {
    BaseUrlRotation::new(bases.iter().map(|base| base.to_string()).collect()).unwrap()
  }

  fn rewrite(css: &str, bundle_key: &str, rotation: &BaseUrlRotation, cache_bust: Option<&str>) -> (String, usize) {
    let (bytes, count) = rewriter().rewrite(css.as_bytes(), bundle_key, rotation, cache_bust);
    (String::from_utf8(bytes).unwrap(), count)
  }

  #[test]
  fn anchors_relative_references_at_bundle_directory() {
    let (text, count) = rewrite(
      "body { background: url('../images/foo.png'); }\n",
      "css/styles.css",
      &rotation(&["/media"]),
      None,
    );

    assert_eq!(count, 1);
    assert_eq!(text, "body { background: url(\"/media/images/foo.png\"); }\n");
  }

  #[test]
  fn rooted_references_are_rebased_identically() {
    let (text, _) = rewrite(
      "a { background: url(/media/images/foo.png) }",
      "css/styles.css",
      &rotation(&["/media"]),
      None,
    );

    assert_eq!(text, "a { background: url(\"/media/images/foo.png\") }");
  }

  #[test]
  fn debug_builds_append_cache_busting_before_fragment() {
    let (text, _) = rewrite(
      "i { background: url(\"icons.svg#arrow\") }",
      "css/site.css",
      &rotation(&["/media"]),
      Some("t=1700000000"),
    );

    assert_eq!(text, "i { background: url(\"/media/css/icons.svg?t=1700000000#arrow\") }");
  }

  #[test]
  fn each_reference_consumes_one_base_url() {
    let css = "a { background: url(a.png) }\nb { background: url(b.png) } c { background: url(c.png) }\n";
    let (text, count) = rewrite(css, "site.css", &rotation(&["http://a", "http://b"]), None);

    assert_eq!(count, 3);
    assert!(text.contains("url(\"http://a/a.png\")"));
    assert!(text.contains("url(\"http://b/b.png\")"));
    assert!(text.contains("url(\"http://a/c.png\")"));
  }

  #[test]
  fn external_references_are_untouched() {
    let rotation = rotation(&["http://a", "http://b"]);
    let css = "a { background: url(https://cdn.example.com/x.png) }";
    let (text, count) = rewrite(css, "css/site.css", &rotation, None);

    assert_eq!(count, 0);
    assert_eq!(text, css);
    assert_eq!(rotation.next_base(), "http://a");
  }

  #[test]
  fn rewrites_files_in_place() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("site.css");
    fs::write(&path, "a { background: url(img/x.gif) }").unwrap();

    let count = rewriter()
      .rewrite_file(&path, "css/site.css", &rotation(&["/static"]), None)
      .unwrap();

    assert_eq!(count, 1);
    assert_eq!(
      fs::read_to_string(&path).unwrap(),
      "a { background: url(\"/static/css/img/x.gif\") }"
    );
  }

  #[test]
  fn latin1_bytes_around_references_survive() {
    let css = b"/* caf\xe9 */\na { background: url(bg.png) }\n";
    let (bytes, count) = rewriter().rewrite(css, "css/site.css", &rotation(&["/m"]), None);

    assert_eq!(count, 1);
    assert_eq!(bytes, b"/* caf\xe9 */\na { background: url(\"/m/css/bg.png\") }\n");
  }

  #[test]
  fn references_above_the_root_are_clamped() {
    let (text, count) = rewrite("a { background: url(../../../x.png) }", "css/a.css", &rotation(&["/m"]), None);

    assert_eq!(count, 1);
    assert_eq!(text, "a { background: url(\"/m/x.png\") }");
  }

  #[test]
  fn rejects_patterns_without_filename_group() {
    assert!(StylesheetRewriter::new(r"url\((.+)\)").is_err());
  }
}
