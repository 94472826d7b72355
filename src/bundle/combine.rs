//! Concatenation of resolved leaf files into one bundle buffer.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{PipelineError, Result};

/// Render the per-file delimiter, substituting `{name}` with the file's base name.
pub fn render_delimiter(template: &str, name: &str) -> String {
  template.replace("{name}", name)
}

/// Read each leaf relative to `common_path` and join them, each preceded by its delimiter.
///
/// Leaf contents are copied byte for byte; no text encoding is assumed.
pub fn combine_files<S: AsRef<str>>(common_path: &Path, leaves: &[S], delimiter: &str) -> Result<Vec<u8>> {
  let mut buffer = Vec::new();
  for leaf in leaves {
    let leaf = leaf.as_ref();
    let path = common_path.join(leaf);
    let contents = fs::read(&path).map_err(|err| PipelineError::io(&path, err))?;
    let name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| leaf.to_string());

    debug!(leaf, bytes = contents.len(), "appending leaf");
    buffer.extend_from_slice(render_delimiter(delimiter, &name).as_bytes());
    buffer.extend_from_slice(&contents);
  }
  Ok(buffer)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn delimiters_carry_base_names() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("js/lib")).unwrap();
    fs::write(dir.path().join("js/lib/a.js"), "var a;").unwrap();
    fs::write(dir.path().join("js/b.js"), "var b;").unwrap();

    let combined = combine_files(dir.path(), &["js/lib/a.js", "js/b.js"], "\n/* BEGIN {name} */\n").unwrap();
    assert_eq!(combined, b"\n/* BEGIN a.js */\nvar a;\n/* BEGIN b.js */\nvar b;");
  }

  #[test]
  fn non_utf8_leaves_are_copied_verbatim() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.css"), b"/* caf\xe9 */ a{}").unwrap();

    let combined = combine_files(dir.path(), &["a.css"], "[{name}]").unwrap();
    assert_eq!(combined, b"[a.css]/* caf\xe9 */ a{}");
  }

  #[test]
  fn no_leaves_combine_to_empty_buffer() {
    let dir = tempdir().unwrap();
    let leaves: [&str; 0] = [];
    assert!(combine_files(dir.path(), &leaves, "{name}").unwrap().is_empty());
  }

  #[test]
  fn missing_leaf_names_its_path() {
    let dir = tempdir().unwrap();
    let err = combine_files(dir.path(), &["css/gone.css"], "{name}").unwrap_err();
    assert!(matches!(err, PipelineError::BuildIo { .. }));
    assert!(err.to_string().contains("gone.css"));
  }
}
