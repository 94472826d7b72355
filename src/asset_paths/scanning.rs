//! Directory scanning for loose assets such as images and fonts.

use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};

/// Collect files under `root` whose forward-slash relative path matches `pattern`.
///
/// Hidden files and directories are skipped. Without `recursive` only the
/// immediate children of `root` are considered. Results are sorted.
pub fn scan_assets(root: &Path, pattern: &Regex, recursive: bool) -> Result<Vec<String>> {
  let mut walker = WalkDir::new(root).min_depth(1);
  if !recursive {
    walker = walker.max_depth(1);
  }

  let mut matches = Vec::new();
  let entries = walker
    .into_iter()
    .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'));
  for entry in entries {
    let entry = entry.map_err(|err| {
      let path = err.path().unwrap_or(root).to_path_buf();
      let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
      PipelineError::io(path, source)
    })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let Ok(relative) = entry.path().strip_prefix(root) else {
      continue;
    };
    let relative = relative.to_string_lossy().replace('\\', "/");
    if pattern.is_match(&relative) {
      matches.push(relative);
    }
  }

  matches.sort();
  Ok(matches)
}
