//! Version tokens for built bundles and loose assets.

mod codec;
mod versioners;

use std::path::Path;

use tracing::debug;

pub use codec::{VersionFormat, VersionMap};
pub use versioners::{TOKEN_LENGTH, Versioner};

use crate::error::Result;

/// Mapping from file key to its most recently computed version token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionStore {
  entries: VersionMap,
}

impl VersionStore {
  /// Create an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  /// Version each of `file_keys`, resolved against `common_path`, with `versioner`.
  pub fn map_versions<I, S>(&mut self, versioner: Versioner, common_path: &Path, file_keys: I) -> Result<()>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    for key in file_keys {
      let key = key.as_ref();
      let token = versioner.version_file(&common_path.join(key))?;
      self.record(key, token);
    }
    Ok(())
  }

  /// Replace the token stored for `key`.
  pub fn record(&mut self, key: impl Into<String>, token: impl Into<String>) {
    let key = key.into();
    let token = token.into();
    debug!(%key, %token, "recorded version");
    self.entries.insert(key, token);
  }

  /// Token recorded for `key`.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.entries.get(key).map(String::as_str)
  }

  /// Entries ordered by key.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .entries
      .iter()
      .map(|(key, token)| (key.as_str(), token.as_str()))
  }

  /// Number of recorded entries.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when nothing has been recorded.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Persist the store in `format`.
  pub fn write(&self, path: &Path, format: VersionFormat) -> Result<()> {
    format.write(&self.entries, path)
  }

  /// Merge entries read from `path`; entries read replace existing ones.
  pub fn read(&mut self, path: &Path, format: VersionFormat) -> Result<()> {
    let loaded = format.read(path)?;
    self.entries.extend(loaded);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::tempdir;

  #[test]
  fn map_versions_records_every_key() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("img")).unwrap();
    fs::write(dir.path().join("img/a.png"), "abc").unwrap();
    fs::write(dir.path().join("img/b.png"), "abd").unwrap();

    let mut store = VersionStore::new();
    store
      .map_versions(Versioner::Sha1Sum, dir.path(), ["img/a.png", "img/b.png"])
      .unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.get("img/a.png"), Some("a9993e36"));
    assert_ne!(store.get("img/a.png"), store.get("img/b.png"));
  }

  #[test]
  fn record_replaces_stale_tokens() {
    let mut store = VersionStore::new();
    store.record("css/site.css", "old");
    store.record("css/site.css", "new");

    assert_eq!(store.get("css/site.css"), Some("new"));
    assert_eq!(store.len(), 1);
  }

  #[cfg(feature = "json")]
  #[test]
  fn read_merges_over_existing_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("versions.json");
    fs::write(&path, r#"{"a.css": "fresh", "b.js": "1"}"#).unwrap();

    let mut store = VersionStore::new();
    store.record("a.css", "stale");
    store.record("c.js", "kept");
    store.read(&path, VersionFormat::Json).unwrap();

    let entries: Vec<(&str, &str)> = store.iter().collect();
    assert_eq!(entries, vec![("a.css", "fresh"), ("b.js", "1"), ("c.js", "kept")]);
  }
}
