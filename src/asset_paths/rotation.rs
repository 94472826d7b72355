use parking_lot::Mutex;

use crate::error::{PipelineError, Result};

/// Endless rotation over the configured base URLs.
///
/// One cursor is shared by everything that generates URLs for a manager, so
/// interleaved calls observe a continuing rotation rather than restarting.
#[derive(Debug)]
pub struct BaseUrlRotation {
  urls: Vec<String>,
  cursor: Mutex<usize>,
}

impl BaseUrlRotation {
  /// Create a rotation; at least one base URL is required.
  pub fn new(urls: Vec<String>) -> Result<Self> {
    if urls.is_empty() {
      return Err(PipelineError::Config("`base_urls` must not be empty".into()));
    }
    Ok(Self {
      urls,
      cursor: Mutex::new(0),
    })
  }

  /// Consume the next base URL.
  pub fn next_base(&self) -> &str {
    let mut cursor = self.cursor.lock();
    let index = *cursor;
    *cursor = (index + 1) % self.urls.len();
    &self.urls[index]
  }

  /// All configured base URLs in rotation order.
  pub fn bases(&self) -> &[String] {
    &self.urls
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cycles_through_bases_in_order() {
    let rotation =
      BaseUrlRotation::new(vec!["http://a".into(), "http://b".into(), "http://c".into()]).unwrap();

    let seen: Vec<&str> = (0..6).map(|_| rotation.next_base()).collect();
    assert_eq!(seen, vec!["http://a", "http://b", "http://c", "http://a", "http://b", "http://c"]);
  }

  #[test]
  fn requires_a_base_url() {
    assert!(BaseUrlRotation::new(Vec::new()).is_err());
  }
}
