use std::sync::OnceLock;

use regex::RegexSet;

/// Index of the `http(s)://` pattern within [`reference_schemes`].
const HTTP_SCHEME: usize = 0;

/// `http(s)://`, protocol-relative `//` and `data:` prefixes, in that order.
fn reference_schemes() -> &'static RegexSet {
  static SCHEMES: OnceLock<RegexSet> = OnceLock::new();
  SCHEMES.get_or_init(|| {
    RegexSet::new([r"(?i)^https?://", r"^//", r"(?i)^data:"])
      .expect("reference scheme patterns are valid")
  })
}

/// Returns `true` when a key already names an absolute `http(s)` URL.
///
/// Such keys bypass base-URL prefixing when URLs are generated.
pub fn is_absolute_url(value: &str) -> bool {
  reference_schemes().matches(value).matched(HTTP_SCHEME)
}

/// Returns `true` when a stylesheet reference points outside the served asset tree.
pub fn is_external_reference(value: &str) -> bool {
  reference_schemes().is_match(value)
}
