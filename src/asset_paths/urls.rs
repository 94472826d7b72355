/// Join a base URL and a key with exactly one forward slash between them.
///
/// Backslashes from Windows-style keys are normalised so generated URLs are the
/// same on every platform.
pub fn join_url(base: &str, key: &str) -> String {
  let key = key.replace('\\', "/");
  let base = base.trim_end_matches('/');
  let key = key.trim_start_matches('/');
  format!("{base}/{key}")
}

/// Directory portion of a forward-slash key, or `""` for top-level keys.
pub fn parent_dir(key: &str) -> &str {
  match key.rfind('/') {
    Some(index) => &key[..index],
    None => "",
  }
}

/// Resolve `reference` against `dir`, collapsing `.` and `..` segments.
///
/// Segments that would climb above the root are dropped, so the path always
/// stays inside the served tree; the flag is `true` when that happened.
pub fn normalize_relative(dir: &str, reference: &str) -> (String, bool) {
  let mut segments: Vec<&str> = Vec::new();
  let mut escaped = false;
  let joined = dir.split('/').chain(reference.split('/'));
  for segment in joined {
    match segment {
      "" | "." => {}
      ".." => escaped |= segments.pop().is_none(),
      segment => segments.push(segment),
    }
  }
  (segments.join("/"), escaped)
}

/// Path component of a base URL: `/media` for both `/media` and `http://a/media/`.
pub fn base_path(base: &str) -> &str {
  let path = match base.find("://") {
    Some(scheme_end) => {
      let rest = &base[scheme_end + 3..];
      match rest.find('/') {
        Some(index) => &rest[index..],
        None => "",
      }
    }
    None => base,
  };
  path.trim_end_matches('/')
}

/// Append a `name=value` query parameter, keeping any `#fragment` last.
pub fn append_query(url: &str, param: &str) -> String {
  let (location, fragment) = match url.find('#') {
    Some(index) => url.split_at(index),
    None => (url, ""),
  };
  let separator = if location.contains('?') { '&' } else { '?' };
  format!("{location}{separator}{param}{fragment}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn joins_with_single_slash() {
    assert_eq!(join_url("/media/", "/css/site.css"), "/media/css/site.css");
    assert_eq!(join_url("http://a", "js\\app.js"), "http://a/js/app.js");
  }

  #[test]
  fn climbs_out_of_bundle_directory() {
    assert_eq!(normalize_relative("css", "../images/foo.png"), ("images/foo.png".to_string(), false));
    assert_eq!(
      normalize_relative("css/themes", "./dark/bg.png"),
      ("css/themes/dark/bg.png".to_string(), false)
    );
  }

  #[test]
  fn flags_references_above_the_root() {
    assert_eq!(normalize_relative("css", "../../../x.png"), ("x.png".to_string(), true));
    assert_eq!(normalize_relative("", "../escape.png"), ("escape.png".to_string(), true));
    assert_eq!(normalize_relative("css/a", "../../x.png"), ("x.png".to_string(), false));
  }

  #[test]
  fn parent_of_top_level_key_is_empty() {
    assert_eq!(parent_dir("css/styles.css"), "css");
    assert_eq!(parent_dir("site.css"), "");
  }

  #[test]
  fn extracts_base_paths() {
    assert_eq!(base_path("/media/"), "/media");
    assert_eq!(base_path("http://a.example.com/static"), "/static");
    assert_eq!(base_path("http://a.example.com"), "");
  }

  #[test]
  fn query_goes_before_fragment() {
    assert_eq!(append_query("/a.svg#icon", "t=5"), "/a.svg?t=5#icon");
    assert_eq!(append_query("/a.css?v=1", "t=5"), "/a.css?v=1&t=5");
  }
}
