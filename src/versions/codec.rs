//! Persistence of version maps in JSON, YAML, TOML and INI.
//!
//! TOML and INI both keep the map under a single `versions` section. INI files
//! hold bare `key = value` lines.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

/// Version map keyed by file key.
pub type VersionMap = BTreeMap<String, String>;

/// On-disk format of a version map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFormat {
  /// `{"css/site.css": "a9993e36"}`.
  Json,
  /// `css/site.css: a9993e36`.
  Yaml,
  /// `[versions]` table of quoted string entries.
  Toml,
  /// `[versions]` section of bare `css/site.css=a9993e36` lines.
  Ini,
}

impl VersionFormat {
  /// Pick a format from a file extension.
  pub fn from_path(path: &Path) -> Result<Self> {
    let extension = path
      .extension()
      .and_then(|ext| ext.to_str())
      .unwrap_or_default();
    extension.parse()
  }

  /// Name of the cargo feature providing this codec.
  pub fn feature(self) -> &'static str {
    match self {
      VersionFormat::Json => "json",
      VersionFormat::Yaml => "yaml",
      VersionFormat::Toml => "toml",
      VersionFormat::Ini => "ini",
    }
  }

  /// Serialise `map` to `path`.
  pub fn write(self, map: &VersionMap, path: &Path) -> Result<()> {
    let content = match self {
      VersionFormat::Json => encode_json(map, path)?,
      VersionFormat::Yaml => encode_yaml(map, path)?,
      VersionFormat::Toml => encode_toml(map, path)?,
      VersionFormat::Ini => encode_ini(map, path)?,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|err| PipelineError::io(parent, err))?;
    }
    fs::write(path, content).map_err(|err| PipelineError::io(path, err))
  }

  /// Read a map previously written with [`VersionFormat::write`].
  pub fn read(self, path: &Path) -> Result<VersionMap> {
    self.ensure_available()?;
    let content = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
    match self {
      VersionFormat::Json => decode_json(&content, path),
      VersionFormat::Yaml => decode_yaml(&content, path),
      VersionFormat::Toml => decode_toml(&content, path),
      VersionFormat::Ini => decode_ini(&content, path),
    }
  }

  fn ensure_available(self) -> Result<()> {
    let available = match self {
      VersionFormat::Json => cfg!(feature = "json"),
      VersionFormat::Yaml => cfg!(feature = "yaml"),
      VersionFormat::Toml => cfg!(feature = "toml"),
      VersionFormat::Ini => cfg!(feature = "ini"),
    };
    if available {
      Ok(())
    } else {
      Err(PipelineError::CodecUnavailable {
        format: self.feature(),
      })
    }
  }
}

impl FromStr for VersionFormat {
  type Err = PipelineError;

  fn from_str(value: &str) -> Result<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "json" => Ok(VersionFormat::Json),
      "yaml" | "yml" => Ok(VersionFormat::Yaml),
      "toml" => Ok(VersionFormat::Toml),
      "ini" | "cfg" => Ok(VersionFormat::Ini),
      _ => Err(PipelineError::UnknownVersionerOrCodec {
        name: value.to_string(),
      }),
    }
  }
}

fn codec_error(path: &Path, err: impl std::fmt::Display) -> PipelineError {
  PipelineError::Codec {
    path: path.to_path_buf(),
    reason: err.to_string(),
  }
}

#[cfg(feature = "json")]
fn encode_json(map: &VersionMap, path: &Path) -> Result<String> {
  serde_json::to_string_pretty(map).map_err(|err| codec_error(path, err))
}

#[cfg(feature = "json")]
fn decode_json(content: &str, path: &Path) -> Result<VersionMap> {
  serde_json::from_str(content).map_err(|err| codec_error(path, err))
}

#[cfg(not(feature = "json"))]
fn encode_json(_map: &VersionMap, _path: &Path) -> Result<String> {
  Err(PipelineError::CodecUnavailable { format: "json" })
}

#[cfg(not(feature = "json"))]
fn decode_json(_content: &str, _path: &Path) -> Result<VersionMap> {
  Err(PipelineError::CodecUnavailable { format: "json" })
}

#[cfg(feature = "yaml")]
fn encode_yaml(map: &VersionMap, path: &Path) -> Result<String> {
  serde_yaml::to_string(map).map_err(|err| codec_error(path, err))
}

#[cfg(feature = "yaml")]
fn decode_yaml(content: &str, path: &Path) -> Result<VersionMap> {
  if content.trim().is_empty() {
    return Ok(VersionMap::new());
  }
  serde_yaml::from_str(content).map_err(|err| codec_error(path, err))
}

#[cfg(not(feature = "yaml"))]
fn encode_yaml(_map: &VersionMap, _path: &Path) -> Result<String> {
  Err(PipelineError::CodecUnavailable { format: "yaml" })
}

#[cfg(not(feature = "yaml"))]
fn decode_yaml(_content: &str, _path: &Path) -> Result<VersionMap> {
  Err(PipelineError::CodecUnavailable { format: "yaml" })
}

#[cfg(feature = "toml")]
#[derive(serde::Serialize, serde::Deserialize)]
struct TomlDocument {
  #[serde(default)]
  versions: VersionMap,
}

#[cfg(feature = "toml")]
fn encode_toml(map: &VersionMap, path: &Path) -> Result<String> {
  let document = TomlDocument {
    versions: map.clone(),
  };
  toml::to_string(&document).map_err(|err| codec_error(path, err))
}

#[cfg(feature = "toml")]
fn decode_toml(content: &str, path: &Path) -> Result<VersionMap> {
  let document: TomlDocument = toml::from_str(content).map_err(|err| codec_error(path, err))?;
  Ok(document.versions)
}

#[cfg(not(feature = "toml"))]
fn encode_toml(_map: &VersionMap, _path: &Path) -> Result<String> {
  Err(PipelineError::CodecUnavailable { format: "toml" })
}

#[cfg(not(feature = "toml"))]
fn decode_toml(_content: &str, _path: &Path) -> Result<VersionMap> {
  Err(PipelineError::CodecUnavailable { format: "toml" })
}

#[cfg(feature = "ini")]
const INI_SECTION: &str = "versions";

#[cfg(feature = "ini")]
fn encode_ini(map: &VersionMap, path: &Path) -> Result<String> {
  let mut document = ini::Ini::new();
  let mut section = document.with_section(Some(INI_SECTION));
  for (key, token) in map {
    section.set(key.as_str(), token.as_str());
  }

  let mut buffer = Vec::new();
  document
    .write_to(&mut buffer)
    .map_err(|err| codec_error(path, err))?;
  String::from_utf8(buffer).map_err(|err| codec_error(path, err))
}

#[cfg(feature = "ini")]
fn decode_ini(content: &str, path: &Path) -> Result<VersionMap> {
  let document = ini::Ini::load_from_str(content).map_err(|err| codec_error(path, err))?;
  Ok(
    document
      .section(Some(INI_SECTION))
      .map(|section| {
        section
          .iter()
          .map(|(key, token)| (key.to_string(), token.to_string()))
          .collect()
      })
      .unwrap_or_default(),
  )
}

#[cfg(not(feature = "ini"))]
fn encode_ini(_map: &VersionMap, _path: &Path) -> Result<String> {
  Err(PipelineError::CodecUnavailable { format: "ini" })
}

#[cfg(not(feature = "ini"))]
fn decode_ini(_content: &str, _path: &Path) -> Result<VersionMap> {
  Err(PipelineError::CodecUnavailable { format: "ini" })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn sample() -> VersionMap {
    let mut map = VersionMap::new();
    map.insert("css/site.css".into(), "a9993e36".into());
    map.insert("js/app.js".into(), "1700000000".into());
    map
  }

  #[test]
  fn formats_parse_from_names_and_extensions() {
    assert_eq!("YAML".parse::<VersionFormat>().unwrap(), VersionFormat::Yaml);
    assert_eq!("ini".parse::<VersionFormat>().unwrap(), VersionFormat::Ini);
    assert_eq!("TOML".parse::<VersionFormat>().unwrap(), VersionFormat::Toml);
    assert_eq!(
      VersionFormat::from_path(Path::new("out/versions.yml")).unwrap(),
      VersionFormat::Yaml
    );
    assert!(matches!(
      VersionFormat::from_path(Path::new("versions.xml")),
      Err(PipelineError::UnknownVersionerOrCodec { .. })
    ));
  }

  #[cfg(feature = "json")]
  #[test]
  fn json_map_survives_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/versions.json");
    VersionFormat::Json.write(&sample(), &path).unwrap();

    assert_eq!(VersionFormat::Json.read(&path).unwrap(), sample());
  }

  #[cfg(feature = "toml")]
  #[test]
  fn toml_map_lives_in_versions_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("versions.toml");
    VersionFormat::Toml.write(&sample(), &path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("[versions]"));
    assert_eq!(VersionFormat::Toml.read(&path).unwrap(), sample());
  }

  #[cfg(feature = "ini")]
  #[test]
  fn reads_hand_written_ini_sections() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("versions.ini");
    fs::write(
      &path,
      "; generated\n[other]\nignored = 1\n\n[versions]\ncss/site.css = a9993e36\njs/app.js=1700000000\n",
    )
    .unwrap();

    let format = VersionFormat::from_path(&path).unwrap();
    assert_eq!(format, VersionFormat::Ini);
    assert_eq!(format.read(&path).unwrap(), sample());
  }

  #[cfg(feature = "ini")]
  #[test]
  fn ini_output_uses_bare_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("versions.ini");
    VersionFormat::Ini.write(&sample(), &path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<String> = content.lines().map(|line| line.replace(' ', "")).collect();
    assert!(lines.contains(&"[versions]".to_string()));
    assert!(lines.contains(&"css/site.css=a9993e36".to_string()));
    assert!(!content.contains('"'));
    assert_eq!(VersionFormat::Ini.read(&path).unwrap(), sample());
  }

  #[cfg(feature = "yaml")]
  #[test]
  fn empty_yaml_reads_as_empty_map() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("versions.yaml");
    fs::write(&path, "").unwrap();

    assert!(VersionFormat::Yaml.read(&path).unwrap().is_empty());
  }

  #[cfg(feature = "json")]
  #[test]
  fn malformed_content_names_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{not json").unwrap();

    let err = VersionFormat::Json.read(&path).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
  }
}
