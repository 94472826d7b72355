//! `asset-pipeline` command line: build bundles and print URLs or markup.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use asset_pipeline::{AssetConfig, AssetManager, Kind, VersionFormat};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "asset-pipeline", version, about = "Bundle, version and address static assets")]
struct Cli {
  /// Configuration file (JSON or YAML); defaults to `assets.config.*` in the working directory.
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Serve individual cache-busted source files instead of built bundles.
  #[arg(long, global = true)]
  debug: bool,

  /// Enable debug logging.
  #[arg(short, long, global = true, conflicts_with = "quiet")]
  verbose: bool,

  /// Only log errors.
  #[arg(short, long, global = true)]
  quiet: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Build every configured bundle and version loose assets.
  Build {
    /// Write the version map here; the format follows the extension.
    #[arg(long)]
    versions: Option<PathBuf>,
  },
  /// Print the URLs referencing a bundle.
  Urls {
    /// Bundle kind (`css` or `js`).
    kind: Kind,
    /// Bundle key.
    key: String,
  },
  /// Print the markup referencing a bundle.
  Markup {
    /// Bundle kind (`css` or `js`).
    kind: Kind,
    /// Bundle key.
    key: String,
    /// Override a template field, e.g. `--set media=print`.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_field)]
    fields: Vec<(String, String)>,
  },
  /// List loose assets with their public URLs.
  Assets,
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
  raw
    .split_once('=')
    .map(|(field, value)| (field.trim().to_string(), value.to_string()))
    .filter(|(field, _)| !field.is_empty())
    .ok_or_else(|| format!("expected FIELD=VALUE, got `{raw}`"))
}

fn init_logger(verbose: bool, quiet: bool) {
  let filter = if verbose {
    EnvFilter::new("asset_pipeline=debug")
  } else if quiet {
    EnvFilter::new("asset_pipeline=error")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asset_pipeline=info"))
  };

  let fmt_layer = fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_level(true)
    .compact();

  tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

fn load_config(cli: &Cli) -> Result<AssetConfig> {
  let mut config = match &cli.config {
    Some(path) => AssetConfig::from_path(path)
      .with_context(|| format!("failed to load configuration from {}", path.display()))?,
    None => {
      let cwd = std::env::current_dir().context("failed to read the working directory")?;
      AssetConfig::discover(&cwd).context("failed to load configuration")?
    }
  };
  if cli.debug {
    config.debug = true;
  }
  Ok(config)
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logger(cli.verbose, cli.quiet);

  let config = load_config(&cli)?;
  let mut manager = AssetManager::new(config).context("failed to set up the asset manager")?;

  match cli.command {
    Command::Build { versions } => {
      let report = manager.build();
      for built in &report.built {
        match &built.version {
          Some(token) => println!("{} ({token})", built.output.display()),
          None => println!("{}", built.output.display()),
        }
      }
      manager.version_assets().context("failed to version loose assets")?;

      if let Some(path) = versions {
        let format = VersionFormat::from_path(&path)?;
        manager
          .save_versions(&path, format)
          .with_context(|| format!("failed to save versions to {}", path.display()))?;
      }

      if !report.is_success() {
        for (key, err) in &report.failures {
          eprintln!("error: {key}: {err}");
        }
        bail!("{} of {} bundles failed", report.failures.len(), report.failures.len() + report.built.len());
      }
      info!(bundles = report.built.len(), "build finished");
    }
    Command::Urls { kind, key } => {
      for url in manager.urls_for(kind, &key)? {
        println!("{url}");
      }
    }
    Command::Markup { kind, key, fields } => {
      let overrides: BTreeMap<String, String> = fields.into_iter().collect();
      println!("{}", manager.markup_for(kind, &key, &overrides, None)?);
    }
    Command::Assets => {
      for asset in manager.find_assets()? {
        let key = asset.key();
        println!("{key}\t{}", manager.url_for(&key));
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
  }

  #[test]
  fn parses_markup_overrides() {
    let cli = Cli::try_parse_from([
      "asset-pipeline",
      "--debug",
      "markup",
      "css",
      "css/site.css",
      "--set",
      "media=print",
      "--set",
      "title=a=b",
    ])
    .unwrap();

    assert!(cli.debug);
    match cli.command {
      Command::Markup { kind, key, fields } => {
        assert_eq!(kind, Kind::Css);
        assert_eq!(key, "css/site.css");
        assert_eq!(fields, vec![
          ("media".to_string(), "print".to_string()),
          ("title".to_string(), "a=b".to_string()),
        ]);
      }
      other => panic!("unexpected command: {other:?}"),
    }
  }

  #[test]
  fn rejects_malformed_overrides() {
    assert!(parse_field("media").is_err());
    assert!(parse_field("=print").is_err());
  }
}
