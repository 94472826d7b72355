//! Minification through an external command.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow, bail};

use crate::config::AssetConfig;
use crate::models::Kind;

/// Turns a combined bundle into its minified form.
pub trait Minifier {
  /// Minify `input` of the given kind.
  fn minify(&self, kind: Kind, input: &[u8]) -> Result<Vec<u8>>;
}

/// Pipes text through a configured command such as YUI Compressor.
///
/// Command templates are split on whitespace before `{minifier}` is substituted,
/// so a tool path containing spaces stays a single argument.
#[derive(Debug, Clone)]
pub struct CommandMinifier {
  css_cmd: String,
  js_cmd: String,
  tool_path: String,
}

impl CommandMinifier {
  /// Create a minifier from explicit command templates.
  pub fn new(css_cmd: impl Into<String>, js_cmd: impl Into<String>, tool_path: impl Into<String>) -> Self {
    Self {
      css_cmd: css_cmd.into(),
      js_cmd: js_cmd.into(),
      tool_path: tool_path.into(),
    }
  }

  /// Use the command templates and tool path from configuration.
  pub fn from_config(config: &AssetConfig) -> Self {
    Self::new(
      config.css.minify_cmd.clone(),
      config.js.minify_cmd.clone(),
      config.minifier_path.clone(),
    )
  }

  fn command_line(&self, kind: Kind) -> Result<Vec<String>> {
    let template = match kind {
      Kind::Css => &self.css_cmd,
      Kind::Js => &self.js_cmd,
      Kind::Generic => bail!("no minify command for generic assets"),
    };
    let words: Vec<String> = template
      .split_whitespace()
      .map(|word| word.replace("{minifier}", &self.tool_path))
      .collect();
    if words.is_empty() {
      bail!("empty minify command for {kind}");
    }
    Ok(words)
  }
}

impl Minifier for CommandMinifier {
  fn minify(&self, kind: Kind, input: &[u8]) -> Result<Vec<u8>> {
    let words = self.command_line(kind)?;
    let (program, args) = words
      .split_first()
      .ok_or_else(|| anyhow!("empty minify command for {kind}"))?;

    let mut child = Command::new(program)
      .args(args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .with_context(|| format!("failed to start `{program}`"))?;

    let mut stdin = child
      .stdin
      .take()
      .ok_or_else(|| anyhow!("`{program}` has no stdin pipe"))?;

    // Feed stdin while stdout drains so large bundles cannot fill both pipes.
    let (written, output) = thread::scope(|scope| {
      let writer = scope.spawn(move || {
        let written = stdin.write_all(input);
        drop(stdin);
        written
      });
      let output = child.wait_with_output();
      (writer.join(), output)
    });

    let output = output.with_context(|| format!("failed to read output of `{program}`"))?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      bail!("`{program}` exited with {}: {}", output.status, stderr.trim());
    }
    written
      .map_err(|_| anyhow!("stdin writer for `{program}` panicked"))?
      .with_context(|| format!("failed to write to `{program}`"))?;

    Ok(output.stdout)
  }
}
