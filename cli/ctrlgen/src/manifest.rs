//! `ctrlgen.toml` manifest parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "ctrlgen.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// The top-level manifest of a ctrlgen project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtrlgenManifest {
    pub project: ProjectConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Where generated Verilog and cell libraries go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Relative to the directory holding the manifest.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub force_overwrite: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: default_output_dir(),
            force_overwrite: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl CtrlgenManifest {
    /// Search upward from `start_dir` for a `ctrlgen.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: CtrlgenManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                log::debug!("using manifest {}", candidate.display());
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing ctrlgen.toml")
    }

    /// Default manifest written by `ctrlgen init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"

[output]
dir = "{DEFAULT_OUTPUT_DIR}"
force_overwrite = false
"#
        )
    }
}
