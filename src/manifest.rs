use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use anyhow::{bail, Result};
use crate::util::is_valid_mode;

/// Represents the contents of a `toolpin.toml` manifest.
///
/// This includes bundle metadata and the list of privileged tools to place.
#[derive(Deserialize, Serialize, Debug)]
pub struct Manifest {
    /// Metadata about the tool bundle.
    pub bundle: Bundle,
    /// The tools to install, in declaration order.
    #[serde(default, rename = "tool")]
    pub tools: Vec<ToolSpec>,
}

/// Basic metadata for a tool bundle.
#[derive(Deserialize, Serialize, Debug)]
pub struct Bundle {
    /// The name of the bundle.
    pub name: String,
    /// Ledger file path, relative to the manifest's directory unless absolute.
    #[serde(default = "default_ledger")]
    pub ledger: PathBuf,
}

fn default_ledger() -> PathBuf {
    PathBuf::from("toolpin.ledger")
}

/// A single tool to install. Immutable once loaded.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ToolSpec {
    /// Logical tool name, e.g. `"kpmmgr"`.
    pub name: String,
    /// Staging path the binary is copied from.
    pub source: PathBuf,
    /// Final path the binary is activated at. The parent directory must
    /// exist and be writable; temp files are staged next to it so the
    /// rename stays on one filesystem.
    pub dest: PathBuf,
    /// Octal permission bits applied before the tool becomes visible,
    /// e.g. `"0755"`.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Optional pinned SHA-256 digest (hex, with or without a `sha256:`
    /// prefix). Absent means "not yet pinned": install proceeds and the
    /// ledger records the entry as unpinned.
    pub sha256: Option<String>,
}

fn default_mode() -> String {
    String::from("0755")
}

impl Manifest {
    /// Creates a new `Manifest` with the given bundle name and no tools.
    pub fn default(name: &str) -> Manifest {
        Manifest {
            bundle: Bundle {
                name: String::from(name),
                ledger: default_ledger(),
            },
            tools: Vec::new(),
        }
    }

    /// Saves the manifest to the given file path in pretty TOML format.
    ///
    /// # Errors
    /// Returns an error if the file can't be written or serialization fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Loads a `Manifest` from a file path and validates it.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or deserialized, a tool
    /// name is duplicated, or a mode string is not valid octal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Manifest> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Manifest = toml::from_str(&content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for (i, tool) in self.tools.iter().enumerate() {
            if !is_valid_mode(&tool.mode) {
                bail!("Invalid mode '{}' for tool '{}'", tool.mode, tool.name);
            }
            if self.tools[..i].iter().any(|t| t.name == tool.name) {
                bail!("Duplicate tool name '{}'", tool.name);
            }
        }
        Ok(())
    }

    /// Adds a new tool entry to the manifest.
    ///
    /// # Errors
    /// Returns an error if the mode is invalid or the name already exists.
    pub fn add(&mut self, spec: ToolSpec) -> Result<()> {
        if !is_valid_mode(&spec.mode) {
            bail!("Invalid mode: {}", spec.mode);
        }
        if self.tools.iter().any(|t| t.name == spec.name) {
            bail!("Tool {} already exists", spec.name);
        }
        self.tools.push(spec);
        Ok(())
    }

    /// Removes a tool entry from the manifest.
    ///
    /// If the tool does not exist, nothing happens.
    pub fn remove(&mut self, name: &str) {
        self.tools.retain(|t| t.name != name);
    }

    /// Resolves the ledger path against the manifest's directory.
    pub fn ledger_path<P: AsRef<Path>>(&self, manifest_dir: P) -> PathBuf {
        if self.bundle.ledger.is_absolute() {
            self.bundle.ledger.clone()
        } else {
            manifest_dir.as_ref().join(&self.bundle.ledger)
        }
    }
}
