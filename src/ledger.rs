use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::error::ToolError;

/// One recorded install. Serialized as a single JSON object per line so
/// that external tooling (uninstallers, diagnostics) can consume the file
/// without this crate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub tool: String,
    /// Hex-encoded SHA-256 of the installed content.
    pub digest: String,
    /// Whether the digest was verified against a configured pin.
    pub pinned: bool,
    pub installed_at: DateTime<Utc>,
    pub dest: PathBuf,
}

/// Durable record of what was installed, keyed by tool name.
///
/// `record` persists before returning, so a crash after it returns never
/// loses the entry. The ledger is shared mutable state; callers keep a
/// single writer (the pipeline here is single-threaded throughout).
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Loads the ledger at `path`, or starts empty if the file does not
    /// exist. Any other read failure propagates: a transient error on an
    /// existing ledger must not masquerade as an empty one and then be
    /// persisted over the prior entries. Unparseable lines are skipped
    /// with a warning rather than aborting the run.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries = Vec::new();
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                for line in content.lines().filter(|l| !l.trim().is_empty()) {
                    match serde_json::from_str::<LedgerEntry>(line) {
                        Ok(entry) => entries.push(entry),
                        Err(e) => warn!(ledger = %path.display(), %e, "skipping malformed ledger line"),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Could not read ledger {}", path.display()));
            }
        }
        Ok(Ledger { path, entries })
    }

    /// Upserts the entry for its tool name and persists the whole file
    /// durably (staged write, fsync, rename) before returning.
    pub fn record(&mut self, entry: LedgerEntry) -> Result<(), ToolError> {
        match self.entries.iter_mut().find(|e| e.tool == entry.tool) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.save()
    }

    /// Returns the most recent recorded entry for a tool, if any.
    pub fn last_recorded(&self, tool: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.tool == tool)
    }

    /// Drops a tool's entry and persists. Removing an absent tool is a no-op.
    pub fn remove(&mut self, tool: &str) -> Result<(), ToolError> {
        let before = self.entries.len();
        self.entries.retain(|e| e.tool != tool);
        if self.entries.len() == before {
            return Ok(());
        }
        self.save()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), ToolError> {
        let io = |e: std::io::Error| ToolError::LedgerWriteFailed(e.to_string());
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut staged = tempfile::Builder::new()
            .prefix(".toolpin-ledger-")
            .tempfile_in(&dir)
            .map_err(io)?;
        for entry in &self.entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| ToolError::LedgerWriteFailed(e.to_string()))?;
            writeln!(staged, "{line}").map_err(io)?;
        }
        staged.as_file().sync_all().map_err(io)?;
        staged
            .persist(&self.path)
            .map_err(|e| ToolError::LedgerWriteFailed(e.error.to_string()))?;
        #[cfg(unix)]
        std::fs::File::open(&dir)
            .and_then(|d| d.sync_all())
            .map_err(io)?;
        Ok(())
    }
}
