use std::path::Path;
use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info};
use crate::error::ToolError;
use crate::installer::install;
use crate::ledger::{Ledger, LedgerEntry};
use crate::manifest::{Manifest, ToolSpec};
use crate::resolver::resolve;
use crate::util::{file_mode, parse_mode, sha256_hex};
use crate::verify::verify;

/// Final state of one tool after a run.
#[derive(Debug)]
pub enum ToolOutcome {
    /// Installed and written to the ledger.
    Recorded { digest: String },
    /// Ledger digest and on-disk destination state already match the
    /// source; nothing was touched.
    UpToDate,
    Failed(ToolError),
}

impl ToolOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutcome::Failed(_))
    }
}

/// Per-tool outcomes of one run, in manifest declaration order.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub outcomes: Vec<(String, ToolOutcome)>,
}

impl InstallReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failure()).count()
    }

    pub fn outcome(&self, tool: &str) -> Option<&ToolOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, o)| o)
    }
}

/// Installs the configured tools, or just `only` when given.
///
/// Each tool runs the resolve, verify, install, record pipeline
/// independently; one tool's failure never blocks the others. The report
/// enumerates every tool's final state. An unreadable ledger aborts the
/// whole run instead: installing without tracking defeats drift detection.
pub fn install_tools<P: AsRef<Path>>(
    manifest: &Manifest,
    manifest_dir: P,
    only: Option<&str>,
) -> Result<InstallReport> {
    let manifest_dir = manifest_dir.as_ref();
    let mut ledger = Ledger::load_or_default(manifest.ledger_path(manifest_dir))?;
    let mut report = InstallReport::default();

    let names: Vec<String> = match only {
        Some(name) => vec![name.to_string()],
        None => manifest.tools.iter().map(|t| t.name.clone()).collect(),
    };

    for name in names {
        let outcome = run_tool(manifest, manifest_dir, &name, &mut ledger);
        if let ToolOutcome::Failed(e) = &outcome {
            error!(tool = %name, %e, "pipeline failed");
        }
        report.outcomes.push((name, outcome));
    }
    Ok(report)
}

/// One tool's pipeline. Any step short-circuits to `Failed` without
/// affecting other tools.
fn run_tool(
    manifest: &Manifest,
    manifest_dir: &Path,
    name: &str,
    ledger: &mut Ledger,
) -> ToolOutcome {
    let spec = match resolve(manifest, name) {
        Ok(spec) => materialize(spec, manifest_dir),
        Err(e) => return ToolOutcome::Failed(e),
    };
    debug!(tool = name, source = %spec.source.display(), "resolved");

    let verification = match verify(name, &spec.source, spec.sha256.as_deref()) {
        Ok(v) => v,
        Err(e) => return ToolOutcome::Failed(e),
    };
    debug!(tool = name, digest = %verification.digest, "verified");

    if destination_matches(&spec, ledger, &verification.digest) {
        info!(tool = name, "up to date, skipping");
        return ToolOutcome::UpToDate;
    }

    // the verifier's bytes go to disk, not a second read of the source
    if let Err(e) = install(&spec, &verification.content) {
        return ToolOutcome::Failed(e);
    }
    debug!(tool = name, dest = %spec.dest.display(), "installed");

    let entry = LedgerEntry {
        tool: name.to_string(),
        digest: verification.digest.clone(),
        pinned: verification.pinned,
        installed_at: Utc::now(),
        dest: spec.dest.clone(),
    };
    if let Err(e) = ledger.record(entry) {
        return ToolOutcome::Failed(e);
    }
    debug!(tool = name, "recorded");

    ToolOutcome::Recorded {
        digest: verification.digest,
    }
}

/// Relative source and destination paths resolve against the manifest's
/// directory. Privileged destination trees are absolute in practice and
/// pass through unchanged.
fn materialize(spec: &ToolSpec, manifest_dir: &Path) -> ToolSpec {
    let mut spec = spec.clone();
    if spec.source.is_relative() {
        spec.source = manifest_dir.join(&spec.source);
    }
    if spec.dest.is_relative() {
        spec.dest = manifest_dir.join(&spec.dest);
    }
    spec
}

/// A reinstall is skipped only when the ledger already carries the source
/// digest and the destination file still has that content and the
/// expected mode.
fn destination_matches(spec: &ToolSpec, ledger: &Ledger, digest: &str) -> bool {
    let Some(entry) = ledger.last_recorded(&spec.name) else {
        return false;
    };
    if entry.digest != digest || entry.dest != spec.dest {
        return false;
    }
    let Ok(content) = std::fs::read(&spec.dest) else {
        return false;
    };
    if sha256_hex(&content) != digest {
        return false;
    }
    #[cfg(unix)]
    {
        let expected = match parse_mode(&spec.mode) {
            Ok(bits) => bits,
            Err(_) => return false,
        };
        if file_mode(&spec.dest).map(|m| m != expected).unwrap_or(true) {
            return false;
        }
    }
    true
}

/// Drift state of one tool's destination relative to the ledger.
#[derive(Debug, PartialEq)]
pub enum DriftStatus {
    /// Destination content and mode match the last recorded install.
    Clean,
    /// No ledger entry exists for the tool.
    NeverInstalled,
    /// The recorded destination file is gone.
    Missing,
    DigestMismatch { recorded: String, actual: String },
    ModeMismatch { expected: u32, actual: u32 },
}

/// Recomputes a destination's digest and compares it against the ledger.
/// Read-only; used for drift detection.
pub fn check_drift(spec: &ToolSpec, ledger: &Ledger) -> DriftStatus {
    let Some(entry) = ledger.last_recorded(&spec.name) else {
        return DriftStatus::NeverInstalled;
    };
    let Ok(content) = std::fs::read(&entry.dest) else {
        return DriftStatus::Missing;
    };
    let actual = sha256_hex(&content);
    if actual != entry.digest {
        return DriftStatus::DigestMismatch {
            recorded: entry.digest.clone(),
            actual,
        };
    }
    #[cfg(unix)]
    if let (Ok(expected), Ok(actual)) = (parse_mode(&spec.mode), file_mode(&entry.dest)) {
        if expected != actual {
            return DriftStatus::ModeMismatch { expected, actual };
        }
    }
    DriftStatus::Clean
}

/// Removes a tool's installed file and its ledger entry. Consumes the
/// same records external uninstall tooling reads.
pub fn uninstall_tool(spec: &ToolSpec, ledger: &mut Ledger) -> Result<(), ToolError> {
    if let Some(entry) = ledger.last_recorded(&spec.name) {
        if entry.dest.exists() {
            std::fs::remove_file(&entry.dest)
                .map_err(|e| ToolError::install_failed(&spec.name, e))?;
        }
    } else if spec.dest.exists() {
        std::fs::remove_file(&spec.dest).map_err(|e| ToolError::install_failed(&spec.name, e))?;
    }
    ledger.remove(&spec.name)?;
    info!(tool = %spec.name, "uninstalled");
    Ok(())
}
