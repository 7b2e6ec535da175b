use thiserror::Error;

/// Per-tool failure taxonomy. Every failure is recoverable at tool
/// granularity; the orchestrator reports it and moves on to the next tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No source is configured for the name, or the configured source
    /// file does not exist on disk.
    #[error("no source found for '{0}'")]
    NotFound(String),
    /// The candidate binary failed verification (empty, not an executable,
    /// or its digest does not match the configured pin).
    #[error("'{tool}' is corrupt or untrusted: {reason}")]
    CorruptOrUntrusted { tool: String, reason: String },
    /// I/O or permission error while staging, chmodding, or renaming.
    /// The destination path is left untouched.
    #[error("install of '{tool}' failed: {reason}")]
    InstallFailed { tool: String, reason: String },
    /// The ledger could not be persisted. An untracked install defeats
    /// drift detection, so the run as a whole must exit non-zero.
    #[error("ledger write failed: {0}")]
    LedgerWriteFailed(String),
}

impl ToolError {
    pub fn install_failed(tool: &str, err: impl std::fmt::Display) -> Self {
        ToolError::InstallFailed {
            tool: tool.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn untrusted(tool: &str, reason: impl Into<String>) -> Self {
        ToolError::CorruptOrUntrusted {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }
}
