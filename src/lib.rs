//! # Toolpin Core Library
//!
//! This crate contains the core logic and building blocks of the `toolpin` tool – a verified,
//! atomic installer for privileged helper binaries (kernel-module managers, filesystem daemons, …).
//!
//! `toolpin` places pre-built binaries from staging paths into fixed destination paths with
//! integrity verification, all-or-nothing activation, and a durable install ledger
//! (`toolpin.toml`, `toolpin.ledger`) used for idempotence and drift detection.
//!
//! This library is built for the `toolpin` CLI, but you can also reuse it as a backend in other tools.
//!
//! ## Modules Overview
//! - [`manifest`] – Parsing and serialization of `toolpin.toml` manifest files
//! - [`ledger`] – Durable install record structure and upsert logic (`toolpin.ledger`)
//! - [`resolver`] – Mapping logical tool names to their configured source
//! - [`verify`] – Integrity checks (executable header, SHA-256 digest, optional pin)
//! - [`installer`] – Staged, atomic placement with permission bits fixed before exposure
//! - [`orchestrator`] – Per-tool pipeline sequencing and partial-failure isolation
//! - [`error`] – The per-tool failure taxonomy
//! - [`util`] – Shared utilities (paths, hashing, mode parsing)


pub mod manifest;
pub mod ledger;
pub mod resolver;
pub mod verify;
pub mod installer;
pub mod orchestrator;
pub mod error;
pub mod util;

pub use manifest::*;
pub use verify::*;
pub use ledger::*;
pub use resolver::*;
pub use installer::*;
pub use orchestrator::*;
pub use error::*;
pub use util::*;
