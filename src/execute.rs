use anyhow::{bail, Result};
use colored::Colorize;
use toolpin::ledger::Ledger;
use toolpin::manifest::{Manifest, ToolSpec};
use toolpin::orchestrator::{check_drift, install_tools, uninstall_tool, DriftStatus, ToolOutcome};
use toolpin::util::{get_manifest_path, is_executable};
use crate::cli::{ToolpinCommand, CLI};

pub fn execute(cli: CLI) -> Result<()> {
    if cli.command != ToolpinCommand::Init {
        let manifest_path = get_manifest_path()?;
        if !manifest_path.exists() {
            bail!("toolpin.toml not found. Run `toolpin init` to create one.")
        }
    }
    match cli.command {
        ToolpinCommand::Init => execute_init(),
        ToolpinCommand::Install { name } => execute_install(name),
        ToolpinCommand::Status { verbose } => execute_status(verbose),
        ToolpinCommand::Verify { name } => execute_verify(name),
        ToolpinCommand::Uninstall { name } => execute_uninstall(name),
    }
}

fn load_manifest() -> Result<(Manifest, std::path::PathBuf)> {
    let cwd = std::env::current_dir()?;
    let manifest = Manifest::load(cwd.join("toolpin.toml"))?;
    Ok((manifest, cwd))
}

pub fn execute_init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let name = cwd
        .file_name()
        .ok_or(anyhow::anyhow!("Could not get file name"))?
        .to_str()
        .ok_or(anyhow::anyhow!("Invalid directory name"))?;
    let manifest = Manifest::default(name);
    manifest.save(cwd.join("toolpin.toml"))?;
    println!("Created toolpin.toml");
    Ok(())
}

pub fn execute_install(name: Option<String>) -> Result<()> {
    let (manifest, cwd) = load_manifest()?;
    if manifest.tools.is_empty() && name.is_none() {
        println!("No tools configured");
        return Ok(());
    }
    let report = install_tools(&manifest, &cwd, name.as_deref())?;

    for (tool, outcome) in &report.outcomes {
        match outcome {
            ToolOutcome::Recorded { digest } => {
                println!("{} {} ({})", "recorded".green(), tool, &digest[..12.min(digest.len())]);
            }
            ToolOutcome::UpToDate => {
                println!("{} {}", "up to date".yellow(), tool);
            }
            ToolOutcome::Failed(e) => {
                println!("{} {}: {}", "failed".red(), tool, e);
            }
        }
    }

    let failed = report.failed();
    if failed > 0 {
        bail!("{} of {} tools failed", failed, report.total());
    }
    println!("All {} tools succeeded", report.total());
    Ok(())
}

pub fn execute_status(verbose: bool) -> Result<()> {
    let (manifest, cwd) = load_manifest()?;
    if manifest.tools.is_empty() {
        println!("No tools configured");
        return Ok(());
    }
    let ledger = Ledger::load_or_default(manifest.ledger_path(&cwd))?;

    for tool in &manifest.tools {
        println!("{}: {}", tool.name, tool.dest.display());
        match ledger.last_recorded(&tool.name) {
            Some(entry) => {
                println!("   recorded at: {}", entry.installed_at.to_rfc3339());
                if verbose {
                    println!("  # digest: {}", entry.digest);
                    println!("  pinned: {}", entry.pinned);
                }
            }
            None => {
                println!("   not recorded");
            }
        }
        match (tool.dest.exists(), is_executable(&tool.dest)) {
            (true, true) => println!("   installed"),
            (true, false) => println!("   installed (not executable)"),
            (false, _) => println!("   not installed"),
        }
        println!();
    }
    Ok(())
}

pub fn execute_verify(name: Option<String>) -> Result<()> {
    let (manifest, cwd) = load_manifest()?;
    let ledger = Ledger::load_or_default(manifest.ledger_path(&cwd))?;

    let tools: Vec<&ToolSpec> = match &name {
        Some(name) => manifest.tools.iter().filter(|t| &t.name == name).collect(),
        None => manifest.tools.iter().collect(),
    };
    if tools.is_empty() {
        bail!("Tool not found: {}", name.unwrap_or_default());
    }

    let mut drifted = 0;
    for tool in tools {
        match check_drift(tool, &ledger) {
            DriftStatus::Clean => println!("{} {}", "clean".green(), tool.name),
            DriftStatus::NeverInstalled => println!("{} {}", "never installed".yellow(), tool.name),
            DriftStatus::Missing => {
                drifted += 1;
                println!("{} {}: destination missing", "drift".red(), tool.name);
            }
            DriftStatus::DigestMismatch { recorded, actual } => {
                drifted += 1;
                println!(
                    "{} {}: digest {} recorded, {} on disk",
                    "drift".red(),
                    tool.name,
                    &recorded[..12.min(recorded.len())],
                    &actual[..12.min(actual.len())]
                );
            }
            DriftStatus::ModeMismatch { expected, actual } => {
                drifted += 1;
                println!(
                    "{} {}: mode {:o} expected, {:o} on disk",
                    "drift".red(),
                    tool.name,
                    expected,
                    actual
                );
            }
        }
    }
    if drifted > 0 {
        bail!("{} tools drifted from the ledger", drifted);
    }
    Ok(())
}

pub fn execute_uninstall(name: Option<String>) -> Result<()> {
    let (manifest, cwd) = load_manifest()?;
    let mut ledger = Ledger::load_or_default(manifest.ledger_path(&cwd))?;

    let tools: Vec<&ToolSpec> = match &name {
        Some(name) => manifest.tools.iter().filter(|t| &t.name == name).collect(),
        None => manifest.tools.iter().collect(),
    };
    if tools.is_empty() && name.is_some() {
        bail!("Tool not found: {}", name.unwrap_or_default());
    }

    for tool in tools {
        println!("Uninstalling {}", tool.name);
        uninstall_tool(tool, &mut ledger)?;
    }
    println!("Done");
    Ok(())
}
