use clap::{Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    #[command(subcommand)]
    pub(crate) command: ToolpinCommand,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum ToolpinCommand {
    /// Installs tools from the `toolpin.toml`. Defaults to all
    Install {
        /// Install one specific tool
        #[clap(long)]
        name: Option<String>,
    },
    /// Uninstall tools. Defaults to all. This removes the installed file
    /// and the matching ledger entry
    Uninstall {
        /// Uninstall one specific tool
        #[clap(long)]
        name: Option<String>,
    },
    /// List all tools in `toolpin.toml` with their install and ledger state
    Status {
        #[clap(short, long)]
        verbose: bool,
    },
    /// Recompute destination digests and report drift against the ledger
    Verify {
        /// Verify one specific tool
        #[clap(long)]
        name: Option<String>,
    },
    /// Initializes a starter `toolpin.toml` in the current directory
    Init,
}
