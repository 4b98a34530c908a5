use async_trait::async_trait;
use std::error::Error;

use clap::Subcommand;

pub mod analyze;
pub mod cfg;
pub mod disasm;

/// CLI subcommands for Vigil.
#[derive(Subcommand)]
pub enum Cmd {
    /// Analyze the DELEGATECALL surface of a contract.
    Analyze(analyze::AnalyzeArgs),
    /// Print the disassembly of a bytecode string.
    Disasm(disasm::DisasmArgs),
    /// Write the analysis CFG as Graphviz .dot to stdout or a file.
    Cfg(cfg::CfgArgs),
}

/// Trait for executing CLI subcommands.
#[async_trait]
pub trait Command {
    /// Executes the subcommand.
    ///
    /// # Returns
    /// A `Result` indicating success or an error if execution fails.
    async fn execute(self) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Analyze(args) => args.execute().await,
            Cmd::Disasm(args) => args.execute().await,
            Cmd::Cfg(args) => args.execute().await,
        }
    }
}
