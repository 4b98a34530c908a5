//! Generates a Graphviz .dot rendering of the analysis CFG. The output can
//! be written to a file or printed to stdout.

use async_trait::async_trait;
use clap::Args;
use std::error::Error;
use std::fs;
use vigil_core::cfg::{build_cfg, Cfg, EdgeKind};
use vigil_core::decoder::decode_bytecode;

/// Arguments for the `cfg` subcommand.
#[derive(Args)]
pub struct CfgArgs {
    /// Input bytecode as a hex string (with or without 0x).
    #[arg(value_name = "HEX")]
    pub bytecode: String,
    /// Output file for Graphviz .dot (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Executes the `cfg` subcommand to generate a CFG visualization.
#[async_trait]
impl super::Command for CfgArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let (instructions, _) = decode_bytecode(&self.bytecode)?;
        let cfg = build_cfg(&instructions);

        let dot = generate_dot(&cfg);
        if let Some(out_path) = self.output {
            fs::write(out_path, &dot)?;
        } else {
            println!("{dot}");
        }
        Ok(())
    }
}

/// Generates a Graphviz .dot representation of the CFG.
fn generate_dot(cfg: &Cfg) -> String {
    let mut dot = String::from("digraph CFG {\n");

    for node in cfg.graph.node_indices() {
        let block = cfg.block(node);
        let instrs: Vec<String> = block.instructions.iter().map(|i| i.to_string()).collect();
        let label = format!("Block_{}\\n{}", block.start_pc, instrs.join("\\n"));
        dot.push_str(&format!("    {} [label=\"{}\"];\n", node.index(), label));
    }

    for edge in cfg.graph.edge_indices() {
        let (src, dst) = cfg.graph.edge_endpoints(edge).unwrap();
        let label = match cfg.graph.edge_weight(edge).unwrap() {
            EdgeKind::Fallthrough => "Fallthrough",
            EdgeKind::BranchFalse => "BranchFalse",
        };
        dot.push_str(&format!(
            "    {} -> {} [label=\"{}\"];\n",
            src.index(),
            dst.index(),
            label
        ));
    }

    dot.push_str("}\n");
    dot
}
