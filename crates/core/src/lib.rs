//! vigil-core: static analysis of the DELEGATECALL surface of EVM bytecode.
//!
//! The pipeline is a one-way street: disassembly, CFG construction,
//! symbolic stack tracing, target classification, proxy-pattern detection,
//! and finally risk assessment plus report assembly. The whole core is
//! synchronous, allocation-bounded, and total on any byte string.

pub mod cfg;
pub mod classify;
pub mod decoder;
pub mod opcode;
pub mod patterns;
pub mod report;
pub mod result;
pub mod tracer;

pub use opcode::Opcode;
pub use report::Report;
pub use result::{Error, Result};

/// Returns true if the opcode terminates execution.
///
/// Terminal opcodes end the current execution frame: STOP, RETURN, REVERT,
/// and SELFDESTRUCT.
#[inline]
pub fn is_terminal_opcode(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::STOP | Opcode::RETURN | Opcode::REVERT | Opcode::SELFDESTRUCT
    )
}

/// Returns true if the opcode ends a basic block.
///
/// Block-ending opcodes are the terminal opcodes plus JUMP and JUMPI, which
/// transfer control elsewhere.
#[inline]
pub fn is_block_ending_opcode(opcode: Opcode) -> bool {
    is_terminal_opcode(opcode) || matches!(opcode, Opcode::JUMP | Opcode::JUMPI)
}

/// Knobs for a single analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// On-chain address the bytecode was fetched from, if any.
    pub contract_address: Option<String>,
    /// Network the address lives on, if any.
    pub network: Option<String>,
    /// CFG-based tracing when true; the faster, noisier linear pass when
    /// false.
    pub use_cfg: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            contract_address: None,
            network: None,
            use_cfg: true,
        }
    }
}

/// Runs the full analysis pipeline over a hex-encoded bytecode string.
///
/// Empty bytecode is fine and produces a report with zero sites; malformed
/// hex is the only error.
pub fn analyze(bytecode: &str, options: &AnalyzeOptions) -> Result<Report> {
    let (instructions, bytes) = decoder::decode_bytecode(bytecode)?;
    tracing::debug!(
        "analyzing {} bytes ({} instructions), cfg={}",
        bytes.len(),
        instructions.len(),
        options.use_cfg
    );

    let mut sites = if options.use_cfg {
        let cfg = cfg::build_cfg(&instructions);
        tracer::collect_sites(&cfg, &instructions)
    } else {
        tracer::collect_sites_linear(&instructions)
    };

    patterns::detect_patterns(&hex::encode(&bytes), &mut sites);
    tracing::debug!("found {} delegatecall sites", sites.len());

    Ok(report::build_report(bytecode, options, sites))
}
