//! Turns hex-encoded EVM bytecode into an instruction stream.

use crate::opcode::Opcode;
use crate::result::{Error, Result};
use std::fmt;

/// Represents a single disassembled instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// the instruction's program counter (byte offset of the opcode byte)
    pub pc: usize,
    /// Parsed opcode enum
    pub op: Opcode,
    /// any immediate data (lowercase hex without 0x), if present
    pub imm: Option<String>,
}

impl Instruction {
    /// Returns the number of bytes this instruction occupies in bytecode.
    #[inline]
    pub fn byte_size(&self) -> usize {
        1 + self.op.immediate_size()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pc: six-digit hex, opcode left-padded to 8 chars, then optional imm
        if let Some(imm) = &self.imm {
            write!(f, "{:06x}  {:<8} 0x{}", self.pc, self.op.to_string(), imm)
        } else {
            write!(f, "{:06x}  {}", self.pc, self.op)
        }
    }
}

/// Normalizes a hex string by stripping an optional `0x` prefix.
///
/// The remainder must be strict hex of even length; the input is otherwise
/// consumed as-is (no whitespace tolerance, no odd-length padding).
pub fn normalize_hex_string(input: &str) -> &str {
    input.strip_prefix("0x").unwrap_or(input)
}

/// Decodes a hex string (with or without `0x`) into raw bytecode bytes.
pub fn input_to_bytes(input: &str) -> Result<Vec<u8>> {
    hex::decode(normalize_hex_string(input)).map_err(Error::HexDecode)
}

/// Disassembles raw bytecode bytes into an instruction stream.
///
/// PUSH immediates that run past end-of-code are zero-padded to their
/// declared width. Bytes with no assigned mnemonic become `UNKNOWN`
/// instructions occupying a single byte.
pub fn disassemble(bytes: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    let mut pc = 0usize;

    while pc < bytes.len() {
        let op = Opcode::from_byte(bytes[pc]);
        let width = op.immediate_size();

        let imm = if width > 0 {
            let start = pc + 1;
            let end = (start + width).min(bytes.len());
            let mut data = bytes[start..end].to_vec();
            data.resize(width, 0);
            Some(hex::encode(data))
        } else {
            None
        };

        instructions.push(Instruction { pc, op, imm });
        pc += 1 + width;
    }

    tracing::debug!(
        "disassembled {} bytes into {} instructions",
        bytes.len(),
        instructions.len()
    );
    instructions
}

/// Decodes a hex string straight to an instruction stream plus the raw bytes.
pub fn decode_bytecode(input: &str) -> Result<(Vec<Instruction>, Vec<u8>)> {
    let bytes = input_to_bytes(input)?;
    let instructions = disassemble(&bytes);
    Ok((instructions, bytes))
}
