//! EVM opcode vocabulary with static stack arity.
//!
//! Every opcode carries its `(stack_in, stack_out)` signature so the tracer
//! can approximate unmodeled instructions without a per-opcode handler.

use std::fmt;

/// Parsed EVM opcode.
///
/// Bytes with no assigned mnemonic are preserved as `UNKNOWN(byte)` and
/// render as `0xNN` in listings.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    STOP,
    ADD,
    MUL,
    SUB,
    DIV,
    SDIV,
    MOD,
    SMOD,
    ADDMOD,
    MULMOD,
    EXP,
    SIGNEXTEND,
    LT,
    GT,
    SLT,
    SGT,
    EQ,
    ISZERO,
    AND,
    OR,
    XOR,
    NOT,
    BYTE,
    SHL,
    SHR,
    SAR,
    KECCAK256,
    ADDRESS,
    BALANCE,
    ORIGIN,
    CALLER,
    CALLVALUE,
    CALLDATALOAD,
    CALLDATASIZE,
    CALLDATACOPY,
    CODESIZE,
    CODECOPY,
    GASPRICE,
    EXTCODESIZE,
    EXTCODECOPY,
    RETURNDATASIZE,
    RETURNDATACOPY,
    EXTCODEHASH,
    BLOCKHASH,
    COINBASE,
    TIMESTAMP,
    NUMBER,
    PREVRANDAO,
    GASLIMIT,
    CHAINID,
    SELFBALANCE,
    BASEFEE,
    POP,
    MLOAD,
    MSTORE,
    MSTORE8,
    SLOAD,
    SSTORE,
    JUMP,
    JUMPI,
    PC,
    MSIZE,
    GAS,
    JUMPDEST,
    PUSH0,
    /// PUSH1..=PUSH32, parameterised by immediate width in bytes.
    PUSH(u8),
    /// DUP1..=DUP16, parameterised by the duplicated depth.
    DUP(u8),
    /// SWAP1..=SWAP16, parameterised by the swapped depth.
    SWAP(u8),
    /// LOG0..=LOG4, parameterised by topic count.
    LOG(u8),
    CREATE,
    CALL,
    CALLCODE,
    RETURN,
    DELEGATECALL,
    CREATE2,
    STATICCALL,
    REVERT,
    INVALID,
    SELFDESTRUCT,
    /// Byte with no assigned mnemonic.
    UNKNOWN(u8),
}

impl Opcode {
    /// Decodes a raw bytecode byte into its opcode.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Opcode::STOP,
            0x01 => Opcode::ADD,
            0x02 => Opcode::MUL,
            0x03 => Opcode::SUB,
            0x04 => Opcode::DIV,
            0x05 => Opcode::SDIV,
            0x06 => Opcode::MOD,
            0x07 => Opcode::SMOD,
            0x08 => Opcode::ADDMOD,
            0x09 => Opcode::MULMOD,
            0x0a => Opcode::EXP,
            0x0b => Opcode::SIGNEXTEND,
            0x10 => Opcode::LT,
            0x11 => Opcode::GT,
            0x12 => Opcode::SLT,
            0x13 => Opcode::SGT,
            0x14 => Opcode::EQ,
            0x15 => Opcode::ISZERO,
            0x16 => Opcode::AND,
            0x17 => Opcode::OR,
            0x18 => Opcode::XOR,
            0x19 => Opcode::NOT,
            0x1a => Opcode::BYTE,
            0x1b => Opcode::SHL,
            0x1c => Opcode::SHR,
            0x1d => Opcode::SAR,
            0x20 => Opcode::KECCAK256,
            0x30 => Opcode::ADDRESS,
            0x31 => Opcode::BALANCE,
            0x32 => Opcode::ORIGIN,
            0x33 => Opcode::CALLER,
            0x34 => Opcode::CALLVALUE,
            0x35 => Opcode::CALLDATALOAD,
            0x36 => Opcode::CALLDATASIZE,
            0x37 => Opcode::CALLDATACOPY,
            0x38 => Opcode::CODESIZE,
            0x39 => Opcode::CODECOPY,
            0x3a => Opcode::GASPRICE,
            0x3b => Opcode::EXTCODESIZE,
            0x3c => Opcode::EXTCODECOPY,
            0x3d => Opcode::RETURNDATASIZE,
            0x3e => Opcode::RETURNDATACOPY,
            0x3f => Opcode::EXTCODEHASH,
            0x40 => Opcode::BLOCKHASH,
            0x41 => Opcode::COINBASE,
            0x42 => Opcode::TIMESTAMP,
            0x43 => Opcode::NUMBER,
            0x44 => Opcode::PREVRANDAO,
            0x45 => Opcode::GASLIMIT,
            0x46 => Opcode::CHAINID,
            0x47 => Opcode::SELFBALANCE,
            0x48 => Opcode::BASEFEE,
            0x50 => Opcode::POP,
            0x51 => Opcode::MLOAD,
            0x52 => Opcode::MSTORE,
            0x53 => Opcode::MSTORE8,
            0x54 => Opcode::SLOAD,
            0x55 => Opcode::SSTORE,
            0x56 => Opcode::JUMP,
            0x57 => Opcode::JUMPI,
            0x58 => Opcode::PC,
            0x59 => Opcode::MSIZE,
            0x5a => Opcode::GAS,
            0x5b => Opcode::JUMPDEST,
            0x5f => Opcode::PUSH0,
            0x60..=0x7f => Opcode::PUSH(byte - 0x5f),
            0x80..=0x8f => Opcode::DUP(byte - 0x7f),
            0x90..=0x9f => Opcode::SWAP(byte - 0x8f),
            0xa0..=0xa4 => Opcode::LOG(byte - 0xa0),
            0xf0 => Opcode::CREATE,
            0xf1 => Opcode::CALL,
            0xf2 => Opcode::CALLCODE,
            0xf3 => Opcode::RETURN,
            0xf4 => Opcode::DELEGATECALL,
            0xf5 => Opcode::CREATE2,
            0xfa => Opcode::STATICCALL,
            0xfd => Opcode::REVERT,
            0xfe => Opcode::INVALID,
            0xff => Opcode::SELFDESTRUCT,
            other => Opcode::UNKNOWN(other),
        }
    }

    /// Encodes the opcode back into its bytecode byte.
    pub fn as_byte(&self) -> u8 {
        match self {
            Opcode::STOP => 0x00,
            Opcode::ADD => 0x01,
            Opcode::MUL => 0x02,
            Opcode::SUB => 0x03,
            Opcode::DIV => 0x04,
            Opcode::SDIV => 0x05,
            Opcode::MOD => 0x06,
            Opcode::SMOD => 0x07,
            Opcode::ADDMOD => 0x08,
            Opcode::MULMOD => 0x09,
            Opcode::EXP => 0x0a,
            Opcode::SIGNEXTEND => 0x0b,
            Opcode::LT => 0x10,
            Opcode::GT => 0x11,
            Opcode::SLT => 0x12,
            Opcode::SGT => 0x13,
            Opcode::EQ => 0x14,
            Opcode::ISZERO => 0x15,
            Opcode::AND => 0x16,
            Opcode::OR => 0x17,
            Opcode::XOR => 0x18,
            Opcode::NOT => 0x19,
            Opcode::BYTE => 0x1a,
            Opcode::SHL => 0x1b,
            Opcode::SHR => 0x1c,
            Opcode::SAR => 0x1d,
            Opcode::KECCAK256 => 0x20,
            Opcode::ADDRESS => 0x30,
            Opcode::BALANCE => 0x31,
            Opcode::ORIGIN => 0x32,
            Opcode::CALLER => 0x33,
            Opcode::CALLVALUE => 0x34,
            Opcode::CALLDATALOAD => 0x35,
            Opcode::CALLDATASIZE => 0x36,
            Opcode::CALLDATACOPY => 0x37,
            Opcode::CODESIZE => 0x38,
            Opcode::CODECOPY => 0x39,
            Opcode::GASPRICE => 0x3a,
            Opcode::EXTCODESIZE => 0x3b,
            Opcode::EXTCODECOPY => 0x3c,
            Opcode::RETURNDATASIZE => 0x3d,
            Opcode::RETURNDATACOPY => 0x3e,
            Opcode::EXTCODEHASH => 0x3f,
            Opcode::BLOCKHASH => 0x40,
            Opcode::COINBASE => 0x41,
            Opcode::TIMESTAMP => 0x42,
            Opcode::NUMBER => 0x43,
            Opcode::PREVRANDAO => 0x44,
            Opcode::GASLIMIT => 0x45,
            Opcode::CHAINID => 0x46,
            Opcode::SELFBALANCE => 0x47,
            Opcode::BASEFEE => 0x48,
            Opcode::POP => 0x50,
            Opcode::MLOAD => 0x51,
            Opcode::MSTORE => 0x52,
            Opcode::MSTORE8 => 0x53,
            Opcode::SLOAD => 0x54,
            Opcode::SSTORE => 0x55,
            Opcode::JUMP => 0x56,
            Opcode::JUMPI => 0x57,
            Opcode::PC => 0x58,
            Opcode::MSIZE => 0x59,
            Opcode::GAS => 0x5a,
            Opcode::JUMPDEST => 0x5b,
            Opcode::PUSH0 => 0x5f,
            Opcode::PUSH(n) => 0x5f + n,
            Opcode::DUP(n) => 0x7f + n,
            Opcode::SWAP(n) => 0x8f + n,
            Opcode::LOG(n) => 0xa0 + n,
            Opcode::CREATE => 0xf0,
            Opcode::CALL => 0xf1,
            Opcode::CALLCODE => 0xf2,
            Opcode::RETURN => 0xf3,
            Opcode::DELEGATECALL => 0xf4,
            Opcode::CREATE2 => 0xf5,
            Opcode::STATICCALL => 0xfa,
            Opcode::REVERT => 0xfd,
            Opcode::INVALID => 0xfe,
            Opcode::SELFDESTRUCT => 0xff,
            Opcode::UNKNOWN(byte) => *byte,
        }
    }

    /// Static `(stack_in, stack_out)` arity.
    ///
    /// `UNKNOWN` bytes report `(0, 0)`; the tracer applies its own
    /// approximation for them.
    pub fn stack_io(&self) -> (usize, usize) {
        match self {
            Opcode::STOP | Opcode::JUMPDEST | Opcode::INVALID | Opcode::UNKNOWN(_) => (0, 0),

            Opcode::ADDRESS
            | Opcode::ORIGIN
            | Opcode::CALLER
            | Opcode::CALLVALUE
            | Opcode::CALLDATASIZE
            | Opcode::CODESIZE
            | Opcode::GASPRICE
            | Opcode::RETURNDATASIZE
            | Opcode::COINBASE
            | Opcode::TIMESTAMP
            | Opcode::NUMBER
            | Opcode::PREVRANDAO
            | Opcode::GASLIMIT
            | Opcode::CHAINID
            | Opcode::SELFBALANCE
            | Opcode::BASEFEE
            | Opcode::PC
            | Opcode::MSIZE
            | Opcode::GAS
            | Opcode::PUSH0
            | Opcode::PUSH(_) => (0, 1),

            Opcode::ISZERO
            | Opcode::NOT
            | Opcode::BALANCE
            | Opcode::CALLDATALOAD
            | Opcode::EXTCODESIZE
            | Opcode::EXTCODEHASH
            | Opcode::BLOCKHASH
            | Opcode::MLOAD
            | Opcode::SLOAD => (1, 1),

            Opcode::ADD
            | Opcode::MUL
            | Opcode::SUB
            | Opcode::DIV
            | Opcode::SDIV
            | Opcode::MOD
            | Opcode::SMOD
            | Opcode::EXP
            | Opcode::SIGNEXTEND
            | Opcode::LT
            | Opcode::GT
            | Opcode::SLT
            | Opcode::SGT
            | Opcode::EQ
            | Opcode::AND
            | Opcode::OR
            | Opcode::XOR
            | Opcode::BYTE
            | Opcode::SHL
            | Opcode::SHR
            | Opcode::SAR
            | Opcode::KECCAK256 => (2, 1),

            Opcode::ADDMOD | Opcode::MULMOD => (3, 1),

            Opcode::POP | Opcode::JUMP | Opcode::SELFDESTRUCT => (1, 0),
            Opcode::MSTORE
            | Opcode::MSTORE8
            | Opcode::SSTORE
            | Opcode::JUMPI
            | Opcode::RETURN
            | Opcode::REVERT => (2, 0),
            Opcode::CALLDATACOPY | Opcode::CODECOPY | Opcode::RETURNDATACOPY => (3, 0),
            Opcode::EXTCODECOPY => (4, 0),

            Opcode::DUP(n) => (*n as usize, *n as usize + 1),
            Opcode::SWAP(n) => (*n as usize + 1, *n as usize + 1),
            Opcode::LOG(n) => (*n as usize + 2, 0),

            Opcode::CREATE => (3, 1),
            Opcode::CREATE2 => (4, 1),
            Opcode::CALL | Opcode::CALLCODE => (7, 1),
            Opcode::DELEGATECALL | Opcode::STATICCALL => (6, 1),
        }
    }

    /// Number of immediate bytes following the opcode byte.
    #[inline]
    pub fn immediate_size(&self) -> usize {
        match self {
            Opcode::PUSH(n) => *n as usize,
            _ => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::PUSH(n) => write!(f, "PUSH{n}"),
            Opcode::DUP(n) => write!(f, "DUP{n}"),
            Opcode::SWAP(n) => write!(f, "SWAP{n}"),
            Opcode::LOG(n) => write!(f, "LOG{n}"),
            Opcode::UNKNOWN(byte) => write!(f, "0x{byte:02x}"),
            other => write!(f, "{other:?}"),
        }
    }
}
