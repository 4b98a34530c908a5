use vigil_core::decoder::{decode_bytecode, disassemble, input_to_bytes};
use vigil_core::Opcode;

#[test]
fn test_push_immediates_are_captured() {
    let (instructions, _) = decode_bytecode("0x6001600201").expect("valid bytecode");
    assert_eq!(instructions.len(), 3);

    assert_eq!(instructions[0].pc, 0);
    assert_eq!(instructions[0].op, Opcode::PUSH(1));
    assert_eq!(instructions[0].imm.as_deref(), Some("01"));

    assert_eq!(instructions[1].pc, 2);
    assert_eq!(instructions[1].op, Opcode::PUSH(1));
    assert_eq!(instructions[1].imm.as_deref(), Some("02"));

    assert_eq!(instructions[2].pc, 4);
    assert_eq!(instructions[2].op, Opcode::ADD);
    assert_eq!(instructions[2].imm, None);
}

#[test]
fn test_pc_is_the_opcode_byte_offset() {
    let (instructions, _) = decode_bytecode("0x6001565b00").expect("valid bytecode");
    let pcs: Vec<usize> = instructions.iter().map(|ins| ins.pc).collect();
    assert_eq!(pcs, vec![0, 2, 3, 4]);
    assert_eq!(instructions[1].op, Opcode::JUMP);
    assert_eq!(instructions[2].op, Opcode::JUMPDEST);
    assert_eq!(instructions[3].op, Opcode::STOP);
}

#[test]
fn test_truncated_push_is_zero_padded() {
    let (instructions, _) = decode_bytecode("0x61ff").expect("valid bytecode");
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].op, Opcode::PUSH(2));
    assert_eq!(instructions[0].imm.as_deref(), Some("ff00"));
}

#[test]
fn test_unknown_byte_renders_as_hex() {
    let (instructions, _) = decode_bytecode("0x0c").expect("valid bytecode");
    assert_eq!(instructions[0].op, Opcode::UNKNOWN(0x0c));
    assert_eq!(instructions[0].op.to_string(), "0x0c");
    assert_eq!(instructions[0].byte_size(), 1);
}

#[test]
fn test_odd_length_input_is_rejected() {
    assert!(decode_bytecode("0x123").is_err());
    assert!(input_to_bytes("abc").is_err());
}

#[test]
fn test_non_hex_input_is_rejected() {
    assert!(decode_bytecode("0xzz").is_err());
    assert!(decode_bytecode("hello world").is_err());
}

#[test]
fn test_empty_input_decodes_to_nothing() {
    for input in ["", "0x"] {
        let (instructions, bytes) = decode_bytecode(input).expect("empty input is valid");
        assert!(instructions.is_empty());
        assert!(bytes.is_empty());
    }
}

#[test]
fn test_prefix_is_optional() {
    let with_prefix = decode_bytecode("0x6001").unwrap();
    let without_prefix = decode_bytecode("6001").unwrap();
    assert_eq!(with_prefix, without_prefix);
}

#[test]
fn test_opcode_byte_round_trip() {
    for byte in 0u8..=0xff {
        assert_eq!(Opcode::from_byte(byte).as_byte(), byte, "byte 0x{byte:02x}");
    }
}

#[test]
fn test_static_stack_arity() {
    assert_eq!(Opcode::DELEGATECALL.stack_io(), (6, 1));
    assert_eq!(Opcode::CALL.stack_io(), (7, 1));
    assert_eq!(Opcode::PUSH(1).stack_io(), (0, 1));
    assert_eq!(Opcode::DUP(3).stack_io(), (3, 4));
    assert_eq!(Opcode::SWAP(2).stack_io(), (3, 3));
    assert_eq!(Opcode::CALLDATACOPY.stack_io(), (3, 0));
    assert_eq!(Opcode::SLOAD.stack_io(), (1, 1));
}

#[test]
fn test_display_formats_push_with_immediate() {
    let (instructions, _) = decode_bytecode("0x602b").unwrap();
    assert_eq!(instructions[0].to_string(), "000000  PUSH1    0x2b");
}

#[test]
fn test_disassemble_walks_every_byte() {
    let bytes = hex::decode("6001600201").unwrap();
    let instructions = disassemble(&bytes);
    let total: usize = instructions.iter().map(|ins| ins.byte_size()).sum();
    assert_eq!(total, bytes.len());
}
