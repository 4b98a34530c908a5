use vigil_core::cfg::{build_cfg, Cfg};
use vigil_core::decoder::decode_bytecode;

fn cfg_for(input: &str) -> Cfg {
    let (instructions, _) = decode_bytecode(input).expect("valid bytecode");
    build_cfg(&instructions)
}

#[test]
fn test_leaders_at_jumpdest_and_after_terminators() {
    // PUSH1 01; PUSH1 02; JUMPI | STOP | JUMPDEST; STOP
    let cfg = cfg_for("0x6001600257005b00");
    let leaders: Vec<usize> = cfg.pc_to_block.keys().copied().collect();
    assert_eq!(leaders, vec![0, 5, 6]);

    let entry = cfg.entry.expect("program starts at pc 0");
    assert_eq!(cfg.block(entry).start_pc, 0);
    assert_eq!(cfg.block(entry).end_pc, 4);
}

#[test]
fn test_jumpi_gets_a_fallthrough_edge_only() {
    let cfg = cfg_for("0x6001600257005b00");
    let entry = cfg.entry.unwrap();
    let succs: Vec<usize> = cfg
        .successors(entry)
        .map(|node| cfg.block(node).start_pc)
        .collect();
    assert_eq!(succs, vec![5], "the taken edge stays unresolved");
}

#[test]
fn test_jump_has_no_static_successors() {
    // PUSH1 04; JUMP | STOP | JUMPDEST; STOP
    let cfg = cfg_for("0x600456005b00");
    let entry = cfg.entry.unwrap();
    assert_eq!(cfg.successors(entry).count(), 0);
}

#[test]
fn test_terminal_blocks_have_no_successors() {
    // STOP | PUSH1 00; RETURN... second block never reached statically
    let cfg = cfg_for("0x00600052");
    for node in cfg.graph.node_indices() {
        let block = cfg.block(node);
        if block.instructions.last().map(|ins| ins.op.to_string()) == Some("STOP".to_string()) {
            assert_eq!(cfg.successors(node).count(), 0);
        }
    }
}

#[test]
fn test_straight_line_fallthrough_chain() {
    // JUMPDEST splits force three blocks chained by fallthrough.
    let cfg = cfg_for("0x60015b60025b6003");
    let leaders: Vec<usize> = cfg.pc_to_block.keys().copied().collect();
    assert_eq!(leaders, vec![0, 2, 5]);

    let chain: Vec<usize> = leaders
        .iter()
        .filter_map(|leader| {
            let node = cfg.pc_to_block[leader];
            cfg.successors(node)
                .next()
                .map(|succ| cfg.block(succ).start_pc)
        })
        .collect();
    assert_eq!(chain, vec![2, 5]);
}

#[test]
fn test_built_cfgs_pass_validation() {
    for input in [
        "0x6001600257005b00",
        "0x600456005b00",
        "0x60015b60025b6003",
        "0x6001600257005b60015b600200",
    ] {
        cfg_for(input).validate().expect("freshly built CFG is consistent");
    }
}

#[test]
fn test_successor_predecessor_links_are_mirrored() {
    let cfg = cfg_for("0x6001600257005b60015b600200");
    for node in cfg.graph.node_indices() {
        for succ in cfg.successors(node) {
            assert!(
                cfg.predecessors(succ).any(|pred| pred == node),
                "block {} missing from predecessors of {}",
                cfg.block(node).start_pc,
                cfg.block(succ).start_pc
            );
        }
        for pred in cfg.predecessors(node) {
            assert!(
                cfg.successors(pred).any(|succ| succ == node),
                "block {} missing from successors of {}",
                cfg.block(node).start_pc,
                cfg.block(pred).start_pc
            );
        }
    }
}

#[test]
fn test_containing_block_lookup() {
    let cfg = cfg_for("0x600456005b00");
    let block_of = |pc: usize| {
        cfg.containing_block(pc)
            .map(|node| cfg.block(node).start_pc)
    };
    assert_eq!(block_of(0), Some(0));
    assert_eq!(block_of(2), Some(0));
    assert_eq!(block_of(3), Some(3));
    assert_eq!(block_of(5), Some(4));
    assert_eq!(block_of(100), None);
}

#[test]
fn test_empty_program_builds_an_empty_cfg() {
    let cfg = cfg_for("0x");
    assert!(cfg.entry.is_none());
    assert_eq!(cfg.graph.node_count(), 0);
}

#[test]
fn test_every_instruction_belongs_to_exactly_one_block() {
    let input = "0x6001600257005b60015b600200";
    let (instructions, _) = decode_bytecode(input).unwrap();
    let cfg = build_cfg(&instructions);

    let mut owned = 0usize;
    for node in cfg.graph.node_indices() {
        owned += cfg.block(node).instructions.len();
    }
    assert_eq!(owned, instructions.len());
}
