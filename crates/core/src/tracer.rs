//! Symbolic stack tracing.
//!
//! A forward abstract interpretation over the CFG recovers, for each
//! DELEGATECALL, the symbolic stack immediately before the call executes.
//! Precision degrades to [`StackExpr::Unknown`] instead of erroring, so the
//! tracer is total on any instruction stream.

use crate::cfg::Cfg;
use crate::classify::{classify_target, Classification};
use crate::decoder::Instruction;
use crate::opcode::Opcode;
use crate::patterns::PatternMatch;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Opaque environment sources the EVM exposes without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvSource {
    Caller,
    Address,
    Origin,
}

impl fmt::Display for EnvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvSource::Caller => write!(f, "CALLER"),
            EnvSource::Address => write!(f, "ADDRESS"),
            EnvSource::Origin => write!(f, "ORIGIN"),
        }
    }
}

/// Symbolic value occupying one abstract stack slot.
///
/// Equality and hashing are structural; the fixed point relies on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StackExpr {
    /// PUSH immediate, lowercase hex without `0x`.
    Literal(String),
    /// Value loaded from storage at the given slot expression.
    Storage(Box<StackExpr>),
    /// Value loaded from calldata at the given offset expression.
    Calldata(Box<StackExpr>),
    /// Opaque environment source.
    Env(EnvSource),
    /// Arithmetic or logical operation over argument expressions.
    Op { op: String, args: Vec<StackExpr> },
    /// Provenance lost: join of distinct values, unmodeled output, or an
    /// out-of-bounds read.
    Unknown,
}

impl fmt::Display for StackExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackExpr::Literal(v) => write!(f, "0x{v}"),
            StackExpr::Storage(slot) => write!(f, "SLOAD({slot})"),
            StackExpr::Calldata(offset) => write!(f, "CALLDATALOAD({offset})"),
            StackExpr::Env(source) => write!(f, "{source}"),
            StackExpr::Op { op, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", op, rendered.join(", "))
            }
            StackExpr::Unknown => write!(f, "?"),
        }
    }
}

/// Abstract machine state: the symbolic stack, top at the end.
///
/// Memory is approximated away entirely: stores discard their operands and
/// loads produce `Unknown`, so no memory map is carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbstractState {
    pub stack: Vec<StackExpr>,
}

impl AbstractState {
    fn pop(&mut self) -> StackExpr {
        self.stack.pop().unwrap_or(StackExpr::Unknown)
    }

    fn push(&mut self, expr: StackExpr) {
        self.stack.push(expr);
    }
}

/// A DELEGATECALL site recovered during tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Stable identifier derived from the PC.
    pub id: String,
    pub pc: usize,
    /// Leader PC of the containing block; absent in linear mode.
    pub block: Option<usize>,
    /// Symbolic expression consumed as the call's target address.
    pub target: StackExpr,
    pub classification: Classification,
    /// Attached later by the pattern detector.
    pub pattern: Option<PatternMatch>,
    pub note: Option<String>,
}

/// Applies one instruction's transfer function to the abstract state.
pub fn apply_instruction(state: &mut AbstractState, ins: &Instruction) {
    match ins.op {
        Opcode::PUSH(_) => {
            let imm = ins.imm.clone().unwrap_or_default();
            state.push(StackExpr::Literal(imm));
        }
        Opcode::PUSH0 => state.push(StackExpr::Literal("00".to_string())),
        Opcode::DUP(n) => {
            let depth = n as usize;
            if state.stack.len() >= depth {
                let expr = state.stack[state.stack.len() - depth].clone();
                state.push(expr);
            } else {
                state.push(StackExpr::Unknown);
            }
        }
        Opcode::SWAP(n) => {
            let depth = n as usize;
            let len = state.stack.len();
            if len >= depth + 1 {
                state.stack.swap(len - 1, len - 1 - depth);
            }
        }
        Opcode::CALLDATALOAD => {
            let offset = state.pop();
            state.push(StackExpr::Calldata(Box::new(offset)));
        }
        Opcode::SLOAD => {
            let slot = state.pop();
            state.push(StackExpr::Storage(Box::new(slot)));
        }
        Opcode::CALLER => state.push(StackExpr::Env(EnvSource::Caller)),
        Opcode::ADDRESS => state.push(StackExpr::Env(EnvSource::Address)),
        Opcode::ORIGIN => state.push(StackExpr::Env(EnvSource::Origin)),
        Opcode::MLOAD => {
            state.pop();
            state.push(StackExpr::Unknown);
        }
        Opcode::MSTORE | Opcode::MSTORE8 => {
            state.pop();
            state.pop();
        }
        Opcode::POP => {
            state.pop();
        }
        Opcode::ADD
        | Opcode::SUB
        | Opcode::MUL
        | Opcode::DIV
        | Opcode::MOD
        | Opcode::AND
        | Opcode::OR
        | Opcode::XOR
        | Opcode::EQ
        | Opcode::LT
        | Opcode::GT => {
            let b = state.pop();
            let a = state.pop();
            state.push(StackExpr::Op {
                op: ins.op.to_string(),
                args: vec![a, b],
            });
        }
        Opcode::ISZERO => {
            let a = state.pop();
            state.push(StackExpr::Op {
                op: "ISZERO".to_string(),
                args: vec![a],
            });
        }
        // Unmapped byte: strip one slot and move on.
        Opcode::UNKNOWN(_) => {
            state.pop();
        }
        other => {
            let (stack_in, stack_out) = other.stack_io();
            for _ in 0..stack_in {
                state.pop();
            }
            for _ in 0..stack_out {
                state.push(StackExpr::Unknown);
            }
        }
    }
}

/// Joins two abstract states.
///
/// Differing stack depths collapse to the common depth of `Unknown`; where
/// depths match, slots are kept when structurally equal and widened to
/// `Unknown` otherwise.
pub fn join_states(a: &AbstractState, b: &AbstractState) -> AbstractState {
    if a.stack.len() != b.stack.len() {
        let depth = a.stack.len().min(b.stack.len());
        return AbstractState {
            stack: vec![StackExpr::Unknown; depth],
        };
    }
    let stack = a
        .stack
        .iter()
        .zip(&b.stack)
        .map(|(lhs, rhs)| {
            if lhs == rhs {
                lhs.clone()
            } else {
                StackExpr::Unknown
            }
        })
        .collect();
    AbstractState { stack }
}

/// Computes the symbolic stack immediately before the instruction at
/// `target_pc` executes, using a worklist fixed point over the CFG.
pub fn stack_before(cfg: &Cfg, target_pc: usize) -> AbstractState {
    let Some(target_node) = cfg.containing_block(target_pc) else {
        return AbstractState::default();
    };
    let target_leader = cfg.block(target_node).start_pc;

    // Recorded output state per leader PC.
    let mut states: HashMap<usize, AbstractState> = HashMap::new();

    let mut worklist: VecDeque<usize> = VecDeque::new();
    let mut queued: HashSet<usize> = HashSet::new();
    worklist.push_back(target_leader);
    queued.insert(target_leader);

    let mut iterations = 0usize;
    while let Some(leader) = worklist.pop_front() {
        queued.remove(&leader);
        iterations += 1;

        let node = match cfg.pc_to_block.get(&leader) {
            Some(node) => *node,
            None => continue,
        };

        let input = block_input(cfg, node, &states);
        let mut output = input;
        for ins in &cfg.block(node).instructions {
            apply_instruction(&mut output, ins);
        }

        if states.get(&leader) != Some(&output) {
            states.insert(leader, output);
            for succ in cfg.successors(node) {
                let succ_leader = cfg.block(succ).start_pc;
                if queued.insert(succ_leader) {
                    worklist.push_back(succ_leader);
                }
            }
        }
    }
    tracing::debug!(
        "fixed point for pc {:#x} converged after {} block visits",
        target_pc,
        iterations
    );

    // Replay the block up to (but not into) the target instruction.
    let mut state = block_input(cfg, target_node, &states);
    for ins in &cfg.block(target_node).instructions {
        if ins.pc == target_pc {
            break;
        }
        apply_instruction(&mut state, ins);
    }
    state
}

/// Input state of a block: the join of every already-seen predecessor
/// output. Blocks without predecessors (the entry block, unresolved jump
/// destinations) start from the empty state.
fn block_input(
    cfg: &Cfg,
    node: petgraph::graph::NodeIndex,
    states: &HashMap<usize, AbstractState>,
) -> AbstractState {
    let preds: Vec<_> = cfg.predecessors(node).collect();
    if preds.is_empty() {
        return AbstractState::default();
    }

    let mut seen = preds
        .iter()
        .filter_map(|pred| states.get(&cfg.block(*pred).start_pc));
    let first = match seen.next() {
        Some(state) => state.clone(),
        None => return AbstractState::default(),
    };
    seen.fold(first, |acc, next| join_states(&acc, next))
}

/// Picks the expression the EVM will consume as the DELEGATECALL target.
///
/// The `to` operand sits at depth 2 from the top. A one-slot stack degrades
/// to its only expression; an empty stack yields `Unknown`.
pub fn delegatecall_target(stack: &[StackExpr]) -> StackExpr {
    match stack.len() {
        0 => StackExpr::Unknown,
        1 => stack[0].clone(),
        len => stack[len - 2].clone(),
    }
}

/// Collects every DELEGATECALL site using CFG-based tracing.
pub fn collect_sites(cfg: &Cfg, instructions: &[Instruction]) -> Vec<CallSite> {
    instructions
        .iter()
        .filter(|ins| ins.op == Opcode::DELEGATECALL)
        .map(|ins| {
            let state = stack_before(cfg, ins.pc);
            let block = cfg
                .containing_block(ins.pc)
                .map(|node| cfg.block(node).start_pc);
            make_site(ins.pc, block, &state)
        })
        .collect()
}

/// Collects sites with the linear fallback: one transfer-function pass over
/// the stream, ignoring control flow.
pub fn collect_sites_linear(instructions: &[Instruction]) -> Vec<CallSite> {
    let mut state = AbstractState::default();
    let mut sites = Vec::new();
    for ins in instructions {
        if ins.op == Opcode::DELEGATECALL {
            sites.push(make_site(ins.pc, None, &state));
        }
        apply_instruction(&mut state, ins);
    }
    sites
}

fn make_site(pc: usize, block: Option<usize>, state: &AbstractState) -> CallSite {
    let target = delegatecall_target(&state.stack);
    let classification = classify_target(&target);
    let note = state
        .stack
        .is_empty()
        .then(|| "stack empty at call site; target not recoverable".to_string());
    CallSite {
        id: format!("site-{pc}"),
        pc,
        block,
        target,
        classification,
        pattern: None,
        note,
    }
}
