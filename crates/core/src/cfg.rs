//! Control-flow graph over the instruction stream.
//!
//! Blocks are keyed by their leader PC; edges carry only statically
//! determinable control flow. JUMP targets and taken JUMPI edges are
//! data-dependent and stay unresolved.

use crate::decoder::Instruction;
use crate::opcode::Opcode;
use crate::result::{Error, Result};
use crate::{is_block_ending_opcode, is_terminal_opcode};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::Direction;
use std::collections::BTreeMap;

/// Maximal straight-line instruction run with a single entry and exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Leader PC, also the block's identifier.
    pub start_pc: usize,
    /// PC of the last instruction (inclusive).
    pub end_pc: usize,
    pub instructions: Vec<Instruction>,
}

/// Statically known control transfer between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Execution runs off the end of the block into the next one.
    Fallthrough,
    /// The not-taken side of a JUMPI.
    BranchFalse,
}

/// CFG bundle: block graph plus the leader-PC index.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub graph: StableDiGraph<BasicBlock, EdgeKind>,
    /// Leader PC to node, ordered so containing-block lookups can range-scan.
    pub pc_to_block: BTreeMap<usize, NodeIndex>,
    /// The block whose leader is 0, when the program is non-empty.
    pub entry: Option<NodeIndex>,
}

impl Cfg {
    /// Block weight accessor.
    pub fn block(&self, node: NodeIndex) -> &BasicBlock {
        &self.graph[node]
    }

    /// Looks up a block by its leader PC.
    pub fn block_at(&self, leader_pc: usize) -> Option<&BasicBlock> {
        self.pc_to_block.get(&leader_pc).map(|node| &self.graph[*node])
    }

    /// Finds the block containing the instruction at `pc`.
    pub fn containing_block(&self, pc: usize) -> Option<NodeIndex> {
        let (_, node) = self.pc_to_block.range(..=pc).next_back()?;
        if pc <= self.graph[*node].end_pc {
            Some(*node)
        } else {
            None
        }
    }

    /// Leader PCs of the blocks that can transfer control into `node`.
    pub fn predecessors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Incoming)
    }

    /// Leader PCs of the blocks `node` can transfer control to.
    pub fn successors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Outgoing)
    }

    /// Checks structural consistency: every leader maps to a live node and
    /// block boundaries enclose their instructions.
    pub fn validate(&self) -> Result<()> {
        for (leader, node) in &self.pc_to_block {
            let Some(block) = self.graph.node_weight(*node) else {
                return Err(Error::InvalidBlockStructure(format!(
                    "leader 0x{leader:x} maps to a removed node"
                )));
            };
            if block.start_pc != *leader {
                return Err(Error::InvalidBlockStructure(format!(
                    "leader 0x{:x} maps to block starting at 0x{:x}",
                    leader, block.start_pc
                )));
            }
            let out_of_bounds = block
                .instructions
                .iter()
                .any(|ins| ins.pc < block.start_pc || ins.pc > block.end_pc);
            if block.instructions.is_empty() || out_of_bounds {
                return Err(Error::InvalidBlockStructure(format!(
                    "block 0x{:x} does not enclose its instructions",
                    block.start_pc
                )));
            }
        }
        Ok(())
    }
}

/// Builds the CFG for an instruction stream.
pub fn build_cfg(instructions: &[Instruction]) -> Cfg {
    let blocks = split_blocks(instructions);

    let mut graph = StableDiGraph::new();
    let mut pc_to_block = BTreeMap::new();
    let mut ordered = Vec::with_capacity(blocks.len());

    for block in blocks {
        let start_pc = block.start_pc;
        let node = graph.add_node(block);
        pc_to_block.insert(start_pc, node);
        ordered.push(node);
    }

    connect_blocks(&mut graph, &ordered);

    let entry = pc_to_block.get(&0).copied();
    tracing::debug!(
        "built CFG: {} blocks, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    Cfg {
        graph,
        pc_to_block,
        entry,
    }
}

/// Breaks the instruction stream into basic blocks.
///
/// A new block starts at the first instruction, at every JUMPDEST, and after
/// every block-ending opcode (terminals plus JUMP/JUMPI).
fn split_blocks(instructions: &[Instruction]) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<Instruction> = Vec::new();

    let flush = |current: &mut Vec<Instruction>, blocks: &mut Vec<BasicBlock>| {
        if current.is_empty() {
            return;
        }
        let start_pc = current[0].pc;
        let end_pc = current[current.len() - 1].pc;
        blocks.push(BasicBlock {
            start_pc,
            end_pc,
            instructions: std::mem::take(current),
        });
    };

    for ins in instructions {
        if matches!(ins.op, Opcode::JUMPDEST) {
            flush(&mut current, &mut blocks);
        }
        current.push(ins.clone());
        if is_block_ending_opcode(ins.op) {
            flush(&mut current, &mut blocks);
        }
    }
    flush(&mut current, &mut blocks);

    blocks
}

/// Wires up fallthrough and branch-false edges between adjacent blocks.
fn connect_blocks(graph: &mut StableDiGraph<BasicBlock, EdgeKind>, ordered: &[NodeIndex]) {
    for (idx, node) in ordered.iter().enumerate() {
        let last_op = match graph[*node].instructions.last() {
            Some(ins) => ins.op,
            None => continue,
        };
        let next = ordered.get(idx + 1).copied();

        match last_op {
            // Target is data-dependent; no static successor.
            Opcode::JUMP => {}
            Opcode::JUMPI => {
                if let Some(next) = next {
                    graph.add_edge(*node, next, EdgeKind::BranchFalse);
                }
            }
            op if is_terminal_opcode(op) => {}
            _ => {
                if let Some(next) = next {
                    graph.add_edge(*node, next, EdgeKind::Fallthrough);
                }
            }
        }
    }
}
