use std::collections::HashSet;
use std::fmt;

use nova_decompile_ast::{Condition, Expr, Statement};

use crate::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl BlockId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Straight-line statements, already decoded. Control flow lives in the
    /// `terminator`.
    pub statements: Vec<Statement>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(statements: Vec<Statement>, terminator: Terminator) -> Self {
        Self {
            statements,
            terminator,
        }
    }

    pub fn successors(&self) -> Successors<'_> {
        self.terminator.successors()
    }
}

#[derive(Debug, Clone)]
pub enum Terminator {
    /// Unconditional jump; fall-through is a `Goto` to the next block.
    Goto { target: BlockId },
    /// Two-way branch: `then_target` when the condition holds.
    If {
        condition: Condition,
        then_target: BlockId,
        else_target: BlockId,
    },
    /// Jump-table dispatch. Several cases may share a target.
    Switch {
        discriminant: Expr,
        cases: Vec<(i32, BlockId)>,
        default: BlockId,
    },
    Return { value: Option<Expr> },
    Throw { exception: Expr },
}

impl Terminator {
    /// Successors in a fixed order: `then` before `else`, switch cases in
    /// table order followed by the default.
    #[must_use]
    pub fn successors(&self) -> Successors<'_> {
        match self {
            Terminator::Goto { target } => Successors::One(*target),
            Terminator::If {
                then_target,
                else_target,
                ..
            } => Successors::Two([*then_target, *else_target], 0),
            Terminator::Switch { cases, default, .. } => {
                Successors::Many(cases.iter(), Some(*default))
            }
            Terminator::Return { .. } | Terminator::Throw { .. } => Successors::None,
        }
    }

    /// Whether control leaves the unit here.
    #[must_use]
    pub fn is_exit(&self) -> bool {
        matches!(self, Terminator::Return { .. } | Terminator::Throw { .. })
    }
}

#[derive(Debug)]
pub enum Successors<'a> {
    None,
    One(BlockId),
    Two([BlockId; 2], usize),
    Many(std::slice::Iter<'a, (i32, BlockId)>, Option<BlockId>),
}

impl Iterator for Successors<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Successors::None => None,
            Successors::One(bb) => {
                let out = *bb;
                *self = Successors::None;
                Some(out)
            }
            Successors::Two(blocks, idx) => {
                let out = blocks.get(*idx).copied();
                *idx += 1;
                if *idx >= blocks.len() {
                    *self = Successors::None;
                }
                out
            }
            Successors::Many(iter, extra) => {
                if let Some((_, next)) = iter.next() {
                    return Some(*next);
                }
                extra.take()
            }
        }
    }
}

/// One exception-table row: blocks `start..end` are protected by `handler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start: BlockId,
    /// Exclusive.
    pub end: BlockId,
    pub handler: BlockId,
    /// Internal name of the caught class; `None` catches everything.
    pub catch_type: Option<String>,
}

impl ExceptionHandler {
    #[must_use]
    pub fn covers(&self, block: BlockId) -> bool {
        self.start <= block && block < self.end
    }
}

/// Validated input graph for one unit. The entry block is always `BlockId(0)`.
#[derive(Debug, Clone)]
pub struct BlockGraph {
    blocks: Vec<BasicBlock>,
    handlers: Vec<ExceptionHandler>,
    preds: Vec<Vec<BlockId>>,
}

impl BlockGraph {
    pub fn new(
        blocks: Vec<BasicBlock>,
        handlers: Vec<ExceptionHandler>,
    ) -> Result<Self, FlowError> {
        if blocks.is_empty() {
            return Err(FlowError::EmptyGraph);
        }
        let len = blocks.len();
        let in_range = |id: BlockId| id.index() < len;

        for (idx, block) in blocks.iter().enumerate() {
            let from = BlockId(idx);
            for target in block.successors() {
                if !in_range(target) {
                    return Err(FlowError::TargetOutOfRange {
                        block: from,
                        target,
                    });
                }
            }
            if let Terminator::Switch { cases, .. } = &block.terminator {
                let mut seen = HashSet::new();
                for (value, _) in cases {
                    if !seen.insert(*value) {
                        return Err(FlowError::DuplicateCase {
                            block: from,
                            value: *value,
                        });
                    }
                }
            }
        }

        for (index, handler) in handlers.iter().enumerate() {
            if handler.start >= handler.end || handler.end.index() > len {
                return Err(FlowError::InvalidHandlerRange {
                    index,
                    start: handler.start,
                    end: handler.end,
                });
            }
            if !in_range(handler.handler) {
                return Err(FlowError::TargetOutOfRange {
                    block: handler.start,
                    target: handler.handler,
                });
            }
            if handler.covers(handler.handler) {
                return Err(FlowError::HandlerInsideRange {
                    index,
                    handler: handler.handler,
                });
            }
        }

        let mut preds = vec![Vec::new(); len];
        for (idx, block) in blocks.iter().enumerate() {
            for to in block.successors() {
                if !preds[to.index()].contains(&BlockId(idx)) {
                    preds[to.index()].push(BlockId(idx));
                }
            }
        }

        Ok(Self {
            blocks,
            handlers,
            preds,
        })
    }

    #[must_use]
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId)
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn handlers(&self) -> &[ExceptionHandler] {
        &self.handlers
    }

    /// Normal-flow predecessors, deduplicated.
    #[must_use]
    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        &self.preds[id.index()]
    }

    pub fn successors(&self, id: BlockId) -> Successors<'_> {
        self.blocks[id.index()].successors()
    }

    /// Distinct handler entry blocks, in table order.
    #[must_use]
    pub fn handler_entries(&self) -> Vec<BlockId> {
        let mut entries = Vec::new();
        for handler in &self.handlers {
            if !entries.contains(&handler.handler) {
                entries.push(handler.handler);
            }
        }
        entries
    }

    /// Blocks reachable from the entry, following exception edges from any
    /// reachable protected block to its handlers.
    #[must_use]
    pub fn reachable_blocks(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.blocks.len()];
        let mut stack = vec![self.entry()];
        while let Some(bb) = stack.pop() {
            if reachable[bb.index()] {
                continue;
            }
            reachable[bb.index()] = true;
            stack.extend(self.successors(bb));
            stack.extend(
                self.handlers
                    .iter()
                    .filter(|handler| handler.covers(bb))
                    .map(|handler| handler.handler),
            );
        }
        reachable
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<BasicBlock>, Vec<ExceptionHandler>) {
        (self.blocks, self.handlers)
    }
}

/// Incremental construction of a [`BlockGraph`]; the first block is the entry.
#[derive(Debug, Default)]
pub struct BlockGraphBuilder {
    blocks: Vec<BasicBlock>,
    handlers: Vec<ExceptionHandler>,
}

impl BlockGraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty block ending in `return;`.
    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            statements: Vec::new(),
            terminator: Terminator::Return { value: None },
        });
        id
    }

    pub fn push_statement(&mut self, bb: BlockId, stmt: Statement) {
        self.blocks[bb.index()].statements.push(stmt);
    }

    pub fn set_terminator(&mut self, bb: BlockId, term: Terminator) {
        self.blocks[bb.index()].terminator = term;
    }

    pub fn add_handler(
        &mut self,
        start: BlockId,
        end: BlockId,
        handler: BlockId,
        catch_type: Option<&str>,
    ) {
        self.handlers.push(ExceptionHandler {
            start,
            end,
            handler,
            catch_type: catch_type.map(str::to_string),
        });
    }

    pub fn build(self) -> Result<BlockGraph, FlowError> {
        BlockGraph::new(self.blocks, self.handlers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_decompile_ast::{CompareOp, Local, Ty};

    fn cond() -> Condition {
        Condition::compare(
            CompareOp::Gt,
            Expr::local(Local::new(0, Ty::INT)),
            Expr::int(0),
        )
        .unwrap()
    }

    #[test]
    fn predecessors_are_deduplicated() {
        let mut builder = BlockGraphBuilder::new();
        let a = builder.new_block();
        let b = builder.new_block();
        builder.set_terminator(
            a,
            Terminator::If {
                condition: cond(),
                then_target: b,
                else_target: b,
            },
        );
        let graph = builder.build().unwrap();
        assert_eq!(graph.predecessors(b), &[a]);
        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b, b]);
    }

    #[test]
    fn out_of_range_targets_are_rejected() {
        let mut builder = BlockGraphBuilder::new();
        let a = builder.new_block();
        builder.set_terminator(a, Terminator::Goto { target: BlockId(7) });
        assert_eq!(
            builder.build().unwrap_err(),
            FlowError::TargetOutOfRange {
                block: a,
                target: BlockId(7)
            }
        );
    }

    #[test]
    fn handler_table_is_validated() {
        let mut builder = BlockGraphBuilder::new();
        let a = builder.new_block();
        let b = builder.new_block();
        builder.set_terminator(a, Terminator::Goto { target: b });
        builder.add_handler(a, b, a, None);
        assert!(matches!(
            builder.build(),
            Err(FlowError::HandlerInsideRange { .. })
        ));

        let mut builder = BlockGraphBuilder::new();
        let a = builder.new_block();
        builder.add_handler(a, a, a, None);
        assert!(matches!(
            builder.build(),
            Err(FlowError::InvalidHandlerRange { .. })
        ));
    }

    #[test]
    fn handlers_are_reachable_through_protected_blocks() {
        let mut builder = BlockGraphBuilder::new();
        let body = builder.new_block();
        let handler = builder.new_block();
        let _unreachable = builder.new_block();
        builder.add_handler(body, handler, handler, Some("java/io/IOException"));
        let graph = builder.build().unwrap();

        assert_eq!(graph.reachable_blocks(), vec![true, true, false]);
    }

    #[test]
    fn switch_successors_end_with_default() {
        let mut builder = BlockGraphBuilder::new();
        let head = builder.new_block();
        let one = builder.new_block();
        let other = builder.new_block();
        builder.set_terminator(
            head,
            Terminator::Switch {
                discriminant: Expr::local(Local::new(0, Ty::INT)),
                cases: vec![(1, one), (2, one)],
                default: other,
            },
        );
        let graph = builder.build().unwrap();
        assert_eq!(
            graph.successors(head).collect::<Vec<_>>(),
            vec![one, one, other]
        );
    }
}
