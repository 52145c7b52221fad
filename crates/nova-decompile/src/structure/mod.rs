//! Goto elimination: rebuilds nested statements from a [`BlockGraph`].
//!
//! The structurer walks the graph from the entry, emitting each block's
//! statements once. Two-way branches, switches, loops and protected ranges
//! open a nested region; every edge that leaves a region either reaches the
//! region's follow block (where structuring resumes after the construct) or
//! must resolve to a `break`/`continue` on an enclosing breakable. Any edge
//! that does neither is an [`StructureError::UnresolvedJump`].
//!
//! Loops come from [`LoopForest`], so irreducible graphs are rejected before
//! anything is emitted.

mod branches;
mod exceptions;
mod loops;
mod switch;

use std::collections::BTreeSet;

use nova_config::{StructureConfig, DECOMPILE_TARGET};
use nova_decompile_ast::{
    validate_breaks, validate_construct, BreakKind, BreakRegistry, BreakableId, BreakableKind,
    Statement, StatementBlock, Throw,
};
use nova_flow::{
    reverse_post_order, rpo_index, BasicBlock, BlockGraph, BlockId, Dominators, LoopForest,
    Terminator,
};

use crate::diagnostics::{diagnostic, DecompileDiagnosticKind, Diagnostic};
use crate::error::StructureError;

use self::exceptions::TryRegion;

/// A unit's structured body together with the break relations it uses.
#[derive(Debug, Clone)]
pub struct StructuredBody {
    pub body: StatementBlock,
    pub registry: BreakRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

/// Structures `graph` into a single statement block.
///
/// Blocks unreachable from the entry (and from the handlers of reachable
/// protected blocks) are dropped with an informational diagnostic.
pub fn structure(
    graph: &BlockGraph,
    config: &StructureConfig,
) -> Result<StructuredBody, StructureError> {
    let mut structurer = Structurer::new(graph, config)?;
    let mut body = StatementBlock::new();
    structurer.structure_sequence(Some(graph.entry()), None, &mut body)?;
    structurer.check_complete()?;

    if matches!(body.last(), Some(Statement::Return(None))) {
        body.pop();
    }
    if config.validate_breaks {
        validate_breaks(&body, &structurer.registry).map_err(StructureError::InvalidBreaks)?;
    }

    tracing::debug!(
        target: DECOMPILE_TARGET,
        blocks = graph.len(),
        breakables = structurer.registry.breakables().count(),
        "structured block graph"
    );
    Ok(StructuredBody {
        body,
        registry: structurer.registry,
        diagnostics: structurer.diagnostics,
    })
}

/// An enclosing breakable while its body is being structured.
#[derive(Debug, Clone)]
struct Context {
    id: BreakableId,
    kind: BreakableKind,
    /// Block where control lands after `break`.
    break_target: Option<BlockId>,
    /// Block where control lands after `continue`; `None` for switches.
    continue_target: Option<BlockId>,
    continues: usize,
}

impl Context {
    fn new(
        id: BreakableId,
        kind: BreakableKind,
        break_target: Option<BlockId>,
        continue_target: Option<BlockId>,
    ) -> Self {
        Self {
            id,
            kind,
            break_target,
            continue_target,
            continues: 0,
        }
    }
}

struct Structurer<'g> {
    graph: &'g BlockGraph,
    config: &'g StructureConfig,
    doms: Dominators,
    post_doms: Dominators,
    rpo: Vec<Option<usize>>,
    loops: LoopForest,
    reachable: Vec<bool>,
    taken: Vec<bool>,
    entered_loops: BTreeSet<BlockId>,
    tries: Vec<TryRegion>,
    contexts: Vec<Context>,
    regions: Vec<BTreeSet<BlockId>>,
    registry: BreakRegistry,
    diagnostics: Vec<Diagnostic>,
}

impl<'g> Structurer<'g> {
    fn new(graph: &'g BlockGraph, config: &'g StructureConfig) -> Result<Self, StructureError> {
        let doms = Dominators::compute(graph);
        let post_doms = Dominators::compute_post(graph);
        let order = reverse_post_order(graph);
        let rpo = rpo_index(&order, graph.len());
        let loops = LoopForest::compute(graph, &doms, &rpo)?;
        let reachable = graph.reachable_blocks();
        let tries = TryRegion::group(graph)?;

        let mut diagnostics = Vec::new();
        for block in graph.block_ids() {
            if reachable[block.index()] {
                continue;
            }
            tracing::debug!(target: DECOMPILE_TARGET, block = %block, "dropping unreachable block");
            diagnostics.push(diagnostic(
                DecompileDiagnosticKind::UnreachableBlock,
                format!("{block} is unreachable and was dropped"),
                Some(block),
            ));
        }

        let everything = graph
            .block_ids()
            .filter(|block| reachable[block.index()])
            .collect();

        Ok(Self {
            graph,
            config,
            doms,
            post_doms,
            rpo,
            loops,
            reachable,
            taken: vec![false; graph.len()],
            entered_loops: BTreeSet::new(),
            tries,
            contexts: Vec::new(),
            regions: vec![everything],
            registry: BreakRegistry::new(),
            diagnostics,
        })
    }

    fn check_complete(&self) -> Result<(), StructureError> {
        match self
            .graph
            .block_ids()
            .find(|block| self.reachable[block.index()] && !self.taken[block.index()])
        {
            Some(block) => Err(StructureError::Unstructured { block }),
            None => Ok(()),
        }
    }

    /// Structures `first` and its followers until control reaches `stop` or
    /// leaves the current construct.
    fn structure_sequence(
        &mut self,
        first: Option<BlockId>,
        stop: Option<BlockId>,
        out: &mut StatementBlock,
    ) -> Result<(), StructureError> {
        let mut current = first;
        while let Some(block) = current {
            if Some(block) == stop {
                break;
            }
            current = self.structure_block(block, stop, out)?;
        }
        Ok(())
    }

    /// Emits the construct starting at `block` and returns the block that
    /// follows it, if control continues in the current sequence.
    fn structure_block(
        &mut self,
        block: BlockId,
        stop: Option<BlockId>,
        out: &mut StatementBlock,
    ) -> Result<Option<BlockId>, StructureError> {
        if let Some(index) = self.pending_try(block) {
            if !self.loop_encloses_try(block, index) {
                return self.structure_try(index, stop, out);
            }
        }
        if self.loops.is_header(block) && !self.entered_loops.contains(&block) {
            return self.structure_loop(block, stop, out);
        }
        self.structure_plain(block, stop, out)
    }

    fn structure_plain(
        &mut self,
        block: BlockId,
        stop: Option<BlockId>,
        out: &mut StatementBlock,
    ) -> Result<Option<BlockId>, StructureError> {
        let bb = self.take_block(block)?;
        out.extend(bb.statements.iter().cloned());
        match &bb.terminator {
            Terminator::Goto { target } => self.flow_to(block, *target, stop, out),
            Terminator::If {
                condition,
                then_target,
                else_target,
            } => self.structure_if(
                block,
                condition.clone(),
                *then_target,
                *else_target,
                stop,
                out,
            ),
            Terminator::Switch {
                discriminant,
                cases,
                default,
            } => self.structure_switch(block, discriminant.clone(), cases, *default, stop, out),
            Terminator::Return { value } => {
                out.push(Statement::Return(value.clone()));
                Ok(None)
            }
            Terminator::Throw { exception } => {
                let throw = Throw::new(exception.clone())
                    .map_err(|source| StructureError::Constraint { block, source })?;
                out.push(Statement::Throw(throw));
                Ok(None)
            }
        }
    }

    /// Marks `block` as emitted. Each block is emitted exactly once.
    fn take_block(&mut self, block: BlockId) -> Result<&'g BasicBlock, StructureError> {
        let taken = &mut self.taken[block.index()];
        if *taken {
            return Err(StructureError::BlockStructuredTwice { block });
        }
        *taken = true;
        let graph: &'g BlockGraph = self.graph;
        Ok(graph.block(block))
    }

    /// Checks the breaks of a finished loop or switch against the registry
    /// while the constructs around it are still open.
    fn check_construct(&self, stmt: &Statement) -> Result<(), StructureError> {
        if !self.config.validate_breaks {
            return Ok(());
        }
        let open: Vec<BreakableId> = self.contexts.iter().map(|ctx| ctx.id).collect();
        validate_construct(stmt, &self.registry, &open).map_err(StructureError::InvalidBreaks)
    }

    fn is_taken(&self, block: BlockId) -> bool {
        self.taken[block.index()]
    }

    fn in_region(&self, block: BlockId) -> bool {
        self.regions
            .last()
            .is_some_and(|region| region.contains(&block))
    }

    fn rpo_of(&self, block: BlockId) -> usize {
        self.rpo[block.index()].unwrap_or(usize::MAX)
    }

    /// Whether an edge to `block` already means `break` or `continue`.
    fn is_jump_target(&self, block: BlockId) -> bool {
        self.contexts.iter().any(|ctx| {
            ctx.break_target == Some(block) || ctx.continue_target == Some(block)
        })
    }

    /// Runs `f` with the current region narrowed to `region`.
    fn with_region<T>(
        &mut self,
        region: BTreeSet<BlockId>,
        f: impl FnOnce(&mut Self) -> Result<T, StructureError>,
    ) -> Result<T, StructureError> {
        let narrowed = match self.regions.last() {
            Some(outer) => region.intersection(outer).copied().collect(),
            None => region,
        };
        self.regions.push(narrowed);
        let result = f(self);
        self.regions.pop();
        result
    }

    /// Runs `f` inside the breakable `ctx`. Also returns how many `continue`s
    /// were emitted against it.
    fn with_context<T>(
        &mut self,
        ctx: Context,
        f: impl FnOnce(&mut Self) -> Result<T, StructureError>,
    ) -> Result<(T, usize), StructureError> {
        let depth = self.contexts.len();
        self.contexts.push(ctx);
        let result = f(self);
        let continues = self
            .contexts
            .get(depth)
            .map_or(0, |ctx| ctx.continues);
        self.contexts.truncate(depth);
        result.map(|value| (value, continues))
    }

    /// Follows the edge `from -> target`.
    ///
    /// Returns the block to continue with, or `None` when the edge ends the
    /// current sequence (it reached `stop`, or became a `break`/`continue`).
    fn flow_to(
        &mut self,
        from: BlockId,
        target: BlockId,
        stop: Option<BlockId>,
        out: &mut StatementBlock,
    ) -> Result<Option<BlockId>, StructureError> {
        if Some(target) == stop {
            return Ok(None);
        }
        if let Some((depth, kind)) = self.resolve_jump(target) {
            self.emit_jump(from, depth, kind, out)?;
            return Ok(None);
        }
        if !self.in_region(target) || self.is_taken(target) {
            return Err(StructureError::UnresolvedJump { from, target });
        }
        Ok(Some(target))
    }

    /// Innermost context that an edge to `target` exits or restarts.
    fn resolve_jump(&self, target: BlockId) -> Option<(usize, BreakKind)> {
        self.contexts.iter().enumerate().rev().find_map(|(depth, ctx)| {
            if ctx.continue_target == Some(target) {
                Some((depth, BreakKind::Continue))
            } else if ctx.break_target == Some(target) {
                Some((depth, BreakKind::Break))
            } else {
                None
            }
        })
    }

    fn emit_jump(
        &mut self,
        from: BlockId,
        depth: usize,
        kind: BreakKind,
        out: &mut StatementBlock,
    ) -> Result<(), StructureError> {
        let target = self.contexts[depth].id;
        let mut brk = self.registry.new_break(kind);
        self.registry
            .register_break(target, &mut brk)
            .map_err(|source| StructureError::Registry {
                block: from,
                source,
            })?;

        // A bare `break` exits the innermost breakable; a bare `continue` the
        // innermost loop. Anything further out needs a label.
        let nested = self.contexts[depth + 1..]
            .iter()
            .any(|inner| kind == BreakKind::Break || inner.kind.is_loop());
        brk.set_nested(nested);
        if kind == BreakKind::Continue {
            self.contexts[depth].continues += 1;
        }

        tracing::trace!(
            target: DECOMPILE_TARGET,
            block = %from,
            breakable = %target,
            kind = ?kind,
            nested,
            "resolved jump"
        );
        out.push(Statement::Break(brk));
        Ok(())
    }
}
