use std::collections::BTreeSet;

use nova_config::DECOMPILE_TARGET;
use nova_decompile_ast::{CatchClause, StatementBlock, TryCatch};
use nova_flow::{BlockGraph, BlockId};

use super::Structurer;
use crate::error::StructureError;

/// Exception-table rows sharing one protected range.
#[derive(Debug, Clone)]
pub(super) struct TryRegion {
    start: BlockId,
    end: BlockId,
    clauses: Vec<CatchGroup>,
    done: bool,
}

/// Rows of a region that share a handler block.
#[derive(Debug, Clone)]
struct CatchGroup {
    handler: BlockId,
    types: Vec<String>,
    catch_all: bool,
}

impl TryRegion {
    /// Groups the table by range, keeping table order. Ranges must nest and
    /// each handler's rows must be contiguous within its range.
    pub(super) fn group(graph: &BlockGraph) -> Result<Vec<TryRegion>, StructureError> {
        let mut regions: Vec<TryRegion> = Vec::new();
        for row in graph.handlers() {
            let index = match regions
                .iter()
                .position(|region| region.start == row.start && region.end == row.end)
            {
                Some(index) => index,
                None => {
                    regions.push(TryRegion {
                        start: row.start,
                        end: row.end,
                        clauses: Vec::new(),
                        done: false,
                    });
                    regions.len() - 1
                }
            };
            let region = &mut regions[index];
            // A handler's rows merge only while adjacent in the table.
            let continues_last = region
                .clauses
                .last()
                .is_some_and(|group| group.handler == row.handler);
            if !continues_last
                && region
                    .clauses
                    .iter()
                    .any(|group| group.handler == row.handler)
            {
                return Err(StructureError::InterleavedHandlers {
                    block: row.handler,
                });
            }
            if !continues_last {
                region.clauses.push(CatchGroup {
                    handler: row.handler,
                    types: Vec::new(),
                    catch_all: false,
                });
            }
            let Some(group) = region.clauses.last_mut() else {
                continue;
            };
            match &row.catch_type {
                Some(ty) if !group.types.contains(ty) => group.types.push(ty.clone()),
                Some(_) => {}
                None => group.catch_all = true,
            }
        }

        for (idx, outer) in regions.iter().enumerate() {
            for inner in &regions[idx + 1..] {
                let overlaps = outer.start < inner.end && inner.start < outer.end;
                let nested = (outer.start <= inner.start && inner.end <= outer.end)
                    || (inner.start <= outer.start && outer.end <= inner.end);
                if overlaps && !nested {
                    return Err(StructureError::OverlappingHandlers {
                        block: inner.start.max(outer.start),
                    });
                }
            }
        }
        Ok(regions)
    }

    fn blocks(&self) -> impl Iterator<Item = BlockId> {
        (self.start.index()..self.end.index()).map(BlockId)
    }

    fn handlers(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.clauses.iter().map(|group| group.handler)
    }
}

impl Structurer<'_> {
    /// Outermost region starting at `block` that has not been emitted yet.
    pub(super) fn pending_try(&self, block: BlockId) -> Option<usize> {
        self.tries
            .iter()
            .enumerate()
            .filter(|(_, region)| region.start == block && !region.done)
            .max_by_key(|(_, region)| region.end)
            .map(|(index, _)| index)
    }

    /// Whether the loop headed at `block` contains the whole protected range
    /// of region `index` (and is strictly larger), so the loop goes outside.
    pub(super) fn loop_encloses_try(&self, block: BlockId, index: usize) -> bool {
        if self.entered_loops.contains(&block) {
            return false;
        }
        let Some(lp) = self.loops.get(block) else {
            return false;
        };
        let range = self.protected_blocks(&self.tries[index]);
        range.is_subset(lp.body()) && !lp.body().is_subset(&range)
    }

    fn protected_blocks(&self, region: &TryRegion) -> BTreeSet<BlockId> {
        region
            .blocks()
            .filter(|block| self.reachable[block.index()])
            .collect()
    }

    /// First block after the protected range: the earliest (in reverse
    /// post-order) normal successor of a range block that lies outside it.
    fn try_merge(&self, region: &TryRegion, range: &BTreeSet<BlockId>) -> Option<BlockId> {
        let handlers: BTreeSet<BlockId> = region.handlers().collect();
        range
            .iter()
            .flat_map(|block| self.graph.successors(*block))
            .filter(|succ| {
                !range.contains(succ)
                    && !handlers.contains(succ)
                    && !self.is_jump_target(*succ)
                    && self.reachable[succ.index()]
            })
            .min_by_key(|succ| self.rpo_of(*succ))
    }

    pub(super) fn structure_try(
        &mut self,
        index: usize,
        stop: Option<BlockId>,
        out: &mut StatementBlock,
    ) -> Result<Option<BlockId>, StructureError> {
        self.tries[index].done = true;
        let region = self.tries[index].clone();
        let range = self.protected_blocks(&region);
        let merge = self.try_merge(&region, &range);
        let body_stop = merge.or(stop);
        tracing::trace!(
            target: DECOMPILE_TARGET,
            start = %region.start,
            end = %region.end,
            handlers = region.clauses.len(),
            merge = ?merge,
            "protected range"
        );

        let mut body = StatementBlock::new();
        self.with_region(range, |this| {
            this.structure_sequence(Some(region.start), body_stop, &mut body)
        })?;

        let mut catches = Vec::with_capacity(region.clauses.len());
        for group in &region.clauses {
            if self.is_taken(group.handler) {
                return Err(StructureError::OverlappingHandlers {
                    block: group.handler,
                });
            }
            let mut handler_body = StatementBlock::new();
            self.structure_sequence(Some(group.handler), body_stop, &mut handler_body)?;
            let types = if group.catch_all {
                Vec::new()
            } else {
                group.types.clone()
            };
            catches.push(CatchClause::new(types, handler_body));
        }
        out.push(TryCatch::new(body, catches).into());

        match merge {
            Some(merge) if Some(merge) != stop => self.flow_to(region.start, merge, stop, out),
            _ => Ok(None),
        }
    }
}
