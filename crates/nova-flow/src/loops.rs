//! Natural loop discovery.
//!
//! A back-edge is an edge `s -> h` where `h` dominates `s`. Every back-edge
//! into the same header contributes to one [`NaturalLoop`]. A retreating edge
//! (target not after the source in reverse post-order) that is not a
//! back-edge means the graph has a second entry into a cycle; such graphs are
//! rejected as irreducible.

use std::collections::{BTreeMap, BTreeSet};

use crate::cfg::{BlockGraph, BlockId};
use crate::dominators::Dominators;
use crate::error::FlowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalLoop {
    header: BlockId,
    latches: Vec<BlockId>,
    body: BTreeSet<BlockId>,
}

impl NaturalLoop {
    #[must_use]
    pub fn header(&self) -> BlockId {
        self.header
    }

    /// Sources of the back-edges, in block order.
    #[must_use]
    pub fn latches(&self) -> &[BlockId] {
        &self.latches
    }

    /// Header included.
    #[must_use]
    pub fn body(&self) -> &BTreeSet<BlockId> {
        &self.body
    }

    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.body.contains(&block)
    }

    /// Blocks outside the loop that a body block branches to.
    #[must_use]
    pub fn exit_targets(&self, graph: &BlockGraph) -> BTreeSet<BlockId> {
        self.body
            .iter()
            .flat_map(|block| graph.successors(*block))
            .filter(|succ| !self.body.contains(succ))
            .collect()
    }
}

/// All natural loops of a graph, keyed by header.
#[derive(Debug, Clone, Default)]
pub struct LoopForest {
    loops: BTreeMap<BlockId, NaturalLoop>,
}

impl LoopForest {
    /// `rpo_index` is the position of each block in reverse post-order, as
    /// returned by [`crate::rpo_index`].
    pub fn compute(
        graph: &BlockGraph,
        doms: &Dominators,
        rpo_index: &[Option<usize>],
    ) -> Result<Self, FlowError> {
        let mut latches: BTreeMap<BlockId, Vec<BlockId>> = BTreeMap::new();
        for source in graph.block_ids() {
            let Some(source_pos) = rpo_index[source.index()] else {
                continue;
            };
            for target in graph.successors(source) {
                let Some(target_pos) = rpo_index[target.index()] else {
                    continue;
                };
                if target_pos > source_pos {
                    continue;
                }
                if !doms.dominates(target, source) {
                    return Err(FlowError::Irreducible { block: target });
                }
                let entry = latches.entry(target).or_default();
                if !entry.contains(&source) {
                    entry.push(source);
                }
            }
        }

        let mut loops = BTreeMap::new();
        for (header, latches) in latches {
            let body = collect_body(graph, header, &latches, rpo_index);
            loops.insert(
                header,
                NaturalLoop {
                    header,
                    latches,
                    body,
                },
            );
        }

        let forest = Self { loops };
        forest.check_nesting()?;
        Ok(forest)
    }

    fn check_nesting(&self) -> Result<(), FlowError> {
        let all: Vec<&NaturalLoop> = self.loops.values().collect();
        for (idx, outer) in all.iter().enumerate() {
            for inner in &all[idx + 1..] {
                let shared = outer.body.intersection(&inner.body).count();
                if shared == 0 {
                    continue;
                }
                if shared != outer.body.len() && shared != inner.body.len() {
                    return Err(FlowError::AmbiguousLoop {
                        header: inner.header,
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, header: BlockId) -> Option<&NaturalLoop> {
        self.loops.get(&header)
    }

    #[must_use]
    pub fn is_header(&self, block: BlockId) -> bool {
        self.loops.contains_key(&block)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaturalLoop> {
        self.loops.values()
    }

    /// Innermost loop whose body contains `block`.
    #[must_use]
    pub fn innermost(&self, block: BlockId) -> Option<&NaturalLoop> {
        self.loops
            .values()
            .filter(|lp| lp.contains(block))
            .min_by_key(|lp| lp.body.len())
    }
}

/// Header plus every reachable block that reaches a latch without passing
/// through the header.
fn collect_body(
    graph: &BlockGraph,
    header: BlockId,
    latches: &[BlockId],
    rpo_index: &[Option<usize>],
) -> BTreeSet<BlockId> {
    let mut body = BTreeSet::from([header]);
    let mut stack: Vec<BlockId> = latches.to_vec();
    while let Some(block) = stack.pop() {
        if !body.insert(block) {
            continue;
        }
        stack.extend(
            graph
                .predecessors(block)
                .iter()
                .copied()
                .filter(|pred| rpo_index[pred.index()].is_some() && !body.contains(pred)),
        );
    }
    body
}
