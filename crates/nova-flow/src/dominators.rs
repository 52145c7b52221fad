//! Dominator and post-dominator trees over a [`BlockGraph`].
//!
//! Both are computed with petgraph's Cooper/Harvey/Kennedy implementation on
//! a copy of the graph extended by one virtual node. For dominators the
//! virtual node is a root feeding the entry and every handler entry, so
//! handler code (only reachable through exception edges) still gets a tree.
//! For post-dominators it is a sink fed by every `return`/`throw` block and
//! the edges are reversed.

use petgraph::algo::dominators::simple_fast;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;

use crate::cfg::{BlockGraph, BlockId};

#[derive(Debug, Clone)]
pub struct Dominators {
    idom: Vec<Option<BlockId>>,
    reachable: Vec<bool>,
}

impl Dominators {
    /// Forward dominators, rooted at the entry and every handler entry.
    #[must_use]
    pub fn compute(graph: &BlockGraph) -> Self {
        let len = graph.len();
        let mut flow: DiGraph<(), ()> = DiGraph::with_capacity(len + 1, len * 2);
        for _ in 0..=len {
            flow.add_node(());
        }
        let root = NodeIndex::new(len);
        for block in graph.block_ids() {
            for succ in graph.successors(block) {
                flow.update_edge(node(block), node(succ), ());
            }
        }
        flow.update_edge(root, node(graph.entry()), ());
        for handler in graph.handler_entries() {
            flow.update_edge(root, node(handler), ());
        }

        Self::from_graph(&flow, root, len)
    }

    /// Post-dominators: `a` post-dominates `b` when every path from `b` to a
    /// unit exit passes through `a`. Blocks that cannot reach an exit (an
    /// endless loop) have no post-dominator.
    #[must_use]
    pub fn compute_post(graph: &BlockGraph) -> Self {
        let len = graph.len();
        let mut reversed: DiGraph<(), ()> = DiGraph::with_capacity(len + 1, len * 2);
        for _ in 0..=len {
            reversed.add_node(());
        }
        let sink = NodeIndex::new(len);
        for block in graph.block_ids() {
            for succ in graph.successors(block) {
                reversed.update_edge(node(succ), node(block), ());
            }
            if graph.block(block).terminator.is_exit() {
                reversed.update_edge(sink, node(block), ());
            }
        }

        Self::from_graph(&reversed, sink, len)
    }

    fn from_graph(graph: &DiGraph<(), ()>, root: NodeIndex, len: usize) -> Self {
        let doms = simple_fast(graph, root);
        let mut idom = vec![None; len];
        let mut reachable = vec![false; len];
        for idx in 0..len {
            let Some(parent) = doms.immediate_dominator(NodeIndex::new(idx)) else {
                continue;
            };
            reachable[idx] = true;
            if parent != root {
                idom[idx] = Some(BlockId(parent.index()));
            }
        }
        Self { idom, reachable }
    }

    /// Immediate dominator; `None` for roots and unreachable blocks.
    #[must_use]
    pub fn immediate(&self, block: BlockId) -> Option<BlockId> {
        self.idom.get(block.index()).copied().flatten()
    }

    #[must_use]
    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable.get(block.index()).copied().unwrap_or(false)
    }

    /// Reflexive: every reachable block dominates itself.
    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        let mut current = Some(b);
        while let Some(block) = current {
            if block == a {
                return true;
            }
            current = self.immediate(block);
        }
        false
    }

    #[must_use]
    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Blocks whose immediate dominator is `block`, in id order.
    #[must_use]
    pub fn children(&self, block: BlockId) -> Vec<BlockId> {
        self.idom
            .iter()
            .enumerate()
            .filter(|(_, idom)| **idom == Some(block))
            .map(|(idx, _)| BlockId(idx))
            .collect()
    }
}

fn node(block: BlockId) -> NodeIndex {
    NodeIndex::new(block.index())
}

/// Reverse post-order over normal edges, starting at the entry and then at
/// each handler entry. Unreachable blocks are absent.
#[must_use]
pub fn reverse_post_order(graph: &BlockGraph) -> Vec<BlockId> {
    let len = graph.len();
    let mut flow: DiGraph<(), ()> = DiGraph::with_capacity(len + 1, len * 2);
    for _ in 0..=len {
        flow.add_node(());
    }
    let root = NodeIndex::new(len);
    for block in graph.block_ids() {
        for succ in graph.successors(block) {
            flow.update_edge(node(block), node(succ), ());
        }
    }
    flow.update_edge(root, node(graph.entry()), ());
    for handler in graph.handler_entries() {
        flow.update_edge(root, node(handler), ());
    }

    let mut order = Vec::with_capacity(len);
    let mut dfs = DfsPostOrder::new(&flow, root);
    while let Some(nx) = dfs.next(&flow) {
        if nx != root {
            order.push(BlockId(nx.index()));
        }
    }
    order.reverse();
    order
}

/// Position of each block in `rpo`; `None` for unreachable blocks.
#[must_use]
pub fn rpo_index(rpo: &[BlockId], len: usize) -> Vec<Option<usize>> {
    let mut index = vec![None; len];
    for (pos, block) in rpo.iter().enumerate() {
        index[block.index()] = Some(pos);
    }
    index
}
