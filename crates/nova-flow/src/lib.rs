//! Block graphs for decompilation: basic blocks with typed terminators, the
//! exception table, dominator trees and natural loops.

mod cfg;
mod dominators;
mod error;
mod loops;

pub use crate::cfg::{
    BasicBlock, BlockGraph, BlockGraphBuilder, BlockId, ExceptionHandler, Successors, Terminator,
};
pub use crate::dominators::{reverse_post_order, rpo_index, Dominators};
pub use crate::error::FlowError;
pub use crate::loops::{LoopForest, NaturalLoop};
