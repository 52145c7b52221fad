use thiserror::Error;

use crate::cfg::BlockId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("block graph has no blocks")]
    EmptyGraph,
    #[error("{block} jumps to {target}, which does not exist")]
    TargetOutOfRange { block: BlockId, target: BlockId },
    #[error("switch in {block} lists case {value} twice")]
    DuplicateCase { block: BlockId, value: i32 },
    #[error("exception table entry {index} has an invalid range {start}..{end}")]
    InvalidHandlerRange {
        index: usize,
        start: BlockId,
        end: BlockId,
    },
    #[error("exception table entry {index} has handler {handler} inside its own range")]
    HandlerInsideRange { index: usize, handler: BlockId },
    /// A retreating edge whose target does not dominate its source.
    #[error("irreducible control flow entering {block}")]
    Irreducible { block: BlockId },
    #[error("loop at {header} overlaps another loop without nesting")]
    AmbiguousLoop { header: BlockId },
}
