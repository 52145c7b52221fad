use nova_decompile_ast::{ConstraintError, RegistryError};
use nova_flow::{BlockId, FlowError};
use thiserror::Error;

/// Why a unit's block graph could not be turned into a statement tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("irreducible control flow entering {block}")]
    Irreducible { block: BlockId },
    #[error("loop at {header} overlaps another loop without nesting")]
    AmbiguousLoop { header: BlockId },
    #[error("jump from {from} to {target} leaves every enclosing construct")]
    UnresolvedJump { from: BlockId, target: BlockId },
    #[error("{block} was structured twice")]
    BlockStructuredTwice { block: BlockId },
    #[error("exception ranges overlap without nesting at {block}")]
    OverlappingHandlers { block: BlockId },
    #[error("handler {block} resumes after another handler of the same range")]
    InterleavedHandlers { block: BlockId },
    #[error("{block} is reachable but was never structured")]
    Unstructured { block: BlockId },
    #[error("invalid node built for {block}: {source}")]
    Constraint {
        block: BlockId,
        #[source]
        source: ConstraintError,
    },
    #[error("break registration failed at {block}: {source}")]
    Registry {
        block: BlockId,
        #[source]
        source: RegistryError,
    },
    #[error("structured tree has inconsistent breaks: {0}")]
    InvalidBreaks(#[source] RegistryError),
    #[error(transparent)]
    Graph(FlowError),
}

impl StructureError {
    /// Block the error is attributed to, when there is one.
    #[must_use]
    pub fn block(&self) -> Option<BlockId> {
        match self {
            StructureError::Irreducible { block }
            | StructureError::BlockStructuredTwice { block }
            | StructureError::OverlappingHandlers { block }
            | StructureError::InterleavedHandlers { block }
            | StructureError::Unstructured { block }
            | StructureError::Constraint { block, .. }
            | StructureError::Registry { block, .. } => Some(*block),
            StructureError::AmbiguousLoop { header } => Some(*header),
            StructureError::UnresolvedJump { from, .. } => Some(*from),
            StructureError::InvalidBreaks(_) | StructureError::Graph(_) => None,
        }
    }
}

impl From<FlowError> for StructureError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Irreducible { block } => StructureError::Irreducible { block },
            FlowError::AmbiguousLoop { header } => StructureError::AmbiguousLoop { header },
            other => StructureError::Graph(other),
        }
    }
}

/// A unit failed; other units in the same batch are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decompile `{unit}`: {source}")]
pub struct DecompileError {
    pub unit: String,
    #[source]
    pub source: StructureError,
}
