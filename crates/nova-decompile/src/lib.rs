//! Control-flow structuring and clean-up for decompiled method bodies.
//!
//! [`decompile_unit`] turns one [`BlockGraph`](nova_flow::BlockGraph) into a
//! [`StatementBlock`](nova_decompile_ast::StatementBlock) in three stages:
//!
//! 1. [`structure`] eliminates gotos, producing loops, branches, switches
//!    and try/catch with every jump resolved to `break` or `continue`;
//! 2. [`fold`] rewrites compiler idioms back into source idioms;
//! 3. [`infer_types`] annotates each expression with its type.
//!
//! [`decompile_units`] runs many units, optionally on a rayon pool.

#![forbid(unsafe_code)]

mod diagnostics;
mod error;
pub mod fold;
mod infer;
mod pipeline;
mod structure;

pub use crate::diagnostics::{DecompileDiagnosticKind, Diagnostic, Severity};
pub use crate::error::{DecompileError, StructureError};
pub use crate::fold::{fold, FoldOutcome, Folded};
pub use crate::infer::{infer_types, InferenceOutcome};
pub use crate::pipeline::{decompile_unit, decompile_units, DecompiledUnit, Unit};
pub use crate::structure::{structure, StructuredBody};
