//! Idiom folding: local rewrites of common compiler output back into source
//! idioms, repeated until a pass changes nothing.
//!
//! Each pass is a bottom-up [`Rewriter`] over the whole tree. A pass either
//! completes or fails as a unit; on failure, or when the pass limit is
//! reached before a fixed point, the tree from before folding is kept.

mod comparator;
mod concat;
mod conditions;
mod ternary;

use nova_config::{FoldConfig, DECOMPILE_TARGET};
use nova_decompile_ast::{Condition, ConstraintError, Expr, Rewriter, StatementBlock};

use crate::diagnostics::{diagnostic, DecompileDiagnosticKind, Diagnostic};

pub use self::comparator::fold_signum_test;
pub use self::concat::fold_builder_chain;
pub use self::conditions::{drop_double_negation, merge_nested_if};
pub use self::ternary::fold_conditional_assignment;

/// Outcome of applying one rule to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Folded<T> {
    Rewritten(T),
    Kept(T),
}

impl<T> Folded<T> {
    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        matches!(self, Folded::Rewritten(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Folded::Rewritten(node) | Folded::Kept(node) => node,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FoldOutcome {
    pub body: StatementBlock,
    /// Passes run, including the final one that found nothing to do.
    pub passes: u32,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn fold(body: StatementBlock, config: &FoldConfig) -> FoldOutcome {
    if !config.enabled {
        return FoldOutcome {
            body,
            passes: 0,
            diagnostics: Vec::new(),
        };
    }

    let cap = config.iteration_cap.max(1);
    let snapshot = body.clone();
    let mut current = body;
    for pass in 1..=cap {
        let mut folder = Folder::new(config);
        current = match current.rewrite(&mut folder) {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!(
                    target: DECOMPILE_TARGET,
                    pass,
                    error = %err,
                    "idiom folding failed; keeping unfolded tree"
                );
                return FoldOutcome {
                    body: snapshot,
                    passes: pass,
                    diagnostics: vec![diagnostic(
                        DecompileDiagnosticKind::FoldFailed,
                        format!("idiom folding failed in pass {pass}: {err}"),
                        None,
                    )],
                };
            }
        };
        if folder.rewrites == 0 {
            tracing::debug!(target: DECOMPILE_TARGET, passes = pass, "idiom folding converged");
            return FoldOutcome {
                body: current,
                passes: pass,
                diagnostics: Vec::new(),
            };
        }
        tracing::trace!(target: DECOMPILE_TARGET, pass, rewrites = folder.rewrites, "fold pass");
    }

    tracing::warn!(
        target: DECOMPILE_TARGET,
        cap,
        "idiom folding did not converge; keeping unfolded tree"
    );
    FoldOutcome {
        body: snapshot,
        passes: cap,
        diagnostics: vec![diagnostic(
            DecompileDiagnosticKind::FoldCapReached,
            format!("idiom folding still changing the tree after {cap} passes"),
            None,
        )],
    }
}

struct Folder<'c> {
    config: &'c FoldConfig,
    rewrites: usize,
}

impl<'c> Folder<'c> {
    fn new(config: &'c FoldConfig) -> Self {
        Self {
            config,
            rewrites: 0,
        }
    }

    fn count<T>(&mut self, folded: Folded<T>) -> T {
        if folded.is_rewritten() {
            self.rewrites += 1;
        }
        folded.into_inner()
    }
}

impl Rewriter for Folder<'_> {
    fn rewrite_expr(&mut self, expr: Expr) -> Result<Expr, ConstraintError> {
        if !self.config.string_concat {
            return Ok(expr);
        }
        let folded = fold_builder_chain(expr)?;
        Ok(self.count(folded))
    }

    fn rewrite_condition(&mut self, condition: Condition) -> Result<Condition, ConstraintError> {
        let mut condition = condition;
        if self.config.nested_conditions {
            let folded = drop_double_negation(condition);
            condition = self.count(folded);
        }
        if self.config.comparators {
            let folded = fold_signum_test(condition)?;
            condition = self.count(folded);
        }
        Ok(condition)
    }

    fn rewrite_block(&mut self, block: StatementBlock) -> Result<StatementBlock, ConstraintError> {
        if !self.config.ternaries && !self.config.nested_conditions {
            return Ok(block);
        }
        let mut out = StatementBlock::new();
        for stmt in block {
            let mut stmt = stmt;
            if self.config.ternaries {
                let folded = fold_conditional_assignment(stmt);
                stmt = self.count(folded);
            }
            if self.config.nested_conditions {
                let folded = merge_nested_if(stmt);
                stmt = self.count(folded);
            }
            out.push(stmt);
        }
        Ok(out)
    }
}
