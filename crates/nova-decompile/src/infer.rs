//! Type annotation over a structured body.
//!
//! Field reads and call results are typed by the [`TypeResolver`]; every
//! other node is typed from its operands. Two reference branches of a
//! ternary get their nearest common superclass.

use std::collections::BTreeSet;

use nova_config::DECOMPILE_TARGET;
use nova_decompile_ast::{
    common_superclass, ConstraintError, Expr, ExprKind, Rewriter, StatementBlock, Ty,
    TypeResolver,
};

use crate::diagnostics::{diagnostic, DecompileDiagnosticKind, Diagnostic};

#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    pub body: StatementBlock,
    pub diagnostics: Vec<Diagnostic>,
}

/// Annotates every expression in `body`.
///
/// If an annotation makes a node invalid (the resolver disagrees with a
/// descriptor), the body is returned unannotated with a warning.
pub fn infer_types(body: StatementBlock, resolver: &dyn TypeResolver) -> InferenceOutcome {
    let snapshot = body.clone();
    let mut annotator = Annotator {
        resolver,
        seen: BTreeSet::new(),
        diagnostics: Vec::new(),
    };
    match body.rewrite(&mut annotator) {
        Ok(body) => {
            tracing::debug!(
                target: DECOMPILE_TARGET,
                unresolved = annotator.diagnostics.len(),
                "annotated expression types"
            );
            InferenceOutcome {
                body,
                diagnostics: annotator.diagnostics,
            }
        }
        Err(err) => {
            tracing::warn!(
                target: DECOMPILE_TARGET,
                error = %err,
                "type annotation produced an invalid node; leaving body unannotated"
            );
            let mut diagnostics = annotator.diagnostics;
            diagnostics.push(diagnostic(
                DecompileDiagnosticKind::InferenceFailed,
                format!("type annotation failed: {err}"),
                None,
            ));
            InferenceOutcome {
                body: snapshot,
                diagnostics,
            }
        }
    }
}

struct Annotator<'r> {
    resolver: &'r dyn TypeResolver,
    seen: BTreeSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Annotator<'_> {
    fn type_of(&mut self, expr: &Expr) -> Ty {
        match expr.kind() {
            ExprKind::FieldAccess(field) => {
                match self.resolver.resolve_field_type(field.owner(), field.name()) {
                    Ok(ty) => ty,
                    Err(err) => {
                        self.unresolved(DecompileDiagnosticKind::UnresolvedField, err.to_string());
                        Ty::Unknown
                    }
                }
            }
            ExprKind::Invoke(call) => match self.resolver.resolve_method_return_type(
                call.owner(),
                call.name(),
                call.descriptor(),
            ) {
                Ok(ty) => ty,
                Err(err) => {
                    self.unresolved(DecompileDiagnosticKind::UnresolvedMethod, err.to_string());
                    Ty::Unknown
                }
            },
            ExprKind::Ternary(node) => {
                match (node.then_value().ty(), node.else_value().ty()) {
                    (Ty::Object(left), Ty::Object(right)) if left != right => {
                        Ty::object(common_superclass(self.resolver, &left, &right))
                    }
                    _ => expr.infer_type(),
                }
            }
            _ => expr.infer_type(),
        }
    }

    fn unresolved(&mut self, kind: DecompileDiagnosticKind, message: String) {
        if !self.seen.insert(message.clone()) {
            return;
        }
        tracing::debug!(target: DECOMPILE_TARGET, %message, "unresolved member");
        self.diagnostics.push(diagnostic(kind, message, None));
    }
}

impl Rewriter for Annotator<'_> {
    fn rewrite_expr(&mut self, mut expr: Expr) -> Result<Expr, ConstraintError> {
        let ty = self.type_of(&expr);
        expr.annotate(ty);
        Ok(expr)
    }
}
