use nova_decompile_ast::{Condition, ConstraintError, ExprKind};

use super::Folded;

/// `cmp(l, r) op 0` becomes `r op l`, and `0 op cmp(l, r)` becomes
/// `r flip(op) l`, since `cmp(l, r)` is the sign of `r - l`. Both spellings
/// of the same test land on one canonical comparison.
pub fn fold_signum_test(condition: Condition) -> Result<Folded<Condition>, ConstraintError> {
    let Condition::Compare(cmp) = &condition else {
        return Ok(Folded::Kept(condition));
    };
    let (op, node) = match (cmp.left().kind(), cmp.right().kind()) {
        (ExprKind::NumberCompare(node), ExprKind::Literal(zero)) if zero.is_zero() => {
            (cmp.op(), node)
        }
        (ExprKind::Literal(zero), ExprKind::NumberCompare(node)) if zero.is_zero() => {
            (cmp.op().flip(), node)
        }
        _ => return Ok(Folded::Kept(condition)),
    };
    Condition::compare(op, node.right().clone(), node.left().clone()).map(Folded::Rewritten)
}
