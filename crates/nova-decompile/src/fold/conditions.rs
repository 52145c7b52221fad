use nova_decompile_ast::{Condition, If, Statement};

use super::Folded;

/// `!!c` becomes `c`.
pub fn drop_double_negation(condition: Condition) -> Folded<Condition> {
    match condition {
        Condition::Not(inner) => match *inner {
            Condition::Not(twice) => Folded::Rewritten(*twice),
            inner => Folded::Kept(Condition::Not(Box::new(inner))),
        },
        other => Folded::Kept(other),
    }
}

/// `if (a) { if (b) { .. } }` with no `else` on either becomes
/// `if (a && b) { .. }`.
pub fn merge_nested_if(stmt: Statement) -> Folded<Statement> {
    let Statement::If(outer) = stmt else {
        return Folded::Kept(stmt);
    };
    let mergeable = outer.else_block.is_none()
        && outer.then_block.len() == 1
        && matches!(
            outer.then_block.last(),
            Some(Statement::If(inner)) if inner.else_block.is_none()
        );
    if !mergeable {
        return Folded::Kept(Statement::If(outer));
    }

    let mut then_block = outer.then_block;
    match then_block.pop() {
        Some(Statement::If(inner)) => Folded::Rewritten(
            If::new(outer.condition.and(inner.condition), inner.then_block, None).into(),
        ),
        Some(other) => {
            then_block.push(other);
            Folded::Kept(If::new(outer.condition, then_block, None).into())
        }
        None => Folded::Kept(If::new(outer.condition, then_block, None).into()),
    }
}
