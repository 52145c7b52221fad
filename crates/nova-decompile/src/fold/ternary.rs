use nova_decompile_ast::{Assignment, If, Statement, Ternary};

use super::Folded;

/// `if (c) { x = a; } else { x = b; }` becomes `x = c ? a : b;`.
///
/// Left alone when the two values cannot share a type.
pub fn fold_conditional_assignment(stmt: Statement) -> Folded<Statement> {
    let Statement::If(node) = stmt else {
        return Folded::Kept(stmt);
    };
    match conditional_assignment(&node) {
        Some(assign) => Folded::Rewritten(assign.into()),
        None => Folded::Kept(Statement::If(node)),
    }
}

fn conditional_assignment(node: &If) -> Option<Assignment> {
    let else_block = node.else_block.as_ref()?;
    let ([Statement::Assign(then_assign)], [Statement::Assign(else_assign)]) =
        (node.then_block.as_slice(), else_block.as_slice())
    else {
        return None;
    };
    if then_assign.target() != else_assign.target() {
        return None;
    }
    let value = Ternary::new(
        node.condition.clone(),
        then_assign.value().clone(),
        else_assign.value().clone(),
    )
    .ok()?;
    Assignment::new(then_assign.target().clone(), value.into()).ok()
}
