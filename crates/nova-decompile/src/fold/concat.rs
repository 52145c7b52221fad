use nova_decompile_ast::{
    ConstraintError, Expr, ExprKind, Invoke, InvokeKind, StringConcat, Ty,
};

use super::Folded;

const BUILDERS: [&str; 2] = ["java/lang/StringBuilder", "java/lang/StringBuffer"];

/// `new StringBuilder(a).append(b).append(c).toString()` becomes `a + b + c`.
///
/// An empty `""` is put in front when neither of the first two parts is a
/// `String`, so the result still reads as concatenation rather than addition.
pub fn fold_builder_chain(expr: Expr) -> Result<Folded<Expr>, ConstraintError> {
    let Some(mut parts) = builder_parts(&expr) else {
        return Ok(Folded::Kept(expr));
    };
    if !parts.iter().take(2).any(|part| part.ty() == Ty::string()) {
        parts.insert(0, Expr::string(""));
    }
    let concat = StringConcat::new(parts)?;
    Ok(Folded::Rewritten(concat.into()))
}

fn builder_parts(expr: &Expr) -> Option<Vec<Expr>> {
    let ExprKind::Invoke(call) = expr.kind() else {
        return None;
    };
    if !is_builder_call(call, "toString") || !call.args().is_empty() {
        return None;
    }

    let mut appended = Vec::new();
    let mut current = call.receiver()?;
    loop {
        match current.kind() {
            ExprKind::Invoke(call) if is_builder_call(call, "append") => {
                let [arg] = call.args() else {
                    return None;
                };
                appended.push(arg.clone());
                current = call.receiver()?;
            }
            ExprKind::New(new) if BUILDERS.contains(&new.owner()) => {
                let mut parts = match (new.args(), new.descriptor()) {
                    ([], _) => Vec::new(),
                    ([seed], "(Ljava/lang/String;)V" | "(Ljava/lang/CharSequence;)V") => {
                        vec![seed.clone()]
                    }
                    // `new StringBuilder(capacity)`
                    ([_], "(I)V") => Vec::new(),
                    _ => return None,
                };
                parts.extend(appended.into_iter().rev());
                return Some(parts);
            }
            _ => return None,
        }
    }
}

fn is_builder_call(call: &Invoke, name: &str) -> bool {
    call.kind() == InvokeKind::Virtual && call.name() == name && BUILDERS.contains(&call.owner())
}
