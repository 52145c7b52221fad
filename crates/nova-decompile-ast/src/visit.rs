//! Traversal, rewriting and structural equality over the tree.
//!
//! Read-only walks and equality use an explicit work stack, so arbitrarily
//! deep trees (long `else if` chains, big string concatenations) cannot
//! overflow the native stack.

use crate::condition::Condition;
use crate::error::ConstraintError;
use crate::expr::{Expr, ExprKind};
use crate::stmt::{Statement, StatementBlock};

/// Pre-order visitor. Every hook defaults to a no-op, so implementors only
/// override the node kinds they care about.
pub trait AstVisitor {
    fn visit_statement(&mut self, _stmt: &Statement) {}

    fn visit_condition(&mut self, _condition: &Condition) {}

    fn visit_expr(&mut self, _expr: &Expr) {}
}

/// Bottom-up rebuild hooks. Each hook receives a node whose children were
/// already rewritten and returns its replacement.
pub trait Rewriter {
    fn rewrite_expr(&mut self, expr: Expr) -> Result<Expr, ConstraintError> {
        Ok(expr)
    }

    fn rewrite_condition(&mut self, condition: Condition) -> Result<Condition, ConstraintError> {
        Ok(condition)
    }

    fn rewrite_block(&mut self, block: StatementBlock) -> Result<StatementBlock, ConstraintError> {
        Ok(block)
    }
}

/// Borrowed reference to any tree node.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Statement(&'a Statement),
    Condition(&'a Condition),
    Expr(&'a Expr),
}

impl<'a> Node<'a> {
    /// Children in visiting order.
    ///
    /// Statements list their own conditions and expressions before nested
    /// statements. `for` yields init, condition, update, then the body.
    pub fn children(self, out: &mut Vec<Node<'a>>) {
        match self {
            Node::Expr(expr) => {
                if let ExprKind::Ternary(ternary) = expr.kind() {
                    out.push(Node::Condition(ternary.condition()));
                }
                out.extend(expr.operands().into_iter().map(Node::Expr));
            }
            Node::Condition(condition) => match condition {
                Condition::And(parts) | Condition::Or(parts) => {
                    out.extend(parts.iter().map(Node::Condition));
                }
                Condition::Not(inner) => out.push(Node::Condition(inner)),
                other => out.extend(other.operands().into_iter().map(Node::Expr)),
            },
            Node::Statement(stmt) => statement_children(stmt, out),
        }
    }
}

fn statement_children<'a>(stmt: &'a Statement, out: &mut Vec<Node<'a>>) {
    let block = |out: &mut Vec<Node<'a>>, block: &'a StatementBlock| {
        out.extend(block.iter().map(Node::Statement));
    };
    match stmt {
        Statement::Expr(expr) => out.push(Node::Expr(expr)),
        Statement::Assign(node) => {
            out.push(Node::Expr(node.target()));
            out.push(Node::Expr(node.value()));
        }
        Statement::Increment(_) | Statement::Break(_) => {}
        Statement::If(node) => {
            out.push(Node::Condition(&node.condition));
            block(out, &node.then_block);
            if let Some(else_block) = &node.else_block {
                block(out, else_block);
            }
        }
        Statement::While(node) => {
            out.push(Node::Condition(&node.condition));
            block(out, &node.body);
        }
        Statement::DoWhile(node) => {
            out.push(Node::Condition(&node.condition));
            block(out, &node.body);
        }
        Statement::For(node) => {
            if let Some(init) = &node.init {
                out.push(Node::Statement(init));
            }
            out.push(Node::Condition(&node.condition));
            if let Some(update) = &node.update {
                out.push(Node::Statement(update));
            }
            block(out, &node.body);
        }
        Statement::Switch(node) => {
            out.push(Node::Expr(node.discriminant()));
            for arm in node.arms() {
                block(out, &arm.body);
            }
        }
        Statement::Return(value) => out.extend(value.iter().map(Node::Expr)),
        Statement::Throw(node) => out.push(Node::Expr(node.exception())),
        Statement::TryCatch(node) => {
            block(out, &node.body);
            for catch in &node.catches {
                block(out, &catch.body);
            }
        }
    }
}

/// Pre-order walk from `root`.
pub fn walk(root: Node<'_>, visitor: &mut dyn AstVisitor) {
    let mut stack = vec![root];
    let mut children = Vec::new();
    while let Some(node) = stack.pop() {
        match node {
            Node::Statement(stmt) => visitor.visit_statement(stmt),
            Node::Condition(condition) => visitor.visit_condition(condition),
            Node::Expr(expr) => visitor.visit_expr(expr),
        }
        node.children(&mut children);
        stack.extend(children.drain(..).rev());
    }
}

impl Expr {
    pub fn accept(&self, visitor: &mut dyn AstVisitor) {
        walk(Node::Expr(self), visitor);
    }
}

impl Condition {
    pub fn accept(&self, visitor: &mut dyn AstVisitor) {
        walk(Node::Condition(self), visitor);
    }
}

impl Statement {
    /// Visits this statement, its own conditions and expressions, then nested
    /// statements in order.
    pub fn accept(&self, visitor: &mut dyn AstVisitor) {
        walk(Node::Statement(self), visitor);
    }
}

impl StatementBlock {
    pub fn accept(&self, visitor: &mut dyn AstVisitor) {
        for stmt in self {
            stmt.accept(visitor);
        }
    }
}

/// Compares variant and scalar payload, ignoring children, annotations and
/// breakable/break ids.
fn shallow_eq(a: Node<'_>, b: Node<'_>) -> bool {
    match (a, b) {
        (Node::Expr(a), Node::Expr(b)) => shallow_expr_eq(a.kind(), b.kind()),
        (Node::Condition(a), Node::Condition(b)) => match (a, b) {
            (Condition::Compare(a), Condition::Compare(b)) => a.op() == b.op(),
            (Condition::Boolean(a), Condition::Boolean(b)) => a.is_inverted() == b.is_inverted(),
            (Condition::And(_), Condition::And(_))
            | (Condition::Or(_), Condition::Or(_))
            | (Condition::Not(_), Condition::Not(_)) => true,
            (Condition::Constant(a), Condition::Constant(b)) => a == b,
            _ => false,
        },
        (Node::Statement(a), Node::Statement(b)) => shallow_statement_eq(a, b),
        _ => false,
    }
}

fn shallow_expr_eq(a: &ExprKind, b: &ExprKind) -> bool {
    match (a, b) {
        (ExprKind::Local(a), ExprKind::Local(b)) => a == b,
        (ExprKind::Literal(a), ExprKind::Literal(b)) => a == b,
        (ExprKind::Arithmetic(a), ExprKind::Arithmetic(b)) => a.op() == b.op(),
        (ExprKind::Negate(_), ExprKind::Negate(_))
        | (ExprKind::NumberCompare(_), ExprKind::NumberCompare(_))
        | (ExprKind::ArrayAccess(_), ExprKind::ArrayAccess(_))
        | (ExprKind::ArrayLength(_), ExprKind::ArrayLength(_))
        | (ExprKind::Ternary(_), ExprKind::Ternary(_))
        | (ExprKind::StringConcat(_), ExprKind::StringConcat(_)) => true,
        (ExprKind::InstanceOf(a), ExprKind::InstanceOf(b)) => a.ty() == b.ty(),
        (ExprKind::Cast(a), ExprKind::Cast(b)) => a.target() == b.target(),
        (ExprKind::FieldAccess(a), ExprKind::FieldAccess(b)) => {
            a.owner() == b.owner()
                && a.name() == b.name()
                && a.descriptor() == b.descriptor()
                && a.is_static() == b.is_static()
        }
        (ExprKind::Invoke(a), ExprKind::Invoke(b)) => {
            a.kind() == b.kind()
                && a.owner() == b.owner()
                && a.name() == b.name()
                && a.descriptor() == b.descriptor()
                && a.receiver().is_some() == b.receiver().is_some()
        }
        (ExprKind::New(a), ExprKind::New(b)) => {
            a.owner() == b.owner() && a.descriptor() == b.descriptor()
        }
        (ExprKind::NewArray(a), ExprKind::NewArray(b)) => {
            a.component() == b.component()
                && a.initializer().map(<[Expr]>::len) == b.initializer().map(<[Expr]>::len)
        }
        _ => false,
    }
}

fn shallow_statement_eq(a: &Statement, b: &Statement) -> bool {
    match (a, b) {
        (Statement::Expr(_), Statement::Expr(_))
        | (Statement::Assign(_), Statement::Assign(_))
        | (Statement::Throw(_), Statement::Throw(_)) => true,
        (Statement::Increment(a), Statement::Increment(b)) => a == b,
        (Statement::If(a), Statement::If(b)) => {
            a.then_block.len() == b.then_block.len()
                && a.else_block.as_ref().map(StatementBlock::len)
                    == b.else_block.as_ref().map(StatementBlock::len)
        }
        (Statement::While(a), Statement::While(b)) => a.body.len() == b.body.len(),
        (Statement::DoWhile(a), Statement::DoWhile(b)) => a.body.len() == b.body.len(),
        (Statement::For(a), Statement::For(b)) => {
            a.init.is_some() == b.init.is_some()
                && a.update.is_some() == b.update.is_some()
                && a.body.len() == b.body.len()
        }
        (Statement::Switch(a), Statement::Switch(b)) => {
            a.arms().len() == b.arms().len()
                && a.arms().iter().zip(b.arms()).all(|(x, y)| {
                    x.labels() == y.labels() && x.body.len() == y.body.len()
                })
        }
        (Statement::Break(a), Statement::Break(b)) => {
            a.kind() == b.kind() && a.is_nested() == b.is_nested()
        }
        (Statement::Return(a), Statement::Return(b)) => a.is_some() == b.is_some(),
        (Statement::TryCatch(a), Statement::TryCatch(b)) => {
            a.body.len() == b.body.len()
                && a.catches.len() == b.catches.len()
                && a.catches.iter().zip(&b.catches).all(|(x, y)| {
                    x.exception_types == y.exception_types && x.body.len() == y.body.len()
                })
        }
        _ => false,
    }
}

fn equal_pairs<'a>(mut pending: Vec<(Node<'a>, Node<'a>)>) -> bool {
    let mut left = Vec::new();
    let mut right = Vec::new();
    while let Some((a, b)) = pending.pop() {
        if !shallow_eq(a, b) {
            return false;
        }
        a.children(&mut left);
        b.children(&mut right);
        if left.len() != right.len() {
            return false;
        }
        pending.extend(left.drain(..).zip(right.drain(..)));
    }
    true
}

/// Structural equality of two subtrees without recursion.
pub(crate) fn structurally_equal(a: Node<'_>, b: Node<'_>) -> bool {
    equal_pairs(vec![(a, b)])
}

pub(crate) fn blocks_equal(a: &StatementBlock, b: &StatementBlock) -> bool {
    a.len() == b.len()
        && equal_pairs(
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| (Node::Statement(x), Node::Statement(y)))
                .collect(),
        )
}
