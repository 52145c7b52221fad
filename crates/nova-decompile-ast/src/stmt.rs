use std::collections::HashSet;
use std::fmt::{self, Write as _};

use crate::breakable::{Break, BreakKind, Breakable, BreakableId, BreakableKind};
use crate::condition::Condition;
use crate::error::{Constraint, ConstraintError};
use crate::expr::{expect, expect_compatible, Expr, Local};
use crate::visit::{blocks_equal, structurally_equal, Node, Rewriter};

/// Ordered statement sequence.
#[derive(Debug, Clone, Default)]
pub struct StatementBlock {
    statements: Vec<Statement>,
}

impl StatementBlock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stmt: Statement) {
        self.statements.push(stmt);
    }

    pub fn insert(&mut self, index: usize, stmt: Statement) {
        self.statements.insert(index, stmt);
    }

    pub fn remove(&mut self, index: usize) -> Statement {
        self.statements.remove(index)
    }

    /// Swaps the statement at `index`, returning the detached old one.
    pub fn replace(&mut self, index: usize, stmt: Statement) -> Statement {
        std::mem::replace(&mut self.statements[index], stmt)
    }

    pub fn pop(&mut self) -> Option<Statement> {
        self.statements.pop()
    }

    pub fn append(&mut self, other: &mut StatementBlock) {
        self.statements.append(&mut other.statements);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Statement> {
        self.statements.get(index)
    }

    #[must_use]
    pub fn last(&self) -> Option<&Statement> {
        self.statements.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Statement> {
        self.statements.last_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Statement> {
        self.statements.iter_mut()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Statement] {
        &self.statements
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Statement> {
        self.statements
    }

    /// Rewrites every statement, then hands the block itself to the rewriter.
    pub fn rewrite(self, rewriter: &mut dyn Rewriter) -> Result<StatementBlock, ConstraintError> {
        let statements = self
            .statements
            .into_iter()
            .map(|stmt| stmt.rewrite(rewriter))
            .collect::<Result<Vec<_>, _>>()?;
        rewriter.rewrite_block(StatementBlock { statements })
    }
}

impl From<Vec<Statement>> for StatementBlock {
    fn from(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

impl FromIterator<Statement> for StatementBlock {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

impl Extend<Statement> for StatementBlock {
    fn extend<I: IntoIterator<Item = Statement>>(&mut self, iter: I) {
        self.statements.extend(iter);
    }
}

impl IntoIterator for StatementBlock {
    type Item = Statement;
    type IntoIter = std::vec::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

impl<'a> IntoIterator for &'a StatementBlock {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

impl PartialEq for StatementBlock {
    fn eq(&self, other: &Self) -> bool {
        blocks_equal(self, other)
    }
}

impl Eq for StatementBlock {}

#[derive(Debug, Clone)]
pub enum Statement {
    /// Expression evaluated for its side effects.
    Expr(Expr),
    Assign(Assignment),
    Increment(Increment),
    If(If),
    While(While),
    DoWhile(DoWhile),
    For(For),
    Switch(Switch),
    Break(Break),
    Return(Option<Expr>),
    Throw(Throw),
    TryCatch(TryCatch),
}

impl Statement {
    #[must_use]
    pub fn as_breakable(&self) -> Option<&dyn Breakable> {
        match self {
            Statement::While(node) => Some(node),
            Statement::DoWhile(node) => Some(node),
            Statement::For(node) => Some(node),
            Statement::Switch(node) => Some(node),
            _ => None,
        }
    }

    /// Nested statement blocks in source order.
    #[must_use]
    pub fn child_blocks(&self) -> Vec<&StatementBlock> {
        match self {
            Statement::If(node) => std::iter::once(&node.then_block)
                .chain(node.else_block.iter())
                .collect(),
            Statement::While(node) => vec![&node.body],
            Statement::DoWhile(node) => vec![&node.body],
            Statement::For(node) => vec![&node.body],
            Statement::Switch(node) => node.arms.iter().map(|arm| &arm.body).collect(),
            Statement::TryCatch(node) => std::iter::once(&node.body)
                .chain(node.catches.iter().map(|catch| &catch.body))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn child_blocks_mut(&mut self) -> Vec<&mut StatementBlock> {
        match self {
            Statement::If(node) => std::iter::once(&mut node.then_block)
                .chain(node.else_block.iter_mut())
                .collect(),
            Statement::While(node) => vec![&mut node.body],
            Statement::DoWhile(node) => vec![&mut node.body],
            Statement::For(node) => vec![&mut node.body],
            Statement::Switch(node) => node.arms.iter_mut().map(|arm| &mut arm.body).collect(),
            Statement::TryCatch(node) => std::iter::once(&mut node.body)
                .chain(node.catches.iter_mut().map(|catch| &mut catch.body))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether control can never continue to the next statement.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Statement::Break(_) | Statement::Return(_) | Statement::Throw(_)
        )
    }

    pub fn rewrite(self, rewriter: &mut dyn Rewriter) -> Result<Statement, ConstraintError> {
        Ok(match self {
            Statement::Expr(expr) => Statement::Expr(expr.rewrite(rewriter)?),
            Statement::Assign(node) => Statement::Assign(Assignment::new(
                node.target.rewrite(rewriter)?,
                node.value.rewrite(rewriter)?,
            )?),
            stmt @ (Statement::Increment(_) | Statement::Break(_)) => stmt,
            Statement::If(node) => Statement::If(If {
                condition: node.condition.rewrite(rewriter)?,
                then_block: node.then_block.rewrite(rewriter)?,
                else_block: node
                    .else_block
                    .map(|block| block.rewrite(rewriter))
                    .transpose()?,
            }),
            Statement::While(node) => Statement::While(While {
                id: node.id,
                condition: node.condition.rewrite(rewriter)?,
                body: node.body.rewrite(rewriter)?,
            }),
            Statement::DoWhile(node) => Statement::DoWhile(DoWhile {
                id: node.id,
                condition: node.condition.rewrite(rewriter)?,
                body: node.body.rewrite(rewriter)?,
            }),
            Statement::For(node) => Statement::For(For {
                id: node.id,
                init: node
                    .init
                    .map(|init| (*init).rewrite(rewriter).map(Box::new))
                    .transpose()?,
                condition: node.condition.rewrite(rewriter)?,
                update: node
                    .update
                    .map(|update| (*update).rewrite(rewriter).map(Box::new))
                    .transpose()?,
                body: node.body.rewrite(rewriter)?,
            }),
            Statement::Switch(node) => {
                let discriminant = node.discriminant.rewrite(rewriter)?;
                expect("discriminant", Constraint::Numeric, &discriminant)?;
                let arms = node
                    .arms
                    .into_iter()
                    .map(|arm| {
                        Ok(SwitchArm {
                            labels: arm.labels,
                            body: arm.body.rewrite(rewriter)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ConstraintError>>()?;
                Statement::Switch(Switch {
                    id: node.id,
                    discriminant,
                    arms,
                })
            }
            Statement::Return(value) => {
                Statement::Return(value.map(|value| value.rewrite(rewriter)).transpose()?)
            }
            Statement::Throw(node) => Statement::Throw(Throw::new(node.exception.rewrite(rewriter)?)?),
            Statement::TryCatch(node) => Statement::TryCatch(TryCatch {
                body: node.body.rewrite(rewriter)?,
                catches: node
                    .catches
                    .into_iter()
                    .map(|catch| {
                        Ok(CatchClause {
                            exception_types: catch.exception_types,
                            body: catch.body.rewrite(rewriter)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ConstraintError>>()?,
            }),
        })
    }
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        structurally_equal(Node::Statement(self), Node::Statement(other))
    }
}

impl Eq for Statement {}

/// `target = value` where the target is a local, field or array element.
#[derive(Debug, Clone)]
pub struct Assignment {
    target: Expr,
    value: Expr,
}

impl Assignment {
    pub fn new(target: Expr, value: Expr) -> Result<Self, ConstraintError> {
        Self::check(&target, &value)?;
        Ok(Self { target, value })
    }

    fn check(target: &Expr, value: &Expr) -> Result<(), ConstraintError> {
        if !target.is_assignable() {
            return Err(ConstraintError::NotAssignable { param: "target" });
        }
        expect("value", Constraint::Value, value)?;
        expect_compatible("assignment", target, value)
    }

    #[must_use]
    pub fn target(&self) -> &Expr {
        &self.target
    }

    #[must_use]
    pub fn value(&self) -> &Expr {
        &self.value
    }

    pub fn set_target(&mut self, target: Expr) -> Result<Expr, ConstraintError> {
        Self::check(&target, &self.value)?;
        Ok(std::mem::replace(&mut self.target, target))
    }

    pub fn set_value(&mut self, value: Expr) -> Result<Expr, ConstraintError> {
        Self::check(&self.target, &value)?;
        Ok(std::mem::replace(&mut self.value, value))
    }

    #[must_use]
    pub fn into_parts(self) -> (Expr, Expr) {
        (self.target, self.value)
    }
}

/// `local += amount` on an integral local (`iinc`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Increment {
    local: Local,
    amount: i32,
}

impl Increment {
    pub fn new(local: Local, amount: i32) -> Result<Self, ConstraintError> {
        if !Constraint::Numeric.accepts(local.ty.category()) {
            return Err(ConstraintError::Category {
                param: "local",
                expected: Constraint::Numeric,
                found: local.ty,
            });
        }
        Ok(Self { local, amount })
    }

    #[must_use]
    pub fn local(&self) -> &Local {
        &self.local
    }

    #[must_use]
    pub fn amount(&self) -> i32 {
        self.amount
    }
}

#[derive(Debug, Clone)]
pub struct If {
    pub condition: Condition,
    pub then_block: StatementBlock,
    pub else_block: Option<StatementBlock>,
}

impl If {
    pub fn new(
        condition: Condition,
        then_block: StatementBlock,
        else_block: Option<StatementBlock>,
    ) -> Self {
        Self {
            condition,
            then_block,
            else_block,
        }
    }
}

macro_rules! impl_breakable {
    ($node:ident, $kind:expr) => {
        impl Breakable for $node {
            fn breakable_id(&self) -> BreakableId {
                self.id
            }

            fn breakable_kind(&self) -> BreakableKind {
                $kind
            }
        }
    };
}

/// `while (condition) body`. The condition is mandatory; an unconditional
/// loop is `while (true)`.
#[derive(Debug, Clone)]
pub struct While {
    id: BreakableId,
    pub condition: Condition,
    pub body: StatementBlock,
}

impl While {
    pub fn new(id: BreakableId, condition: Condition, body: StatementBlock) -> Self {
        Self {
            id,
            condition,
            body,
        }
    }
}

impl_breakable!(While, BreakableKind::While);

#[derive(Debug, Clone)]
pub struct DoWhile {
    id: BreakableId,
    pub condition: Condition,
    pub body: StatementBlock,
}

impl DoWhile {
    pub fn new(id: BreakableId, condition: Condition, body: StatementBlock) -> Self {
        Self {
            id,
            condition,
            body,
        }
    }
}

impl_breakable!(DoWhile, BreakableKind::DoWhile);

/// `for (init; condition; update) body`
#[derive(Debug, Clone)]
pub struct For {
    id: BreakableId,
    pub init: Option<Box<Statement>>,
    pub condition: Condition,
    pub update: Option<Box<Statement>>,
    pub body: StatementBlock,
}

impl For {
    pub fn new(
        id: BreakableId,
        init: Option<Statement>,
        condition: Condition,
        update: Option<Statement>,
        body: StatementBlock,
    ) -> Self {
        Self {
            id,
            init: init.map(Box::new),
            condition,
            update: update.map(Box::new),
            body,
        }
    }
}

impl_breakable!(For, BreakableKind::For);

/// One `case` group. No labels means `default`.
#[derive(Debug, Clone)]
pub struct SwitchArm {
    labels: Vec<i32>,
    pub body: StatementBlock,
}

impl SwitchArm {
    pub fn new(labels: Vec<i32>, body: StatementBlock) -> Self {
        Self { labels, body }
    }

    pub fn default_arm(body: StatementBlock) -> Self {
        Self {
            labels: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Arms appear in source order; an arm whose body does not end in a jump
/// falls through to the next one.
#[derive(Debug, Clone)]
pub struct Switch {
    id: BreakableId,
    discriminant: Expr,
    arms: Vec<SwitchArm>,
}

impl Switch {
    pub fn new(
        id: BreakableId,
        discriminant: Expr,
        arms: Vec<SwitchArm>,
    ) -> Result<Self, ConstraintError> {
        expect("discriminant", Constraint::Numeric, &discriminant)?;
        let mut labels = HashSet::new();
        let mut has_default = false;
        for arm in &arms {
            if arm.is_default() {
                if has_default {
                    return Err(ConstraintError::DuplicateDefault);
                }
                has_default = true;
            }
            for label in &arm.labels {
                if !labels.insert(*label) {
                    return Err(ConstraintError::DuplicateLabel(*label));
                }
            }
        }
        Ok(Self {
            id,
            discriminant,
            arms,
        })
    }

    #[must_use]
    pub fn discriminant(&self) -> &Expr {
        &self.discriminant
    }

    pub fn set_discriminant(&mut self, discriminant: Expr) -> Result<Expr, ConstraintError> {
        expect("discriminant", Constraint::Numeric, &discriminant)?;
        Ok(std::mem::replace(&mut self.discriminant, discriminant))
    }

    #[must_use]
    pub fn arms(&self) -> &[SwitchArm] {
        &self.arms
    }

    /// Arm bodies may change freely; labels are fixed at construction.
    pub fn arm_bodies_mut(&mut self) -> impl Iterator<Item = &mut StatementBlock> {
        self.arms.iter_mut().map(|arm| &mut arm.body)
    }
}

impl_breakable!(Switch, BreakableKind::Switch);

#[derive(Debug, Clone)]
pub struct Throw {
    exception: Expr,
}

impl Throw {
    pub fn new(exception: Expr) -> Result<Self, ConstraintError> {
        expect("exception", Constraint::Reference, &exception)?;
        Ok(Self { exception })
    }

    #[must_use]
    pub fn exception(&self) -> &Expr {
        &self.exception
    }
}

#[derive(Debug, Clone)]
pub struct TryCatch {
    pub body: StatementBlock,
    pub catches: Vec<CatchClause>,
}

impl TryCatch {
    pub fn new(body: StatementBlock, catches: Vec<CatchClause>) -> Self {
        Self { body, catches }
    }
}

/// Handler for one or more exception types. An empty type list catches
/// everything (a `finally`-style handler).
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub exception_types: Vec<String>,
    pub body: StatementBlock,
}

impl CatchClause {
    pub fn new(exception_types: Vec<String>, body: StatementBlock) -> Self {
        Self {
            exception_types,
            body,
        }
    }
}

macro_rules! impl_from_stmt {
    ($($node:ident),* $(,)?) => {
        $(
            impl From<$node> for Statement {
                fn from(node: $node) -> Self {
                    Statement::$node(node)
                }
            }
        )*
    };
}

impl_from_stmt!(Increment, If, While, DoWhile, For, Switch, Break, Throw, TryCatch);

impl From<Assignment> for Statement {
    fn from(node: Assignment) -> Self {
        Statement::Assign(node)
    }
}

impl From<Expr> for Statement {
    fn from(expr: Expr) -> Self {
        Statement::Expr(expr)
    }
}

fn write_block(out: &mut String, block: &StatementBlock, depth: usize) -> fmt::Result {
    for stmt in block {
        write_statement(out, stmt, depth)?;
    }
    Ok(())
}

fn write_statement(out: &mut String, stmt: &Statement, depth: usize) -> fmt::Result {
    let pad = "    ".repeat(depth);
    match stmt {
        Statement::Expr(expr) => writeln!(out, "{pad}{expr};"),
        Statement::Assign(node) => writeln!(out, "{pad}{} = {};", node.target, node.value),
        Statement::Increment(node) => writeln!(out, "{pad}{} += {};", node.local, node.amount),
        Statement::If(node) => {
            writeln!(out, "{pad}if ({}) {{", node.condition)?;
            write_block(out, &node.then_block, depth + 1)?;
            if let Some(else_block) = &node.else_block {
                writeln!(out, "{pad}}} else {{")?;
                write_block(out, else_block, depth + 1)?;
            }
            writeln!(out, "{pad}}}")
        }
        Statement::While(node) => {
            writeln!(out, "{pad}{}: while ({}) {{", node.id, node.condition)?;
            write_block(out, &node.body, depth + 1)?;
            writeln!(out, "{pad}}}")
        }
        Statement::DoWhile(node) => {
            writeln!(out, "{pad}{}: do {{", node.id)?;
            write_block(out, &node.body, depth + 1)?;
            writeln!(out, "{pad}}} while ({});", node.condition)
        }
        Statement::For(node) => {
            let header = |slot: &Option<Box<Statement>>| {
                let mut text = String::new();
                if let Some(stmt) = slot {
                    let _ = write_statement(&mut text, stmt, 0);
                }
                text.trim_end().trim_end_matches(';').to_string()
            };
            writeln!(
                out,
                "{pad}{}: for ({}; {}; {}) {{",
                node.id,
                header(&node.init),
                node.condition,
                header(&node.update)
            )?;
            write_block(out, &node.body, depth + 1)?;
            writeln!(out, "{pad}}}")
        }
        Statement::Switch(node) => {
            writeln!(out, "{pad}{}: switch ({}) {{", node.id, node.discriminant)?;
            for arm in &node.arms {
                if arm.is_default() {
                    writeln!(out, "{pad}default:")?;
                }
                for label in &arm.labels {
                    writeln!(out, "{pad}case {label}:")?;
                }
                write_block(out, &arm.body, depth + 1)?;
            }
            writeln!(out, "{pad}}}")
        }
        Statement::Break(brk) => {
            let keyword = match brk.kind() {
                BreakKind::Break => "break",
                BreakKind::Continue => "continue",
            };
            match brk.target() {
                Some(target) if brk.is_nested() => writeln!(out, "{pad}{keyword} {target};"),
                _ => writeln!(out, "{pad}{keyword};"),
            }
        }
        Statement::Return(Some(value)) => writeln!(out, "{pad}return {value};"),
        Statement::Return(None) => writeln!(out, "{pad}return;"),
        Statement::Throw(node) => writeln!(out, "{pad}throw {};", node.exception),
        Statement::TryCatch(node) => {
            writeln!(out, "{pad}try {{")?;
            write_block(out, &node.body, depth + 1)?;
            for catch in &node.catches {
                let types = if catch.exception_types.is_empty() {
                    "java.lang.Throwable".to_string()
                } else {
                    catch
                        .exception_types
                        .iter()
                        .map(|ty| ty.replace('/', "."))
                        .collect::<Vec<_>>()
                        .join(" | ")
                };
                writeln!(out, "{pad}}} catch ({types}) {{")?;
                write_block(out, &catch.body, depth + 1)?;
            }
            writeln!(out, "{pad}}}")
        }
    }
}

/// Debug rendering in Java-like syntax; loops carry their breakable id as a label.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_statement(&mut out, self, 0)?;
        f.write_str(&out)
    }
}

impl fmt::Display for StatementBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_block(&mut out, self, 0)?;
        f.write_str(&out)
    }
}
