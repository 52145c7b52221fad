use std::fmt;

use crate::error::{Constraint, ConstraintError};
use crate::expr::{expect, Expr};
use crate::ty::TypeCategory;
use crate::visit::{structurally_equal, Node, Rewriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Logical complement: `a < b` becomes `a >= b`.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }

    /// Same relation with the operands swapped: `a < b` is `b > a`.
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }

    #[must_use]
    pub fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Boolean-valued test used by `if`, loops and ternaries.
#[derive(Debug, Clone)]
pub enum Condition {
    Compare(Comparison),
    Boolean(BooleanTest),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Constant(bool),
}

impl Condition {
    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Result<Self, ConstraintError> {
        Comparison::new(op, left, right).map(Condition::Compare)
    }

    pub fn boolean(value: Expr) -> Result<Self, ConstraintError> {
        BooleanTest::new(value, false).map(Condition::Boolean)
    }

    /// Logical complement. Pushes negation inward (De Morgan) instead of
    /// wrapping in `Not` wherever a direct form exists.
    #[must_use]
    pub fn negate(self) -> Condition {
        match self {
            Condition::Compare(cmp) => Condition::Compare(Comparison {
                op: cmp.op.negate(),
                ..cmp
            }),
            Condition::Boolean(test) => Condition::Boolean(BooleanTest {
                inverted: !test.inverted,
                ..test
            }),
            Condition::And(parts) => {
                Condition::Or(parts.into_iter().map(Condition::negate).collect())
            }
            Condition::Or(parts) => {
                Condition::And(parts.into_iter().map(Condition::negate).collect())
            }
            Condition::Not(inner) => *inner,
            Condition::Constant(value) => Condition::Constant(!value),
        }
    }

    /// `self && other`, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Condition) -> Condition {
        let mut parts = match self {
            Condition::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Condition::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Condition::And(parts)
    }

    /// `self || other`, flattening nested disjunctions.
    #[must_use]
    pub fn or(self, other: Condition) -> Condition {
        let mut parts = match self {
            Condition::Or(parts) => parts,
            single => vec![single],
        };
        match other {
            Condition::Or(more) => parts.extend(more),
            single => parts.push(single),
        }
        Condition::Or(parts)
    }

    /// Expressions directly held by this condition (not nested conditions).
    #[must_use]
    pub fn operands(&self) -> Vec<&Expr> {
        match self {
            Condition::Compare(cmp) => vec![&cmp.left, &cmp.right],
            Condition::Boolean(test) => vec![&test.value],
            Condition::And(_) | Condition::Or(_) | Condition::Not(_) | Condition::Constant(_) => {
                Vec::new()
            }
        }
    }

    pub fn rewrite(self, rewriter: &mut dyn Rewriter) -> Result<Condition, ConstraintError> {
        let rebuilt = match self {
            Condition::Compare(cmp) => Condition::Compare(Comparison::new(
                cmp.op,
                cmp.left.rewrite(rewriter)?,
                cmp.right.rewrite(rewriter)?,
            )?),
            Condition::Boolean(test) => Condition::Boolean(BooleanTest::new(
                test.value.rewrite(rewriter)?,
                test.inverted,
            )?),
            Condition::And(parts) => Condition::And(rewrite_all(parts, rewriter)?),
            Condition::Or(parts) => Condition::Or(rewrite_all(parts, rewriter)?),
            Condition::Not(inner) => Condition::Not(Box::new((*inner).rewrite(rewriter)?)),
            constant @ Condition::Constant(_) => constant,
        };
        rewriter.rewrite_condition(rebuilt)
    }
}

fn rewrite_all(
    parts: Vec<Condition>,
    rewriter: &mut dyn Rewriter,
) -> Result<Vec<Condition>, ConstraintError> {
    parts
        .into_iter()
        .map(|part| part.rewrite(rewriter))
        .collect()
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        structurally_equal(Node::Condition(self), Node::Condition(other))
    }
}

impl Eq for Condition {}

/// `left op right`. Ordering operators need numeric operands; `==`/`!=`
/// also accept two references or two booleans.
#[derive(Debug, Clone)]
pub struct Comparison {
    op: CompareOp,
    left: Expr,
    right: Expr,
}

impl Comparison {
    pub fn new(op: CompareOp, left: Expr, right: Expr) -> Result<Self, ConstraintError> {
        Self::check(op, &left, &right)?;
        Ok(Self { op, left, right })
    }

    fn check(op: CompareOp, left: &Expr, right: &Expr) -> Result<(), ConstraintError> {
        if !op.is_equality() {
            expect("left", Constraint::Numeric, left)?;
            return expect("right", Constraint::Numeric, right);
        }

        let (lc, rc) = (left.category(), right.category());
        let known = |category: TypeCategory| category != TypeCategory::Unknown;
        if known(lc) && known(rc) && lc != rc {
            return Err(ConstraintError::Mismatch {
                param: "comparison",
                left: left.ty(),
                right: right.ty(),
            });
        }
        expect("left", Constraint::Value, left)?;
        expect("right", Constraint::Value, right)
    }

    #[must_use]
    pub fn op(&self) -> CompareOp {
        self.op
    }

    #[must_use]
    pub fn left(&self) -> &Expr {
        &self.left
    }

    #[must_use]
    pub fn right(&self) -> &Expr {
        &self.right
    }

    pub fn set_left(&mut self, left: Expr) -> Result<Expr, ConstraintError> {
        Self::check(self.op, &left, &self.right)?;
        Ok(std::mem::replace(&mut self.left, left))
    }

    pub fn set_right(&mut self, right: Expr) -> Result<Expr, ConstraintError> {
        Self::check(self.op, &self.left, &right)?;
        Ok(std::mem::replace(&mut self.right, right))
    }

    #[must_use]
    pub fn into_parts(self) -> (CompareOp, Expr, Expr) {
        (self.op, self.left, self.right)
    }
}

/// A boolean-typed expression used directly as a condition, possibly negated.
#[derive(Debug, Clone)]
pub struct BooleanTest {
    value: Expr,
    inverted: bool,
}

impl BooleanTest {
    pub fn new(value: Expr, inverted: bool) -> Result<Self, ConstraintError> {
        expect("value", Constraint::Boolean, &value)?;
        Ok(Self { value, inverted })
    }

    #[must_use]
    pub fn value(&self) -> &Expr {
        &self.value
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    #[must_use]
    pub fn into_value(self) -> Expr {
        self.value
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Condition], sep: &str) -> fmt::Result {
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        match part {
            Condition::And(_) | Condition::Or(_) => write!(f, "({part})")?,
            _ => write!(f, "{part}")?,
        }
    }
    Ok(())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare(cmp) => {
                write!(f, "{} {} {}", cmp.left, cmp.op.symbol(), cmp.right)
            }
            Condition::Boolean(test) if test.inverted => write!(f, "!{}", test.value),
            Condition::Boolean(test) => write!(f, "{}", test.value),
            Condition::And(parts) => write_joined(f, parts, " && "),
            Condition::Or(parts) => write_joined(f, parts, " || "),
            Condition::Not(inner) => write!(f, "!({inner})"),
            Condition::Constant(value) => write!(f, "{value}"),
        }
    }
}
