//! Typed syntax tree produced by the decompiler.
//!
//! The tree is a closed catalogue: [`Expr`] for values, [`Condition`] for
//! boolean tests and [`Statement`] for control flow. Nodes check their
//! operand types when built or mutated. Loops and switches are identified by
//! [`BreakableId`]; the [`BreakRegistry`] records which breaks target them.

#![forbid(unsafe_code)]

mod breakable;
mod condition;
mod error;
mod expr;
mod resolve;
mod stmt;
mod ty;
mod visit;

pub use crate::breakable::{
    validate_breaks, validate_construct, Break, BreakId, BreakKind, BreakRegistry, Breakable,
    BreakableId, BreakableKind,
};
pub use crate::condition::{BooleanTest, CompareOp, Comparison, Condition};
pub use crate::error::{Constraint, ConstraintError, RegistryError};
pub use crate::expr::{
    Arithmetic, ArithmeticOp, ArrayAccess, ArrayLength, Cast, Expr, ExprKind, FieldAccess,
    InstanceOf, Invoke, InvokeKind, Literal, Local, Negate, New, NewArray, NumberCompare,
    StringConcat, Ternary,
};
pub use crate::resolve::{
    common_superclass, DescriptorResolver, MapResolver, ResolveError, TypeResolver,
};
pub use crate::stmt::{
    Assignment, CatchClause, DoWhile, For, If, Increment, Statement, StatementBlock, Switch,
    SwitchArm, Throw, TryCatch, While,
};
pub use crate::ty::{Ty, TypeCategory, JAVA_LANG_OBJECT, JAVA_LANG_STRING};
pub use crate::visit::{walk, AstVisitor, Node, Rewriter};
