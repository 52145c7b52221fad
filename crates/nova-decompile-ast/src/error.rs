use std::fmt;

use thiserror::Error;

use crate::breakable::{BreakId, BreakableId, BreakableKind};
use crate::ty::{Ty, TypeCategory};

/// Category an operand slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Numeric,
    Boolean,
    Reference,
    /// Numeric or boolean; the bitwise operators accept both.
    NumericOrBoolean,
    /// Anything producing a value.
    Value,
}

impl Constraint {
    /// `Unknown` satisfies every constraint.
    #[must_use]
    pub fn accepts(self, category: TypeCategory) -> bool {
        if category == TypeCategory::Unknown {
            return true;
        }
        match self {
            Constraint::Numeric => category == TypeCategory::Numeric,
            Constraint::Boolean => category == TypeCategory::Boolean,
            Constraint::Reference => category == TypeCategory::Reference,
            Constraint::NumericOrBoolean => {
                matches!(category, TypeCategory::Numeric | TypeCategory::Boolean)
            }
            Constraint::Value => category != TypeCategory::Void,
        }
    }

    /// Constraint matching a declared type (parameter, array component, cast target).
    #[must_use]
    pub fn for_type(ty: &Ty) -> Self {
        match ty.category() {
            TypeCategory::Numeric => Constraint::Numeric,
            TypeCategory::Boolean => Constraint::Boolean,
            TypeCategory::Reference => Constraint::Reference,
            TypeCategory::Void | TypeCategory::Unknown => Constraint::Value,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Constraint::Numeric => "numeric",
            Constraint::Boolean => "boolean",
            Constraint::Reference => "reference",
            Constraint::NumericOrBoolean => "numeric or boolean",
            Constraint::Value => "value",
        })
    }
}

/// A node was built (or mutated) with an operand it cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("`{param}` expects a {expected} operand, found `{found}`")]
    Category {
        param: &'static str,
        expected: Constraint,
        found: Ty,
    },
    #[error("`{param}` is not an assignable expression")]
    NotAssignable { param: &'static str },
    #[error("`{param}` has a malformed descriptor: {source}")]
    Descriptor {
        param: &'static str,
        #[source]
        source: nova_classfile::Error,
    },
    #[error("`{param}` expects {expected} arguments, found {found}")]
    ArgumentCount {
        param: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("`{param}` requires a receiver")]
    MissingReceiver { param: &'static str },
    #[error("`{param}` is static and cannot have a receiver")]
    UnexpectedReceiver { param: &'static str },
    #[error("operand index {index} is out of range for {node}")]
    OperandIndex { node: &'static str, index: usize },
    #[error("the two branches of `{param}` have incompatible types `{left}` and `{right}`")]
    Mismatch {
        param: &'static str,
        left: Ty,
        right: Ty,
    },
    #[error("switch label {0} appears in more than one arm")]
    DuplicateLabel(i32),
    #[error("switch has more than one default arm")]
    DuplicateDefault,
}

/// Inconsistency between breaks in a tree and the relation table that tracks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("breakable {0} was never declared")]
    UnknownBreakable(BreakableId),
    #[error("break {brk} already targets {current}; retarget it instead of registering on {requested}")]
    AlreadyTargeted {
        brk: BreakId,
        current: BreakableId,
        requested: BreakableId,
    },
    #[error("continue {brk} cannot target switch {target}")]
    ContinueTargetsSwitch { brk: BreakId, target: BreakableId },
    #[error("breakable {target} cannot become {kind:?} while continues target it")]
    KindChange {
        target: BreakableId,
        kind: BreakableKind,
    },
    #[error("break {0} has no target")]
    Unregistered(BreakId),
    #[error("break {brk} targets {target}, which does not enclose it")]
    NotEnclosing { brk: BreakId, target: BreakableId },
    #[error("break {brk} targets {found:?} but the registry records {recorded:?}")]
    Inconsistent {
        brk: BreakId,
        found: Option<BreakableId>,
        recorded: Option<BreakableId>,
    },
    #[error("breakable {target} lists break {brk}, which is not in the tree")]
    StaleBreak { brk: BreakId, target: BreakableId },
    #[error("break {0} appears more than once in the tree")]
    DuplicateBreak(BreakId),
}
