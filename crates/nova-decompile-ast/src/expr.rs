//! Value-producing expressions.
//!
//! Every node validates its operands on construction and on replacement, so a
//! tree built through this API never holds e.g. a string on the left of a
//! subtraction. Operands whose type is [`Ty::Unknown`] pass every check.

use std::fmt;

use nova_classfile::{parse_field_descriptor, parse_method_descriptor, MethodDescriptor};

use crate::condition::Condition;
use crate::error::{Constraint, ConstraintError};
use crate::ty::{Ty, TypeCategory, JAVA_LANG_OBJECT};
use crate::visit::{structurally_equal, Node, Rewriter};

#[derive(Debug, Clone)]
pub struct Expr {
    kind: ExprKind,
    annotation: Option<Ty>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Local(Local),
    Literal(Literal),
    Arithmetic(Arithmetic),
    Negate(Negate),
    NumberCompare(NumberCompare),
    InstanceOf(InstanceOf),
    Cast(Cast),
    FieldAccess(FieldAccess),
    ArrayAccess(ArrayAccess),
    ArrayLength(ArrayLength),
    Invoke(Invoke),
    New(New),
    NewArray(NewArray),
    Ternary(Ternary),
    StringConcat(StringConcat),
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            annotation: None,
        }
    }

    pub fn local(local: Local) -> Self {
        Self::new(ExprKind::Local(local))
    }

    pub fn literal(literal: Literal) -> Self {
        Self::new(ExprKind::Literal(literal))
    }

    pub fn int(value: i32) -> Self {
        Self::literal(Literal::Int(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::literal(Literal::Boolean(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(Literal::String(value.into()))
    }

    pub fn null() -> Self {
        Self::literal(Literal::Null)
    }

    #[must_use]
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    #[must_use]
    pub fn into_kind(self) -> ExprKind {
        self.kind
    }

    /// Type written by the inference pass, if it has run.
    #[must_use]
    pub fn annotation(&self) -> Option<&Ty> {
        self.annotation.as_ref()
    }

    pub fn annotate(&mut self, ty: Ty) {
        self.annotation = Some(ty);
    }

    #[must_use]
    pub fn with_annotation(mut self, ty: Ty) -> Self {
        self.annotation = Some(ty);
        self
    }

    /// Annotated type if present, otherwise the locally inferred one.
    #[must_use]
    pub fn ty(&self) -> Ty {
        match &self.annotation {
            Some(ty) => ty.clone(),
            None => self.infer_type(),
        }
    }

    #[must_use]
    pub fn category(&self) -> TypeCategory {
        self.ty().category()
    }

    /// Type derived from this node and its operands only. Pure; never mutates.
    #[must_use]
    pub fn infer_type(&self) -> Ty {
        match &self.kind {
            ExprKind::Local(local) => local.ty.clone(),
            ExprKind::Literal(literal) => literal.ty(),
            ExprKind::Arithmetic(node) => {
                let left = node.left.ty();
                let right = node.right.ty();
                if node.op.is_shift() {
                    left.unary_promoted()
                } else if node.op.is_bitwise()
                    && left.category() == TypeCategory::Boolean
                    && right.category() == TypeCategory::Boolean
                {
                    Ty::BOOLEAN
                } else {
                    Ty::binary_promoted(&left, &right)
                }
            }
            ExprKind::Negate(node) => node.operand.ty().unary_promoted(),
            // Mirrors the comparison's left operand rather than `int`.
            ExprKind::NumberCompare(node) => node.left.ty(),
            ExprKind::InstanceOf(_) => Ty::BOOLEAN,
            ExprKind::Cast(node) => node.target.clone(),
            ExprKind::FieldAccess(node) => node.field_type.clone(),
            ExprKind::ArrayAccess(node) => node.array.ty().component(),
            ExprKind::ArrayLength(_) => Ty::INT,
            ExprKind::Invoke(node) => Ty::from_return_type(&node.method.return_type),
            ExprKind::New(node) => Ty::Object(node.owner.clone()),
            ExprKind::NewArray(node) => Ty::array_of(node.component.clone()),
            ExprKind::Ternary(node) => {
                let then_ty = node.then_value.ty();
                let else_ty = node.else_value.ty();
                ternary_type(&then_ty, &else_ty)
            }
            ExprKind::StringConcat(_) => Ty::string(),
        }
    }

    /// Whether this expression may appear on the left of an assignment.
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Local(_) | ExprKind::FieldAccess(_) | ExprKind::ArrayAccess(_)
        )
    }

    /// Operands in their fixed order. Ternary conditions are not operands;
    /// reach them through [`Ternary::condition`].
    #[must_use]
    pub fn operands(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Local(_) | ExprKind::Literal(_) => Vec::new(),
            ExprKind::Arithmetic(node) => vec![&*node.left, &*node.right],
            ExprKind::Negate(node) => vec![&*node.operand],
            ExprKind::NumberCompare(node) => vec![&*node.left, &*node.right],
            ExprKind::InstanceOf(node) => vec![&*node.value],
            ExprKind::Cast(node) => vec![&*node.value],
            ExprKind::FieldAccess(node) => node.receiver.iter().map(|r| &**r).collect(),
            ExprKind::ArrayAccess(node) => vec![&*node.array, &*node.index],
            ExprKind::ArrayLength(node) => vec![&*node.array],
            ExprKind::Invoke(node) => node
                .receiver
                .iter()
                .map(|r| &**r)
                .chain(node.args.iter())
                .collect(),
            ExprKind::New(node) => node.args.iter().collect(),
            ExprKind::NewArray(node) => std::iter::once(&*node.size)
                .chain(node.initializer.iter().flatten())
                .collect(),
            ExprKind::Ternary(node) => vec![&*node.then_value, &*node.else_value],
            ExprKind::StringConcat(node) => node.parts.iter().collect(),
        }
    }

    #[must_use]
    pub fn operand_count(&self) -> usize {
        self.operands().len()
    }

    #[must_use]
    pub fn operand(&self, index: usize) -> Option<&Expr> {
        self.operands().into_iter().nth(index)
    }

    /// Replaces the operand at `index`, returning the detached previous operand.
    ///
    /// The replacement is validated against the slot exactly as the
    /// constructor would; on error nothing changes.
    pub fn replace_operand(&mut self, index: usize, new: Expr) -> Result<Expr, ConstraintError> {
        let node = self.node_name();
        let out_of_range = ConstraintError::OperandIndex { node, index };
        match &mut self.kind {
            ExprKind::Local(_) | ExprKind::Literal(_) => Err(out_of_range),
            ExprKind::Arithmetic(node) => match index {
                0 => node.set_left(new),
                1 => node.set_right(new),
                _ => Err(out_of_range),
            },
            ExprKind::Negate(node) if index == 0 => node.set_operand(new),
            ExprKind::NumberCompare(node) => match index {
                0 => node.set_left(new),
                1 => node.set_right(new),
                _ => Err(out_of_range),
            },
            ExprKind::InstanceOf(node) if index == 0 => node.set_value(new),
            ExprKind::Cast(node) if index == 0 => node.set_value(new),
            ExprKind::FieldAccess(node) if index == 0 && node.receiver.is_some() => {
                node.set_receiver(new)
            }
            ExprKind::ArrayAccess(node) => match index {
                0 => node.set_array(new),
                1 => node.set_index(new),
                _ => Err(out_of_range),
            },
            ExprKind::ArrayLength(node) if index == 0 => node.set_array(new),
            ExprKind::Invoke(node) => node.replace_operand(index, new).ok_or(out_of_range)?,
            ExprKind::New(node) => match node.args.get(index) {
                Some(_) => node.set_arg(index, new),
                None => Err(out_of_range),
            },
            ExprKind::NewArray(node) => node.replace_operand(index, new).ok_or(out_of_range)?,
            ExprKind::Ternary(node) => match index {
                0 => node.set_then_value(new),
                1 => node.set_else_value(new),
                _ => Err(out_of_range),
            },
            ExprKind::StringConcat(node) => match node.parts.get(index) {
                Some(_) => node.set_part(index, new),
                None => Err(out_of_range),
            },
            _ => Err(out_of_range),
        }
    }

    fn node_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Local(_) => "local",
            ExprKind::Literal(_) => "literal",
            ExprKind::Arithmetic(_) => "arithmetic",
            ExprKind::Negate(_) => "negate",
            ExprKind::NumberCompare(_) => "number compare",
            ExprKind::InstanceOf(_) => "instanceof",
            ExprKind::Cast(_) => "cast",
            ExprKind::FieldAccess(_) => "field access",
            ExprKind::ArrayAccess(_) => "array access",
            ExprKind::ArrayLength(_) => "array length",
            ExprKind::Invoke(_) => "invoke",
            ExprKind::New(_) => "new",
            ExprKind::NewArray(_) => "new array",
            ExprKind::Ternary(_) => "ternary",
            ExprKind::StringConcat(_) => "string concat",
        }
    }

    /// Rebuilds the tree bottom-up through `rewriter`, re-validating every
    /// rebuilt node. Annotations survive the rebuild.
    pub fn rewrite(self, rewriter: &mut dyn Rewriter) -> Result<Expr, ConstraintError> {
        let Expr { kind, annotation } = self;
        let kind = match kind {
            kind @ (ExprKind::Local(_) | ExprKind::Literal(_)) => kind,
            ExprKind::Arithmetic(node) => ExprKind::Arithmetic(Arithmetic::new(
                node.op,
                (*node.left).rewrite(rewriter)?,
                (*node.right).rewrite(rewriter)?,
            )?),
            ExprKind::Negate(node) => ExprKind::Negate(Negate::new((*node.operand).rewrite(rewriter)?)?),
            ExprKind::NumberCompare(node) => ExprKind::NumberCompare(NumberCompare::new(
                (*node.left).rewrite(rewriter)?,
                (*node.right).rewrite(rewriter)?,
            )?),
            ExprKind::InstanceOf(node) => {
                ExprKind::InstanceOf(InstanceOf::new((*node.value).rewrite(rewriter)?, node.ty)?)
            }
            ExprKind::Cast(node) => {
                ExprKind::Cast(Cast::new(node.target, (*node.value).rewrite(rewriter)?)?)
            }
            ExprKind::FieldAccess(mut node) => {
                if let Some(receiver) = node.receiver.take() {
                    let receiver = (*receiver).rewrite(rewriter)?;
                    expect("receiver", Constraint::Reference, &receiver)?;
                    node.receiver = Some(Box::new(receiver));
                }
                ExprKind::FieldAccess(node)
            }
            ExprKind::ArrayAccess(node) => ExprKind::ArrayAccess(ArrayAccess::new(
                (*node.array).rewrite(rewriter)?,
                (*node.index).rewrite(rewriter)?,
            )?),
            ExprKind::ArrayLength(node) => {
                ExprKind::ArrayLength(ArrayLength::new((*node.array).rewrite(rewriter)?)?)
            }
            ExprKind::Invoke(node) => {
                let receiver = node
                    .receiver
                    .map(|receiver| (*receiver).rewrite(rewriter))
                    .transpose()?;
                let args = rewrite_all(node.args, rewriter)?;
                Invoke::check(node.kind, &node.method, receiver.as_ref(), &args)?;
                ExprKind::Invoke(Invoke {
                    receiver: receiver.map(Box::new),
                    args,
                    ..node
                })
            }
            ExprKind::New(node) => {
                let args = rewrite_all(node.args, rewriter)?;
                check_args("args", &node.method, &args)?;
                ExprKind::New(New { args, ..node })
            }
            ExprKind::NewArray(node) => {
                let size = (*node.size).rewrite(rewriter)?;
                let initializer = node
                    .initializer
                    .map(|values| rewrite_all(values, rewriter))
                    .transpose()?;
                ExprKind::NewArray(NewArray::new(node.component, size, initializer)?)
            }
            ExprKind::Ternary(node) => ExprKind::Ternary(Ternary::new(
                (*node.condition).rewrite(rewriter)?,
                (*node.then_value).rewrite(rewriter)?,
                (*node.else_value).rewrite(rewriter)?,
            )?),
            ExprKind::StringConcat(node) => {
                ExprKind::StringConcat(StringConcat::new(rewrite_all(node.parts, rewriter)?)?)
            }
        };
        rewriter.rewrite_expr(Expr { kind, annotation })
    }
}

fn rewrite_all(exprs: Vec<Expr>, rewriter: &mut dyn Rewriter) -> Result<Vec<Expr>, ConstraintError> {
    exprs
        .into_iter()
        .map(|expr| expr.rewrite(rewriter))
        .collect()
}

/// Structural: annotations are not part of the shape.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        structurally_equal(Node::Expr(self), Node::Expr(other))
    }
}

impl Eq for Expr {}

pub(crate) fn expect(
    param: &'static str,
    constraint: Constraint,
    expr: &Expr,
) -> Result<(), ConstraintError> {
    let found = expr.ty();
    if constraint.accepts(found.category()) {
        Ok(())
    } else {
        Err(ConstraintError::Category {
            param,
            expected: constraint,
            found,
        })
    }
}

/// Fails when both sides have known, different categories.
pub(crate) fn expect_compatible(
    param: &'static str,
    left: &Expr,
    right: &Expr,
) -> Result<(), ConstraintError> {
    let (left, right) = (left.ty(), right.ty());
    let (lc, rc) = (left.category(), right.category());
    if lc == TypeCategory::Void || rc == TypeCategory::Void {
        return Err(ConstraintError::Mismatch { param, left, right });
    }
    if lc == TypeCategory::Unknown || rc == TypeCategory::Unknown || lc == rc {
        Ok(())
    } else {
        Err(ConstraintError::Mismatch { param, left, right })
    }
}

fn ternary_type(then_ty: &Ty, else_ty: &Ty) -> Ty {
    if then_ty == else_ty {
        return then_ty.clone();
    }
    match (then_ty, else_ty) {
        (Ty::Null, other) | (other, Ty::Null) if other.category() == TypeCategory::Reference => {
            other.clone()
        }
        (Ty::Unknown, _) | (_, Ty::Unknown) => Ty::Unknown,
        _ if then_ty.category() == TypeCategory::Numeric => Ty::binary_promoted(then_ty, else_ty),
        _ if then_ty.category() == TypeCategory::Reference => Ty::object(JAVA_LANG_OBJECT),
        _ => Ty::Unknown,
    }
}

fn check_args(
    param: &'static str,
    method: &MethodDescriptor,
    args: &[Expr],
) -> Result<(), ConstraintError> {
    if method.params.len() != args.len() {
        return Err(ConstraintError::ArgumentCount {
            param,
            expected: method.params.len(),
            found: args.len(),
        });
    }
    for (param_ty, arg) in method.params.iter().zip(args) {
        let declared = Ty::from(param_ty.clone());
        expect(param, Constraint::for_type(&declared), arg)?;
    }
    Ok(())
}

fn parse_method(param: &'static str, descriptor: &str) -> Result<MethodDescriptor, ConstraintError> {
    parse_method_descriptor(descriptor)
        .map_err(|source| ConstraintError::Descriptor { param, source })
}

fn replace_boxed(slot: &mut Box<Expr>, new: Expr) -> Expr {
    std::mem::replace(&mut **slot, new)
}

/// A local variable slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Local {
    pub index: u16,
    pub name: Option<String>,
    pub ty: Ty,
}

impl Local {
    pub fn new(index: u16, ty: Ty) -> Self {
        Self {
            index,
            name: None,
            ty,
        }
    }

    pub fn named(index: u16, name: impl Into<String>, ty: Ty) -> Self {
        Self {
            index,
            name: Some(name.into()),
            ty,
        }
    }
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "local{}", self.index),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Null,
    /// `Foo.class`
    Class(Ty),
}

impl Literal {
    #[must_use]
    pub fn ty(&self) -> Ty {
        match self {
            Literal::Int(_) => Ty::INT,
            Literal::Long(_) => Ty::LONG,
            Literal::Float(_) => Ty::FLOAT,
            Literal::Double(_) => Ty::DOUBLE,
            Literal::Boolean(_) => Ty::BOOLEAN,
            Literal::String(_) => Ty::string(),
            Literal::Null => Ty::Null,
            Literal::Class(_) => Ty::object("java/lang/Class"),
        }
    }

    /// Integral zero of any width.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        matches!(self, Literal::Int(0) | Literal::Long(0))
    }
}

/// Floating values compare by bit pattern so equality stays reflexive for NaN.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Long(a), Literal::Long(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Double(a), Literal::Double(b)) => a.to_bits() == b.to_bits(),
            (Literal::Boolean(a), Literal::Boolean(b)) => a == b,
            (Literal::String(a), Literal::String(b)) => a == b,
            (Literal::Null, Literal::Null) => true,
            (Literal::Class(a), Literal::Class(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    And,
    Or,
    Xor,
}

impl ArithmeticOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Rem => "%",
            ArithmeticOp::Shl => "<<",
            ArithmeticOp::Shr => ">>",
            ArithmeticOp::Ushr => ">>>",
            ArithmeticOp::And => "&",
            ArithmeticOp::Or => "|",
            ArithmeticOp::Xor => "^",
        }
    }

    #[must_use]
    pub fn is_bitwise(self) -> bool {
        matches!(self, ArithmeticOp::And | ArithmeticOp::Or | ArithmeticOp::Xor)
    }

    #[must_use]
    pub fn is_shift(self) -> bool {
        matches!(self, ArithmeticOp::Shl | ArithmeticOp::Shr | ArithmeticOp::Ushr)
    }
}

#[derive(Debug, Clone)]
pub struct Arithmetic {
    op: ArithmeticOp,
    left: Box<Expr>,
    right: Box<Expr>,
}

impl Arithmetic {
    pub fn new(op: ArithmeticOp, left: Expr, right: Expr) -> Result<Self, ConstraintError> {
        Self::check(op, &left, &right)?;
        Ok(Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn check(op: ArithmeticOp, left: &Expr, right: &Expr) -> Result<(), ConstraintError> {
        if op.is_bitwise() {
            expect("left", Constraint::NumericOrBoolean, left)?;
            expect("right", Constraint::NumericOrBoolean, right)?;
            expect_compatible("operands", left, right)
        } else {
            expect("left", Constraint::Numeric, left)?;
            expect("right", Constraint::Numeric, right)
        }
    }

    #[must_use]
    pub fn op(&self) -> ArithmeticOp {
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
        Ok(replace_boxed(&mut self.left, left))
    }

    pub fn set_right(&mut self, right: Expr) -> Result<Expr, ConstraintError> {
        Self::check(self.op, &self.left, &right)?;
        Ok(replace_boxed(&mut self.right, right))
    }

    #[must_use]
    pub fn into_parts(self) -> (ArithmeticOp, Expr, Expr) {
        (self.op, *self.left, *self.right)
    }
}

#[derive(Debug, Clone)]
pub struct Negate {
    operand: Box<Expr>,
}

impl Negate {
    pub fn new(operand: Expr) -> Result<Self, ConstraintError> {
        expect("operand", Constraint::Numeric, &operand)?;
        Ok(Self {
            operand: Box::new(operand),
        })
    }

    #[must_use]
    pub fn operand(&self) -> &Expr {
        &self.operand
    }

    pub fn set_operand(&mut self, operand: Expr) -> Result<Expr, ConstraintError> {
        expect("operand", Constraint::Numeric, &operand)?;
        Ok(replace_boxed(&mut self.operand, operand))
    }

    #[must_use]
    pub fn into_operand(self) -> Expr {
        *self.operand
    }
}

/// Three-way numeric comparison (`lcmp`, `fcmpl` and friends).
///
/// Evaluates to the sign of `right - left`: positive when `right` is larger.
#[derive(Debug, Clone)]
pub struct NumberCompare {
    left: Box<Expr>,
    right: Box<Expr>,
}

impl NumberCompare {
    pub fn new(left: Expr, right: Expr) -> Result<Self, ConstraintError> {
        expect("left", Constraint::Numeric, &left)?;
        expect("right", Constraint::Numeric, &right)?;
        Ok(Self {
            left: Box::new(left),
            right: Box::new(right),
        })
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
        expect("left", Constraint::Numeric, &left)?;
        Ok(replace_boxed(&mut self.left, left))
    }

    pub fn set_right(&mut self, right: Expr) -> Result<Expr, ConstraintError> {
        expect("right", Constraint::Numeric, &right)?;
        Ok(replace_boxed(&mut self.right, right))
    }

    #[must_use]
    pub fn into_parts(self) -> (Expr, Expr) {
        (*self.left, *self.right)
    }
}

#[derive(Debug, Clone)]
pub struct InstanceOf {
    value: Box<Expr>,
    ty: Ty,
}

impl InstanceOf {
    pub fn new(value: Expr, ty: Ty) -> Result<Self, ConstraintError> {
        expect("value", Constraint::Reference, &value)?;
        if !Constraint::Reference.accepts(ty.category()) {
            return Err(ConstraintError::Category {
                param: "type",
                expected: Constraint::Reference,
                found: ty,
            });
        }
        Ok(Self {
            value: Box::new(value),
            ty,
        })
    }

    #[must_use]
    pub fn value(&self) -> &Expr {
        &self.value
    }

    #[must_use]
    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    pub fn set_value(&mut self, value: Expr) -> Result<Expr, ConstraintError> {
        expect("value", Constraint::Reference, &value)?;
        Ok(replace_boxed(&mut self.value, value))
    }
}

#[derive(Debug, Clone)]
pub struct Cast {
    target: Ty,
    value: Box<Expr>,
}

impl Cast {
    pub fn new(target: Ty, value: Expr) -> Result<Self, ConstraintError> {
        expect("value", Constraint::for_type(&target), &value)?;
        Ok(Self {
            target,
            value: Box::new(value),
        })
    }

    #[must_use]
    pub fn target(&self) -> &Ty {
        &self.target
    }

    #[must_use]
    pub fn value(&self) -> &Expr {
        &self.value
    }

    pub fn set_value(&mut self, value: Expr) -> Result<Expr, ConstraintError> {
        expect("value", Constraint::for_type(&self.target), &value)?;
        Ok(replace_boxed(&mut self.value, value))
    }
}

#[derive(Debug, Clone)]
pub struct FieldAccess {
    owner: String,
    name: String,
    descriptor: String,
    field_type: Ty,
    receiver: Option<Box<Expr>>,
}

impl FieldAccess {
    pub fn new_static(owner: &str, name: &str, descriptor: &str) -> Result<Self, ConstraintError> {
        let field_type = parse_field_descriptor(descriptor)
            .map(Ty::from)
            .map_err(|source| ConstraintError::Descriptor {
                param: "descriptor",
                source,
            })?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            field_type,
            receiver: None,
        })
    }

    pub fn new_instance(
        receiver: Expr,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Self, ConstraintError> {
        expect("receiver", Constraint::Reference, &receiver)?;
        let mut access = Self::new_static(owner, name, descriptor)?;
        access.receiver = Some(Box::new(receiver));
        Ok(access)
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    #[must_use]
    pub fn field_type(&self) -> &Ty {
        &self.field_type
    }

    #[must_use]
    pub fn receiver(&self) -> Option<&Expr> {
        self.receiver.as_deref()
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.receiver.is_none()
    }

    pub fn set_receiver(&mut self, receiver: Expr) -> Result<Expr, ConstraintError> {
        expect("receiver", Constraint::Reference, &receiver)?;
        match &mut self.receiver {
            Some(slot) => Ok(replace_boxed(slot, receiver)),
            None => Err(ConstraintError::UnexpectedReceiver { param: "receiver" }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayAccess {
    array: Box<Expr>,
    index: Box<Expr>,
}

impl ArrayAccess {
    pub fn new(array: Expr, index: Expr) -> Result<Self, ConstraintError> {
        expect("array", Constraint::Reference, &array)?;
        expect("index", Constraint::Numeric, &index)?;
        Ok(Self {
            array: Box::new(array),
            index: Box::new(index),
        })
    }

    #[must_use]
    pub fn array(&self) -> &Expr {
        &self.array
    }

    #[must_use]
    pub fn index(&self) -> &Expr {
        &self.index
    }

    pub fn set_array(&mut self, array: Expr) -> Result<Expr, ConstraintError> {
        expect("array", Constraint::Reference, &array)?;
        Ok(replace_boxed(&mut self.array, array))
    }

    pub fn set_index(&mut self, index: Expr) -> Result<Expr, ConstraintError> {
        expect("index", Constraint::Numeric, &index)?;
        Ok(replace_boxed(&mut self.index, index))
    }
}

#[derive(Debug, Clone)]
pub struct ArrayLength {
    array: Box<Expr>,
}

impl ArrayLength {
    pub fn new(array: Expr) -> Result<Self, ConstraintError> {
        expect("array", Constraint::Reference, &array)?;
        Ok(Self {
            array: Box::new(array),
        })
    }

    #[must_use]
    pub fn array(&self) -> &Expr {
        &self.array
    }

    pub fn set_array(&mut self, array: Expr) -> Result<Expr, ConstraintError> {
        expect("array", Constraint::Reference, &array)?;
        Ok(replace_boxed(&mut self.array, array))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Virtual,
    Interface,
    Special,
    Dynamic,
}

impl InvokeKind {
    #[must_use]
    pub fn has_receiver(self) -> bool {
        !matches!(self, InvokeKind::Static | InvokeKind::Dynamic)
    }
}

#[derive(Debug, Clone)]
pub struct Invoke {
    kind: InvokeKind,
    owner: String,
    name: String,
    descriptor: String,
    method: MethodDescriptor,
    receiver: Option<Box<Expr>>,
    args: Vec<Expr>,
}

impl Invoke {
    pub fn new(
        kind: InvokeKind,
        owner: &str,
        name: &str,
        descriptor: &str,
        receiver: Option<Expr>,
        args: Vec<Expr>,
    ) -> Result<Self, ConstraintError> {
        let method = parse_method("descriptor", descriptor)?;
        Self::check(kind, &method, receiver.as_ref(), &args)?;
        Ok(Self {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            method,
            receiver: receiver.map(Box::new),
            args,
        })
    }

    fn check(
        kind: InvokeKind,
        method: &MethodDescriptor,
        receiver: Option<&Expr>,
        args: &[Expr],
    ) -> Result<(), ConstraintError> {
        match (kind.has_receiver(), receiver) {
            (true, Some(receiver)) => expect("receiver", Constraint::Reference, receiver)?,
            (true, None) => return Err(ConstraintError::MissingReceiver { param: "receiver" }),
            (false, Some(_)) => {
                return Err(ConstraintError::UnexpectedReceiver { param: "receiver" })
            }
            (false, None) => {}
        }
        check_args("args", method, args)
    }

    #[must_use]
    pub fn kind(&self) -> InvokeKind {
        self.kind
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    #[must_use]
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    #[must_use]
    pub fn receiver(&self) -> Option<&Expr> {
        self.receiver.as_deref()
    }

    #[must_use]
    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    /// Receiver and arguments, consuming the call.
    #[must_use]
    pub fn into_operands(self) -> (Option<Expr>, Vec<Expr>) {
        (self.receiver.map(|receiver| *receiver), self.args)
    }

    pub fn set_arg(&mut self, index: usize, arg: Expr) -> Result<Expr, ConstraintError> {
        let Some(param) = self.method.params.get(index) else {
            return Err(ConstraintError::OperandIndex {
                node: "invoke",
                index,
            });
        };
        expect("args", Constraint::for_type(&Ty::from(param.clone())), &arg)?;
        match self.args.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, arg)),
            None => Err(ConstraintError::OperandIndex {
                node: "invoke",
                index,
            }),
        }
    }

    fn replace_operand(
        &mut self,
        index: usize,
        new: Expr,
    ) -> Option<Result<Expr, ConstraintError>> {
        let arg_index = match (&mut self.receiver, index) {
            (Some(receiver), 0) => {
                return Some(
                    expect("receiver", Constraint::Reference, &new)
                        .map(|()| replace_boxed(receiver, new)),
                );
            }
            (Some(_), _) => index - 1,
            (None, _) => index,
        };
        (arg_index < self.args.len()).then(|| self.set_arg(arg_index, new))
    }
}

/// `new Owner(args)`; the descriptor is the constructor's.
#[derive(Debug, Clone)]
pub struct New {
    owner: String,
    descriptor: String,
    method: MethodDescriptor,
    args: Vec<Expr>,
}

impl New {
    pub fn new(owner: &str, descriptor: &str, args: Vec<Expr>) -> Result<Self, ConstraintError> {
        let method = parse_method("descriptor", descriptor)?;
        check_args("args", &method, &args)?;
        Ok(Self {
            owner: owner.to_string(),
            descriptor: descriptor.to_string(),
            method,
            args,
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    #[must_use]
    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    pub fn set_arg(&mut self, index: usize, arg: Expr) -> Result<Expr, ConstraintError> {
        let Some(param) = self.method.params.get(index) else {
            return Err(ConstraintError::OperandIndex { node: "new", index });
        };
        expect("args", Constraint::for_type(&Ty::from(param.clone())), &arg)?;
        match self.args.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, arg)),
            None => Err(ConstraintError::OperandIndex { node: "new", index }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewArray {
    component: Ty,
    size: Box<Expr>,
    initializer: Option<Vec<Expr>>,
}

impl NewArray {
    pub fn new(
        component: Ty,
        size: Expr,
        initializer: Option<Vec<Expr>>,
    ) -> Result<Self, ConstraintError> {
        expect("size", Constraint::Numeric, &size)?;
        let element = Constraint::for_type(&component);
        for value in initializer.iter().flatten() {
            expect("initializer", element, value)?;
        }
        Ok(Self {
            component,
            size: Box::new(size),
            initializer,
        })
    }

    #[must_use]
    pub fn component(&self) -> &Ty {
        &self.component
    }

    #[must_use]
    pub fn size(&self) -> &Expr {
        &self.size
    }

    #[must_use]
    pub fn initializer(&self) -> Option<&[Expr]> {
        self.initializer.as_deref()
    }

    fn replace_operand(
        &mut self,
        index: usize,
        new: Expr,
    ) -> Option<Result<Expr, ConstraintError>> {
        if index == 0 {
            return Some(
                expect("size", Constraint::Numeric, &new).map(|()| replace_boxed(&mut self.size, new)),
            );
        }
        let element = Constraint::for_type(&self.component);
        let slot = self.initializer.as_mut()?.get_mut(index - 1)?;
        Some(expect("initializer", element, &new).map(|()| std::mem::replace(slot, new)))
    }
}

/// `condition ? then_value : else_value`
#[derive(Debug, Clone)]
pub struct Ternary {
    condition: Box<Condition>,
    then_value: Box<Expr>,
    else_value: Box<Expr>,
}

impl Ternary {
    pub fn new(
        condition: Condition,
        then_value: Expr,
        else_value: Expr,
    ) -> Result<Self, ConstraintError> {
        expect_compatible("ternary", &then_value, &else_value)?;
        Ok(Self {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        })
    }

    #[must_use]
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    #[must_use]
    pub fn then_value(&self) -> &Expr {
        &self.then_value
    }

    #[must_use]
    pub fn else_value(&self) -> &Expr {
        &self.else_value
    }

    pub fn set_condition(&mut self, condition: Condition) -> Condition {
        std::mem::replace(&mut *self.condition, condition)
    }

    pub fn set_then_value(&mut self, value: Expr) -> Result<Expr, ConstraintError> {
        expect_compatible("ternary", &value, &self.else_value)?;
        Ok(replace_boxed(&mut self.then_value, value))
    }

    pub fn set_else_value(&mut self, value: Expr) -> Result<Expr, ConstraintError> {
        expect_compatible("ternary", &self.then_value, &value)?;
        Ok(replace_boxed(&mut self.else_value, value))
    }
}

/// String concatenation, typically folded from a `StringBuilder` chain.
#[derive(Debug, Clone)]
pub struct StringConcat {
    parts: Vec<Expr>,
}

impl StringConcat {
    pub fn new(parts: Vec<Expr>) -> Result<Self, ConstraintError> {
        for part in &parts {
            expect("parts", Constraint::Value, part)?;
        }
        Ok(Self { parts })
    }

    #[must_use]
    pub fn parts(&self) -> &[Expr] {
        &self.parts
    }

    pub fn set_part(&mut self, index: usize, part: Expr) -> Result<Expr, ConstraintError> {
        expect("parts", Constraint::Value, &part)?;
        match self.parts.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, part)),
            None => Err(ConstraintError::OperandIndex {
                node: "string concat",
                index,
            }),
        }
    }
}

macro_rules! impl_from_node {
    ($($node:ident),* $(,)?) => {
        $(
            impl From<$node> for Expr {
                fn from(node: $node) -> Self {
                    Expr::new(ExprKind::$node(node))
                }
            }
        )*
    };
}

impl_from_node!(
    Arithmetic,
    Negate,
    NumberCompare,
    InstanceOf,
    Cast,
    FieldAccess,
    ArrayAccess,
    ArrayLength,
    Invoke,
    New,
    NewArray,
    Ternary,
    StringConcat,
);

impl From<Local> for Expr {
    fn from(local: Local) -> Self {
        Expr::local(local)
    }
}

impl From<Literal> for Expr {
    fn from(literal: Literal) -> Self {
        Expr::literal(literal)
    }
}

fn source_name(internal: &str) -> String {
    internal.replace('/', ".")
}

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr], sep: &str) -> fmt::Result {
    for (idx, expr) in exprs.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{expr}")?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Long(v) => write!(f, "{v}L"),
            Literal::Float(v) => write!(f, "{v:?}F"),
            Literal::Double(v) => write!(f, "{v:?}"),
            Literal::Boolean(v) => write!(f, "{v}"),
            Literal::String(v) => write!(f, "\"{}\"", v.escape_debug()),
            Literal::Null => f.write_str("null"),
            Literal::Class(ty) => write!(f, "{ty}.class"),
        }
    }
}

/// Debug rendering in Java-like syntax; not a source emitter.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Local(local) => write!(f, "{local}"),
            ExprKind::Literal(literal) => write!(f, "{literal}"),
            ExprKind::Arithmetic(node) => {
                write!(f, "({} {} {})", node.left, node.op.symbol(), node.right)
            }
            ExprKind::Negate(node) => write!(f, "-{}", node.operand),
            ExprKind::NumberCompare(node) => {
                write!(f, "Integer.signum({} - {})", node.right, node.left)
            }
            ExprKind::InstanceOf(node) => write!(f, "({} instanceof {})", node.value, node.ty),
            ExprKind::Cast(node) => write!(f, "(({}) {})", node.target, node.value),
            ExprKind::FieldAccess(node) => match &node.receiver {
                Some(receiver) => write!(f, "{receiver}.{}", node.name),
                None => write!(f, "{}.{}", source_name(&node.owner), node.name),
            },
            ExprKind::ArrayAccess(node) => write!(f, "{}[{}]", node.array, node.index),
            ExprKind::ArrayLength(node) => write!(f, "{}.length", node.array),
            ExprKind::Invoke(node) => {
                match &node.receiver {
                    Some(receiver) => write!(f, "{receiver}.{}(", node.name)?,
                    None => write!(f, "{}.{}(", source_name(&node.owner), node.name)?,
                }
                write_list(f, &node.args, ", ")?;
                f.write_str(")")
            }
            ExprKind::New(node) => {
                write!(f, "new {}(", source_name(&node.owner))?;
                write_list(f, &node.args, ", ")?;
                f.write_str(")")
            }
            ExprKind::NewArray(node) => match &node.initializer {
                Some(values) => {
                    write!(f, "new {}[] {{", node.component)?;
                    write_list(f, values, ", ")?;
                    f.write_str("}")
                }
                None => write!(f, "new {}[{}]", node.component, node.size),
            },
            ExprKind::Ternary(node) => write!(
                f,
                "({} ? {} : {})",
                node.condition, node.then_value, node.else_value
            ),
            ExprKind::StringConcat(node) => write_list(f, &node.parts, " + "),
        }
    }
}
