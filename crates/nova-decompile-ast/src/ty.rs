use std::fmt;

use nova_classfile::{parse_field_descriptor, BaseType, FieldType, ReturnType};

pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";
pub const JAVA_LANG_STRING: &str = "java/lang/String";

/// Semantic type descriptor attached to expressions.
///
/// `Unknown` is the degraded result of a failed resolver lookup; it is accepted
/// by every operand constraint so gaps in type information never make an
/// otherwise valid tree unconstructible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Primitive(BaseType),
    /// Internal (slash separated) class name.
    Object(String),
    Array(Box<Ty>),
    /// Type of the `null` literal.
    Null,
    Void,
    Unknown,
}

/// Coarse operand category used for construction-time validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Numeric,
    Boolean,
    Reference,
    Void,
    Unknown,
}

impl Ty {
    pub const INT: Ty = Ty::Primitive(BaseType::Int);
    pub const LONG: Ty = Ty::Primitive(BaseType::Long);
    pub const FLOAT: Ty = Ty::Primitive(BaseType::Float);
    pub const DOUBLE: Ty = Ty::Primitive(BaseType::Double);
    pub const BOOLEAN: Ty = Ty::Primitive(BaseType::Boolean);

    pub fn object(internal_name: impl Into<String>) -> Self {
        Ty::Object(internal_name.into())
    }

    #[must_use]
    pub fn string() -> Self {
        Ty::Object(JAVA_LANG_STRING.to_string())
    }

    pub fn array_of(component: Ty) -> Self {
        Ty::Array(Box::new(component))
    }

    /// Parses a field descriptor such as `J` or `[Ljava/lang/String;`.
    pub fn from_descriptor(descriptor: &str) -> nova_classfile::Result<Self> {
        parse_field_descriptor(descriptor).map(Ty::from)
    }

    #[must_use]
    pub fn from_return_type(ret: &ReturnType) -> Self {
        match ret {
            ReturnType::Void => Ty::Void,
            ReturnType::Type(ty) => Ty::from(ty.clone()),
        }
    }

    #[must_use]
    pub fn category(&self) -> TypeCategory {
        match self {
            Ty::Primitive(BaseType::Boolean) => TypeCategory::Boolean,
            Ty::Primitive(_) => TypeCategory::Numeric,
            Ty::Object(_) | Ty::Array(_) | Ty::Null => TypeCategory::Reference,
            Ty::Void => TypeCategory::Void,
            Ty::Unknown => TypeCategory::Unknown,
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    /// Element type of an array type; `Unknown` for anything else.
    #[must_use]
    pub fn component(&self) -> Ty {
        match self {
            Ty::Array(component) => (**component).clone(),
            _ => Ty::Unknown,
        }
    }

    /// Unary numeric promotion: sub-int types widen to `int`.
    #[must_use]
    pub fn unary_promoted(&self) -> Ty {
        match self {
            Ty::Primitive(BaseType::Byte | BaseType::Short | BaseType::Char | BaseType::Int) => {
                Ty::INT
            }
            other => other.clone(),
        }
    }

    /// Binary numeric promotion (JLS 5.6.2). Non-numeric inputs yield `Unknown`.
    #[must_use]
    pub fn binary_promoted(left: &Ty, right: &Ty) -> Ty {
        fn rank(ty: &Ty) -> Option<u8> {
            match ty {
                Ty::Primitive(BaseType::Double) => Some(3),
                Ty::Primitive(BaseType::Float) => Some(2),
                Ty::Primitive(BaseType::Long) => Some(1),
                Ty::Primitive(base) if base.is_numeric() => Some(0),
                _ => None,
            }
        }

        match (rank(left), rank(right)) {
            (Some(l), Some(r)) => match l.max(r) {
                3 => Ty::DOUBLE,
                2 => Ty::FLOAT,
                1 => Ty::LONG,
                _ => Ty::INT,
            },
            _ => Ty::Unknown,
        }
    }

    /// Internal name when this is a class type.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Ty::Object(name) => Some(name),
            _ => None,
        }
    }

    /// JVM field descriptor, when the type has one.
    #[must_use]
    pub fn descriptor(&self) -> Option<String> {
        match self {
            Ty::Primitive(base) => Some(base.descriptor_char().to_string()),
            Ty::Object(name) => Some(format!("L{name};")),
            Ty::Array(component) => component.descriptor().map(|inner| format!("[{inner}")),
            Ty::Void => Some("V".to_string()),
            Ty::Null | Ty::Unknown => None,
        }
    }
}

impl From<FieldType> for Ty {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Base(base) => Ty::Primitive(base),
            FieldType::Object(name) => Ty::Object(name),
            FieldType::Array(component) => Ty::Array(Box::new(Ty::from(*component))),
        }
    }
}

impl fmt::Display for Ty {
    /// Java source spelling (`int`, `java.lang.String[]`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Primitive(base) => f.write_str(base.keyword()),
            Ty::Object(name) => f.write_str(&name.replace('/', ".")),
            Ty::Array(component) => write!(f, "{component}[]"),
            Ty::Null => f.write_str("null"),
            Ty::Void => f.write_str("void"),
            Ty::Unknown => f.write_str("<unknown>"),
        }
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeCategory::Numeric => "numeric",
            TypeCategory::Boolean => "boolean",
            TypeCategory::Reference => "reference",
            TypeCategory::Void => "void",
            TypeCategory::Unknown => "unknown",
        })
    }
}
