use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'B' => BaseType::Byte,
            'C' => BaseType::Char,
            'D' => BaseType::Double,
            'F' => BaseType::Float,
            'I' => BaseType::Int,
            'J' => BaseType::Long,
            'S' => BaseType::Short,
            'Z' => BaseType::Boolean,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn descriptor_char(self) -> char {
        match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        }
    }

    /// Java source keyword for the type.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            BaseType::Byte => "byte",
            BaseType::Char => "char",
            BaseType::Double => "double",
            BaseType::Float => "float",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Short => "short",
            BaseType::Boolean => "boolean",
        }
    }

    /// Whether the type takes part in numeric promotion. `boolean` does not.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, BaseType::Boolean)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Base(BaseType),
    /// Internal (slash separated) class name, e.g. `java/lang/String`.
    Object(String),
    Array(Box<FieldType>),
}

impl fmt::Display for FieldType {
    /// Writes the JVM descriptor form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => write!(f, "{}", base.descriptor_char()),
            FieldType::Object(name) => write!(f, "L{name};"),
            FieldType::Array(component) => write!(f, "[{component}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Type(FieldType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub return_type: ReturnType,
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        f.write_str(")")?;
        match &self.return_type {
            ReturnType::Void => f.write_str("V"),
            ReturnType::Type(ty) => write!(f, "{ty}"),
        }
    }
}

pub fn parse_field_descriptor(desc: &str) -> Result<FieldType> {
    let (ty, rest) = parse_field_type(desc, desc)?;
    if !rest.is_empty() {
        return Err(Error::TrailingInput {
            descriptor: desc.to_string(),
            rest: rest.to_string(),
        });
    }
    Ok(ty)
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor> {
    let Some(mut rest) = desc.strip_prefix('(') else {
        return Err(Error::InvalidDescriptor(desc.to_string()));
    };

    let mut params = Vec::new();
    loop {
        if let Some(after) = rest.strip_prefix(')') {
            rest = after;
            break;
        }
        if rest.is_empty() {
            return Err(Error::UnexpectedEnd(desc.to_string()));
        }
        let (param, after) = parse_field_type(rest, desc)?;
        params.push(param);
        rest = after;
    }

    let (return_type, rest) = if let Some(after) = rest.strip_prefix('V') {
        (ReturnType::Void, after)
    } else {
        let (ty, after) = parse_field_type(rest, desc)?;
        (ReturnType::Type(ty), after)
    };

    if !rest.is_empty() {
        return Err(Error::TrailingInput {
            descriptor: desc.to_string(),
            rest: rest.to_string(),
        });
    }

    Ok(MethodDescriptor {
        params,
        return_type,
    })
}

fn parse_field_type<'a>(input: &'a str, whole: &str) -> Result<(FieldType, &'a str)> {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return Err(Error::UnexpectedEnd(whole.to_string()));
    };
    let rest = chars.as_str();

    if let Some(base) = BaseType::from_char(first) {
        return Ok((FieldType::Base(base), rest));
    }

    match first {
        'L' => {
            let Some(end) = rest.find(';') else {
                return Err(Error::UnexpectedEnd(whole.to_string()));
            };
            let name = &rest[..end];
            if name.is_empty() {
                return Err(Error::InvalidDescriptor(whole.to_string()));
            }
            Ok((FieldType::Object(name.to_string()), &rest[end + 1..]))
        }
        '[' => {
            let (component, rest) = parse_field_type(rest, whole)?;
            Ok((FieldType::Array(Box::new(component)), rest))
        }
        'V' => Err(Error::VoidNotAllowed(whole.to_string())),
        _ => Err(Error::InvalidDescriptor(whole.to_string())),
    }
}
