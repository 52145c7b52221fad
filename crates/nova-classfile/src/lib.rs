//! JVM type descriptors, as carried by field and invocation instructions.

#![forbid(unsafe_code)]

mod descriptor;
mod error;

pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
pub use crate::descriptor::{BaseType, FieldType, MethodDescriptor, ReturnType};
pub use crate::error::{Error, Result};
