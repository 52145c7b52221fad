use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The descriptor ended before a complete type was read.
    UnexpectedEnd(String),
    /// A complete type was read but input remained.
    TrailingInput { descriptor: String, rest: String },
    /// `V` used anywhere other than a method return position.
    VoidNotAllowed(String),
    InvalidDescriptor(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEnd(desc) => write!(f, "unexpected end of descriptor: {desc:?}"),
            Error::TrailingInput { descriptor, rest } => {
                write!(f, "trailing input {rest:?} after descriptor {descriptor:?}")
            }
            Error::VoidNotAllowed(desc) => write!(f, "void is not a value type: {desc:?}"),
            Error::InvalidDescriptor(desc) => write!(f, "invalid descriptor: {desc:?}"),
        }
    }
}

impl std::error::Error for Error {}
