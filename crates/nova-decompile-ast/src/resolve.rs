//! Type lookups the decompiler cannot answer from the instruction stream alone.

use std::collections::HashMap;

use nova_classfile::parse_method_descriptor;
use thiserror::Error;

use crate::ty::{Ty, JAVA_LANG_OBJECT};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("field `{owner}.{name}` not found")]
    FieldNotFound { owner: String, name: String },
    #[error("method `{owner}.{name}{descriptor}` not found")]
    MethodNotFound {
        owner: String,
        name: String,
        descriptor: String,
    },
    #[error("class `{0}` not found")]
    ClassNotFound(String),
}

/// Answers type questions about classes outside the unit being decompiled.
///
/// Lookups may fail; callers degrade a miss to [`Ty::Unknown`] and report it
/// rather than aborting.
pub trait TypeResolver {
    fn resolve_field_type(&self, owner: &str, name: &str) -> Result<Ty, ResolveError>;

    fn resolve_method_return_type(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Ty, ResolveError>;

    /// Direct superclass of `class`; `Ok(None)` for `java/lang/Object`.
    fn resolve_superclass(&self, class: &str) -> Result<Option<String>, ResolveError>;
}

/// Answers only what descriptors already say.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorResolver;

impl TypeResolver for DescriptorResolver {
    fn resolve_field_type(&self, owner: &str, name: &str) -> Result<Ty, ResolveError> {
        Err(ResolveError::FieldNotFound {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    fn resolve_method_return_type(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Ty, ResolveError> {
        parse_method_descriptor(descriptor)
            .map(|desc| Ty::from_return_type(&desc.return_type))
            .map_err(|_| ResolveError::MethodNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })
    }

    fn resolve_superclass(&self, class: &str) -> Result<Option<String>, ResolveError> {
        if class == JAVA_LANG_OBJECT {
            Ok(None)
        } else {
            Err(ResolveError::ClassNotFound(class.to_string()))
        }
    }
}

/// Table-backed resolver, mostly for tests and embedders with a prebuilt index.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    fields: HashMap<(String, String), Ty>,
    methods: HashMap<(String, String, String), Ty>,
    superclasses: HashMap<String, Option<String>>,
}

impl MapResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, owner: &str, name: &str, ty: Ty) -> Self {
        self.fields
            .insert((owner.to_string(), name.to_string()), ty);
        self
    }

    #[must_use]
    pub fn with_method(mut self, owner: &str, name: &str, descriptor: &str, ty: Ty) -> Self {
        self.methods.insert(
            (owner.to_string(), name.to_string(), descriptor.to_string()),
            ty,
        );
        self
    }

    /// Records `class extends superclass`.
    #[must_use]
    pub fn with_superclass(mut self, class: &str, superclass: &str) -> Self {
        self.superclasses
            .insert(class.to_string(), Some(superclass.to_string()));
        self
    }
}

impl TypeResolver for MapResolver {
    fn resolve_field_type(&self, owner: &str, name: &str) -> Result<Ty, ResolveError> {
        self.fields
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ResolveError::FieldNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }

    fn resolve_method_return_type(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Ty, ResolveError> {
        self.methods
            .get(&(owner.to_string(), name.to_string(), descriptor.to_string()))
            .cloned()
            .ok_or_else(|| ResolveError::MethodNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })
    }

    fn resolve_superclass(&self, class: &str) -> Result<Option<String>, ResolveError> {
        if class == JAVA_LANG_OBJECT {
            return Ok(None);
        }
        self.superclasses
            .get(class)
            .cloned()
            .ok_or_else(|| ResolveError::ClassNotFound(class.to_string()))
    }
}

/// Closest common superclass of two class types.
///
/// Walks both chains through the resolver; any failed lookup falls back to
/// `java/lang/Object`, which is always a valid (if imprecise) answer.
pub fn common_superclass(resolver: &dyn TypeResolver, left: &str, right: &str) -> String {
    if left == right {
        return left.to_string();
    }

    let mut left_chain = vec![left.to_string()];
    let mut current = left.to_string();
    while let Ok(Some(parent)) = resolver.resolve_superclass(&current) {
        if left_chain.contains(&parent) {
            break;
        }
        left_chain.push(parent.clone());
        current = parent;
    }

    let mut current = right.to_string();
    let mut seen = vec![current.clone()];
    loop {
        if left_chain.contains(&current) {
            return current;
        }
        match resolver.resolve_superclass(&current) {
            Ok(Some(parent)) if !seen.contains(&parent) => {
                seen.push(parent.clone());
                current = parent;
            }
            _ => return JAVA_LANG_OBJECT.to_string(),
        }
    }
}
