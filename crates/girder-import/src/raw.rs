//! Unresolved, as-decoded structural observations. Everything here is
//! keyed by binary type names; nothing references graph nodes yet.

use girder_classfile::{Annotation, ClassSignature, ElementValue, FieldTypeSignature, MethodSignature};
use girder_graph::TypeRef;

/// Identity of the code unit a raw fact was observed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RawCodeUnit {
    /// Binary name of the declaring class.
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl RawCodeUnit {
    pub(crate) fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawAccessKind {
    FieldRead,
    FieldWrite,
    MethodCall,
    ConstructorCall,
    MethodReference,
    ConstructorReference,
    ClassObject,
    InstanceofCheck,
}

/// The target as referenced in the bytecode. For class-object and
/// instanceof records only the owner is meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTarget {
    pub owner: TypeRef,
    pub name: String,
    pub descriptor: String,
}

impl RawTarget {
    pub(crate) fn type_only(owner: TypeRef) -> Self {
        Self {
            owner,
            name: String::new(),
            descriptor: String::new(),
        }
    }
}

/// One dependency observation. Immutable; synthetic-origin resolution
/// copies records with a replaced origin, it never mutates them.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawAccessRecord {
    pub origin: RawCodeUnit,
    pub kind: RawAccessKind,
    pub target: RawTarget,
    pub line_number: u16,
    pub declared_in_lambda: bool,
}

/// A correlated try/catch region with the records that occur textually
/// inside it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawTryCatch {
    pub origin: RawCodeUnit,
    pub caught_types: Vec<TypeRef>,
    pub line_number: u16,
    pub records: Vec<RawAccessRecord>,
}

/// An invocation of a synthetic code unit, kept in the synthetic-origin
/// index instead of ordinary access storage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyntheticInvocation {
    pub origin: RawCodeUnit,
    /// True when the link is a lambda-body hook rather than an accessor
    /// call; OR-accumulated across rewrite chains.
    pub through_lambda: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RawField {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
    pub signature: Option<FieldTypeSignature>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawMethod {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
    pub signature: Option<MethodSignature>,
    pub annotations: Vec<Annotation>,
    pub annotation_default: Option<ElementValue>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawConstructor {
    pub descriptor: String,
    pub access_flags: u16,
    pub signature: Option<MethodSignature>,
    pub annotations: Vec<Annotation>,
}

/// Everything the decoder reported for one type. Created on the type's
/// single decoding visit, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawClassFacts {
    pub access_flags: u16,
    pub class_file_version: (u16, u16),
    pub source_file: Option<String>,
    superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub signature: Option<ClassSignature>,
    pub fields: Vec<RawField>,
    pub methods: Vec<RawMethod>,
    pub constructors: Vec<RawConstructor>,
    static_initializer: bool,
    pub annotations: Vec<Annotation>,
    pub enclosing_class: Option<String>,
    pub enclosing_code_unit: Option<RawCodeUnit>,
}

impl RawClassFacts {
    /// Single-valued: registering two different superclasses for the same
    /// type is a programming error, not a recoverable condition.
    pub(crate) fn set_superclass(&mut self, owner: &str, superclass: String) {
        match &self.superclass {
            Some(existing) if *existing != superclass => panic!(
                "conflicting superclass registration for {owner}: {existing} vs {superclass}"
            ),
            _ => self.superclass = Some(superclass),
        }
    }

    pub(crate) fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Single-valued like the superclass registration.
    pub(crate) fn set_static_initializer(&mut self, owner: &str) {
        if self.static_initializer {
            panic!("static initializer registered twice for {owner}");
        }
        self.static_initializer = true;
    }

    pub(crate) fn has_static_initializer(&self) -> bool {
        self.static_initializer
    }
}
