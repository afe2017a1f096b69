use crate::members::MemberId;
use crate::name::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccessKind {
    Read,
    Write,
}

/// One resolved dependency edge, attributed to the code unit a human wrote
/// (synthetic indirection has already been rewritten away).
#[derive(Debug, Clone, PartialEq)]
pub struct JavaAccess {
    pub origin: MemberId,
    pub detail: AccessDetail,
    /// Source line of the access, 0 when no line metadata was present.
    pub line_number: u16,
    pub declared_in_lambda: bool,
}

/// Target descriptors keep the raw owner as referenced in the bytecode;
/// `resolved` points at the concrete declaration(s) found by hierarchy
/// search. Method calls and references resolve to a set (empty when the
/// declaration is ambiguous); field and constructor targets are unique or
/// absent, never guessed.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessDetail {
    FieldAccess {
        kind: FieldAccessKind,
        owner: TypeRef,
        name: String,
        descriptor: String,
        resolved: Option<MemberId>,
    },
    MethodCall {
        owner: TypeRef,
        name: String,
        descriptor: String,
        resolved: Vec<MemberId>,
    },
    ConstructorCall {
        owner: TypeRef,
        descriptor: String,
        resolved: Option<MemberId>,
    },
    MethodReference {
        owner: TypeRef,
        name: String,
        descriptor: String,
        resolved: Vec<MemberId>,
    },
    ConstructorReference {
        owner: TypeRef,
        descriptor: String,
        resolved: Option<MemberId>,
    },
    ClassObject {
        referenced: TypeRef,
    },
    InstanceofCheck {
        referenced: TypeRef,
    },
}

impl AccessDetail {
    /// The owner (or referenced) type of the target.
    pub fn target_type(&self) -> &TypeRef {
        match self {
            AccessDetail::FieldAccess { owner, .. }
            | AccessDetail::MethodCall { owner, .. }
            | AccessDetail::ConstructorCall { owner, .. }
            | AccessDetail::MethodReference { owner, .. }
            | AccessDetail::ConstructorReference { owner, .. } => owner,
            AccessDetail::ClassObject { referenced }
            | AccessDetail::InstanceofCheck { referenced } => referenced,
        }
    }
}

/// A structured try/catch region with the dependency edges that occur
/// textually inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct TryCatchBlock {
    pub origin: MemberId,
    pub caught_types: Vec<TypeRef>,
    /// Line of the start of the try block.
    pub line_number: u16,
    pub accesses: Vec<JavaAccess>,
    pub declared_in_lambda: bool,
}
