use crate::annotation::{AnnotationValue, JavaAnnotation};
use crate::class::Modifiers;
use crate::name::TypeRef;
use crate::types::{JavaType, JavaTypeVariable};

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// Identity of a member within the graph: declaring class binary name plus
/// name and raw JVM descriptor. Used both as the origin of a dependency
/// edge (a code unit) and as a resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberId {
    pub fn new(
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

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == STATIC_INITIALIZER_NAME
    }

    pub fn signature(&self) -> MemberSignature {
        MemberSignature {
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

/// Name + raw descriptor, the key for member lookup within one class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberSignature {
    pub name: String,
    pub descriptor: String,
}

impl MemberSignature {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JavaField {
    pub name: String,
    pub descriptor: String,
    pub modifiers: Modifiers,
    /// Generic type when a signature was present, otherwise the erased
    /// descriptor type.
    pub field_type: JavaType,
    pub raw_type: TypeRef,
    pub annotations: Vec<JavaAnnotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JavaMethod {
    pub name: String,
    pub descriptor: String,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<JavaTypeVariable>,
    pub parameter_types: Vec<JavaType>,
    pub raw_parameter_types: Vec<TypeRef>,
    pub return_type: JavaType,
    pub raw_return_type: TypeRef,
    pub annotations: Vec<JavaAnnotation>,
    /// Declared default value; only on annotation-type methods.
    pub annotation_default: Option<AnnotationValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JavaConstructor {
    pub descriptor: String,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<JavaTypeVariable>,
    pub parameter_types: Vec<JavaType>,
    pub raw_parameter_types: Vec<TypeRef>,
    pub annotations: Vec<JavaAnnotation>,
}
