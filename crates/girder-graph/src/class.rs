use std::collections::BTreeMap;

use crate::access::{JavaAccess, TryCatchBlock};
use crate::annotation::JavaAnnotation;
use crate::members::{JavaConstructor, JavaField, JavaMethod, MemberId, MemberSignature};
use crate::name::TypeRef;
use crate::types::{JavaType, JavaTypeVariable};

mod flags {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const VOLATILE: u16 = 0x0040;
    pub const BRIDGE: u16 = 0x0040;
    pub const TRANSIENT: u16 = 0x0080;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
}

/// Access-flag word of a class or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    pub fn new(flags: u16) -> Self {
        Self(flags)
    }

    /// public + abstract + final: the modifiers of every primitive type.
    pub fn primitive() -> Self {
        Self(flags::PUBLIC | flags::ABSTRACT | flags::FINAL)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    fn has(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    pub fn is_public(self) -> bool {
        self.has(flags::PUBLIC)
    }

    pub fn is_private(self) -> bool {
        self.has(flags::PRIVATE)
    }

    pub fn is_protected(self) -> bool {
        self.has(flags::PROTECTED)
    }

    pub fn is_static(self) -> bool {
        self.has(flags::STATIC)
    }

    pub fn is_final(self) -> bool {
        self.has(flags::FINAL)
    }

    pub fn is_abstract(self) -> bool {
        self.has(flags::ABSTRACT)
    }

    pub fn is_interface(self) -> bool {
        self.has(flags::INTERFACE)
    }

    pub fn is_annotation(self) -> bool {
        self.has(flags::ANNOTATION)
    }

    pub fn is_enum(self) -> bool {
        self.has(flags::ENUM)
    }

    pub fn is_synthetic(self) -> bool {
        self.has(flags::SYNTHETIC)
    }

    pub fn is_bridge(self) -> bool {
        self.has(flags::BRIDGE)
    }

    pub fn is_volatile(self) -> bool {
        self.has(flags::VOLATILE)
    }

    pub fn is_transient(self) -> bool {
        self.has(flags::TRANSIENT)
    }

    pub fn is_native(self) -> bool {
        self.has(flags::NATIVE)
    }

    /// Combine the abstract+final array markers with another type's
    /// visibility bits; array classes take their element's visibility.
    pub fn array_from_element(element: Modifiers) -> Self {
        let visibility =
            element.0 & (flags::PUBLIC | flags::PRIVATE | flags::PROTECTED);
        Self(visibility | flags::ABSTRACT | flags::FINAL)
    }
}

/// One node of the resolved class graph.
///
/// Hierarchy links and resolved targets reference other nodes by binary
/// name; every referenced name is guaranteed to be present in the owning
/// [`crate::JavaClasses`] arena, as a decoded class or a stub.
#[derive(Debug, Clone, PartialEq)]
pub struct JavaClass {
    pub type_ref: TypeRef,
    pub modifiers: Modifiers,
    pub class_file_version: Option<(u16, u16)>,
    pub source_file: Option<String>,
    /// Binary name of the superclass; `None` for `java.lang.Object`,
    /// interfaces, primitives and stubs without hierarchy information.
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub type_parameters: Vec<JavaTypeVariable>,
    pub generic_superclass: Option<JavaType>,
    pub generic_interfaces: Vec<JavaType>,
    pub fields: BTreeMap<String, JavaField>,
    pub methods: BTreeMap<MemberSignature, JavaMethod>,
    /// Keyed by raw descriptor.
    pub constructors: BTreeMap<String, JavaConstructor>,
    pub has_static_initializer: bool,
    pub annotations: Vec<JavaAnnotation>,
    pub enclosing_class: Option<String>,
    pub enclosing_code_unit: Option<MemberId>,
    /// Dependency edges originating in this class's code units.
    pub accesses: Vec<JavaAccess>,
    pub try_catch_blocks: Vec<TryCatchBlock>,
    /// True when no class bytes could be located and this node was
    /// synthesized from its name alone.
    pub stub: bool,
}

impl JavaClass {
    /// A placeholder for a type whose bytes could not be located: no
    /// members, no dependencies, modifiers inferred from the descriptor
    /// only.
    pub fn new_stub(type_ref: TypeRef, modifiers: Modifiers) -> Self {
        Self {
            type_ref,
            modifiers,
            class_file_version: None,
            source_file: None,
            superclass: None,
            interfaces: Vec::new(),
            type_parameters: Vec::new(),
            generic_superclass: None,
            generic_interfaces: Vec::new(),
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
            constructors: BTreeMap::new(),
            has_static_initializer: false,
            annotations: Vec::new(),
            enclosing_class: None,
            enclosing_code_unit: None,
            accesses: Vec::new(),
            try_catch_blocks: Vec::new(),
            stub: true,
        }
    }

    pub fn name(&self) -> String {
        self.type_ref.binary_name()
    }

    pub fn simple_name(&self) -> String {
        let name = self.name();
        name.rsplit_once('.')
            .map(|(_, simple)| simple.to_string())
            .unwrap_or(name)
    }

    pub fn package_name(&self) -> Option<String> {
        let name = self.name();
        name.rsplit_once('.').map(|(pkg, _)| pkg.to_string())
    }

    pub fn field(&self, name: &str) -> Option<&JavaField> {
        self.fields.get(name)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&JavaMethod> {
        self.methods.get(&MemberSignature::new(name, descriptor))
    }

    pub fn constructor(&self, descriptor: &str) -> Option<&JavaConstructor> {
        self.constructors.get(descriptor)
    }
}
