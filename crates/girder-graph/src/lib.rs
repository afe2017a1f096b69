//! The resolved class graph: an immutable, name-keyed arena of classes with
//! their hierarchy, members, annotations, and dependency edges.
//!
//! Cyclic relationships (class ↔ superclass, caller ↔ callee) are expressed
//! as binary-name links into the arena rather than object references, so
//! the graph is plain owned data with no back-patching.

#![forbid(unsafe_code)]

mod access;
mod annotation;
mod class;
mod members;
mod name;
mod types;

use std::collections::BTreeMap;

pub use crate::access::{AccessDetail, FieldAccessKind, JavaAccess, TryCatchBlock};
pub use crate::annotation::{AnnotationValue, JavaAnnotation};
pub use crate::class::{JavaClass, Modifiers};
pub use crate::members::{
    JavaConstructor, JavaField, JavaMethod, MemberId, MemberSignature, CONSTRUCTOR_NAME,
    STATIC_INITIALIZER_NAME,
};
pub use crate::name::{binary_to_internal, internal_to_binary, Primitive, TypeElement, TypeRef};
pub use crate::types::{JavaType, JavaTypeVariable, WildcardBound};

/// The finished product of one import session. Built once, immutable
/// afterwards, safe to share across threads by reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JavaClasses {
    classes: BTreeMap<String, JavaClass>,
}

impl JavaClasses {
    pub fn new(classes: BTreeMap<String, JavaClass>) -> Self {
        Self { classes }
    }

    pub fn get(&self, binary_name: &str) -> Option<&JavaClass> {
        self.classes.get(binary_name)
    }

    pub fn contains(&self, binary_name: &str) -> bool {
        self.classes.contains_key(binary_name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Deterministic (name-ordered) iteration.
    pub fn iter(&self) -> impl Iterator<Item = &JavaClass> {
        self.classes.values()
    }

    /// The superclass chain starting at (and excluding) the named class,
    /// following links until a class without a superclass or a stub without
    /// hierarchy information is reached.
    pub fn superclass_chain<'a>(&'a self, binary_name: &str) -> SuperclassChain<'a> {
        SuperclassChain {
            classes: self,
            next: self
                .get(binary_name)
                .and_then(|class| class.superclass.clone()),
        }
    }

    /// Look up the declaring member of an access target.
    pub fn member_declaring_class(&self, member: &MemberId) -> Option<&JavaClass> {
        self.get(&member.owner)
    }
}

pub struct SuperclassChain<'a> {
    classes: &'a JavaClasses,
    next: Option<String>,
}

impl<'a> Iterator for SuperclassChain<'a> {
    type Item = &'a JavaClass;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.next.take()?;
        let class = self.classes.get(&name)?;
        self.next = class.superclass.clone();
        Some(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(name: &str, superclass: Option<&str>) -> JavaClass {
        let mut class = JavaClass::new_stub(TypeRef::object(name), Modifiers::new(0x0001));
        class.superclass = superclass.map(str::to_string);
        class
    }

    #[test]
    fn superclass_chain_walks_links() {
        let mut map = BTreeMap::new();
        map.insert("a.A".to_string(), stub("a.A", Some("a.B")));
        map.insert("a.B".to_string(), stub("a.B", Some("java.lang.Object")));
        map.insert("java.lang.Object".to_string(), stub("java.lang.Object", None));
        let classes = JavaClasses::new(map);

        let chain: Vec<String> = classes.superclass_chain("a.A").map(|c| c.name()).collect();
        assert_eq!(chain, vec!["a.B", "java.lang.Object"]);
    }

    #[test]
    fn iteration_is_name_ordered() {
        let mut map = BTreeMap::new();
        map.insert("b.B".to_string(), stub("b.B", None));
        map.insert("a.A".to_string(), stub("a.A", None));
        let classes = JavaClasses::new(map);
        let names: Vec<String> = classes.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a.A", "b.B"]);
    }
}
