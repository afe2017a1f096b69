use crate::name::{Primitive, TypeRef};

/// A resolved (possibly generic) Java type. Class references are by binary
/// name; navigating to the referenced class goes through the
/// [`crate::JavaClasses`] arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaType {
    Primitive(Primitive),
    /// Non-generic class reference, binary name.
    Class(String),
    Array(Box<JavaType>),
    Parameterized {
        /// Binary name of the raw type.
        raw: String,
        arguments: Vec<JavaType>,
    },
    TypeVariable(String),
    Wildcard(WildcardBound),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<JavaType>),
    Super(Box<JavaType>),
}

impl JavaType {
    /// Erase to the runtime type key. Type variables and wildcards erase to
    /// `java.lang.Object`; bounds are not tracked on use sites.
    pub fn erasure(&self) -> TypeRef {
        match self {
            JavaType::Primitive(p) => TypeRef::primitive(*p),
            JavaType::Class(name) | JavaType::Parameterized { raw: name, .. } => {
                TypeRef::object(name.clone())
            }
            JavaType::Array(component) => TypeRef::array_of(component.erasure(), 1),
            JavaType::TypeVariable(_) | JavaType::Wildcard(_) => {
                TypeRef::object("java.lang.Object")
            }
        }
    }

    /// Binary names of every class mentioned anywhere in this type.
    pub fn referenced_class_names(&self, out: &mut Vec<String>) {
        match self {
            JavaType::Primitive(_) | JavaType::TypeVariable(_) => {}
            JavaType::Class(name) => out.push(name.clone()),
            JavaType::Array(component) => component.referenced_class_names(out),
            JavaType::Parameterized { raw, arguments } => {
                out.push(raw.clone());
                for arg in arguments {
                    arg.referenced_class_names(out);
                }
            }
            JavaType::Wildcard(bound) => match bound {
                WildcardBound::Unbounded => {}
                WildcardBound::Extends(ty) | WildcardBound::Super(ty) => {
                    ty.referenced_class_names(out)
                }
            },
        }
    }
}

/// A declared type parameter (`<T extends Comparable<T>>`) on a class or
/// code unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaTypeVariable {
    pub name: String,
    pub upper_bounds: Vec<JavaType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erasure_of_generics() {
        let ty = JavaType::Parameterized {
            raw: "java.util.List".to_string(),
            arguments: vec![JavaType::TypeVariable("T".to_string())],
        };
        assert_eq!(ty.erasure(), TypeRef::object("java.util.List"));

        let arr = JavaType::Array(Box::new(JavaType::Primitive(Primitive::Int)));
        assert_eq!(arr.erasure().binary_name(), "[I");
    }

    #[test]
    fn referenced_names_walk_nested_arguments() {
        let ty = JavaType::Parameterized {
            raw: "java.util.Map".to_string(),
            arguments: vec![
                JavaType::Class("java.lang.String".to_string()),
                JavaType::Wildcard(WildcardBound::Extends(Box::new(JavaType::Class(
                    "java.lang.Number".to_string(),
                )))),
            ],
        };
        let mut names = Vec::new();
        ty.referenced_class_names(&mut names);
        assert_eq!(
            names,
            vec!["java.util.Map", "java.lang.String", "java.lang.Number"]
        );
    }
}
