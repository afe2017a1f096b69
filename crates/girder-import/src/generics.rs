//! Deferred construction of generic types.
//!
//! Signature syntax trees are held as recipes until the resolution engine
//! has produced a complete universe; only then are they finished into
//! [`JavaType`] values. Because the graph links classes by name, finishing
//! needs only the type parameters in scope. A type variable that is not
//! in scope falls back to an unbounded synthetic variable instead of
//! failing.

use std::collections::HashSet;

use girder_classfile::{
    ClassSignature, ClassTypeSignature, FieldTypeSignature, MethodSignature, TypeArgument,
    TypeParameter, TypeSignature,
};
use girder_graph::{internal_to_binary, JavaType, JavaTypeVariable, Primitive, TypeRef, WildcardBound};

/// The type-parameter names visible at a use site: the owning class's
/// parameters, plus the code unit's own parameters for members.
#[derive(Debug, Clone, Default)]
pub(crate) struct TypeVarScope {
    names: HashSet<String>,
}

impl TypeVarScope {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn of(params: &[TypeParameter]) -> Self {
        let mut scope = Self::new();
        scope.extend(params);
        scope
    }

    pub(crate) fn extend(&mut self, params: &[TypeParameter]) {
        for param in params {
            self.names.insert(param.name.clone());
        }
    }

    pub(crate) fn child_with(&self, params: &[TypeParameter]) -> Self {
        let mut scope = self.clone();
        scope.extend(params);
        scope
    }

    fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

pub(crate) fn base_primitive(base: girder_classfile::BaseType) -> Primitive {
    use girder_classfile::BaseType;
    match base {
        BaseType::Byte => Primitive::Byte,
        BaseType::Char => Primitive::Char,
        BaseType::Double => Primitive::Double,
        BaseType::Float => Primitive::Float,
        BaseType::Int => Primitive::Int,
        BaseType::Long => Primitive::Long,
        BaseType::Short => Primitive::Short,
        BaseType::Boolean => Primitive::Boolean,
    }
}

/// Erased [`TypeRef`] of a parsed descriptor type.
pub(crate) fn field_type_ref(field_type: &girder_classfile::FieldType) -> TypeRef {
    match field_type {
        girder_classfile::FieldType::Base(base) => TypeRef::primitive(base_primitive(*base)),
        girder_classfile::FieldType::Object(internal) => {
            TypeRef::object(internal_to_binary(internal))
        }
        girder_classfile::FieldType::Array(component) => {
            TypeRef::array_of(field_type_ref(component), 1)
        }
    }
}

pub(crate) fn finish_type_signature(sig: &TypeSignature, scope: &TypeVarScope) -> JavaType {
    match sig {
        TypeSignature::Base(base) => JavaType::Primitive(base_primitive(*base)),
        TypeSignature::Field(field) => finish_field_signature(field, scope),
    }
}

pub(crate) fn finish_field_signature(sig: &FieldTypeSignature, scope: &TypeVarScope) -> JavaType {
    match sig {
        FieldTypeSignature::Class(class) => finish_class_type(class, scope),
        FieldTypeSignature::Array(component) => {
            JavaType::Array(Box::new(finish_type_signature(component, scope)))
        }
        FieldTypeSignature::TypeVariable(name) => {
            if !scope.contains(name) {
                // Declared on a class that was never decoded; keep the name
                // as an unbounded synthetic variable.
                tracing::trace!(var = %name, "type variable not in scope, keeping unbounded");
            }
            JavaType::TypeVariable(name.clone())
        }
    }
}

fn finish_class_type(class: &ClassTypeSignature, scope: &TypeVarScope) -> JavaType {
    let raw = internal_to_binary(&class.erased_internal_name());
    let mut arguments = Vec::new();
    for arg in &class.type_arguments {
        arguments.push(finish_type_argument(arg, scope));
    }
    for (_, suffix_args) in &class.suffixes {
        for arg in suffix_args {
            arguments.push(finish_type_argument(arg, scope));
        }
    }
    if arguments.is_empty() {
        JavaType::Class(raw)
    } else {
        JavaType::Parameterized { raw, arguments }
    }
}

fn finish_type_argument(arg: &TypeArgument, scope: &TypeVarScope) -> JavaType {
    match arg {
        TypeArgument::Unbounded => JavaType::Wildcard(WildcardBound::Unbounded),
        TypeArgument::Extends(bound) => JavaType::Wildcard(WildcardBound::Extends(Box::new(
            finish_field_signature(bound, scope),
        ))),
        TypeArgument::Super(bound) => JavaType::Wildcard(WildcardBound::Super(Box::new(
            finish_field_signature(bound, scope),
        ))),
        TypeArgument::Exact(ty) => finish_field_signature(ty, scope),
    }
}

/// Finish type-parameter declarations. The parameters themselves are in
/// scope for their own bounds (`<T extends Comparable<T>>`).
pub(crate) fn finish_type_parameters(
    params: &[TypeParameter],
    outer: &TypeVarScope,
) -> Vec<JavaTypeVariable> {
    let scope = outer.child_with(params);
    params
        .iter()
        .map(|param| {
            let mut upper_bounds = Vec::new();
            if let Some(bound) = &param.class_bound {
                upper_bounds.push(finish_field_signature(bound, &scope));
            }
            for bound in &param.interface_bounds {
                upper_bounds.push(finish_field_signature(bound, &scope));
            }
            JavaTypeVariable {
                name: param.name.clone(),
                upper_bounds,
            }
        })
        .collect()
}

/// Generic superclass and interfaces from a class signature.
pub(crate) fn finish_class_hierarchy(
    sig: &ClassSignature,
    scope: &TypeVarScope,
) -> (JavaType, Vec<JavaType>) {
    let super_class = finish_class_type(&sig.super_class, scope);
    let interfaces = sig
        .interfaces
        .iter()
        .map(|iface| finish_class_type(iface, scope))
        .collect();
    (super_class, interfaces)
}

// ---------------------------------------------------------------------------
// Class-name collection for the resolution engine
// ---------------------------------------------------------------------------

pub(crate) fn class_names_in_field_signature(sig: &FieldTypeSignature, out: &mut Vec<String>) {
    match sig {
        FieldTypeSignature::Class(class) => class_names_in_class_type(class, out),
        FieldTypeSignature::Array(component) => class_names_in_type_signature(component, out),
        FieldTypeSignature::TypeVariable(_) => {}
    }
}

pub(crate) fn class_names_in_type_signature(sig: &TypeSignature, out: &mut Vec<String>) {
    if let TypeSignature::Field(field) = sig {
        class_names_in_field_signature(field, out);
    }
}

fn class_names_in_class_type(class: &ClassTypeSignature, out: &mut Vec<String>) {
    out.push(internal_to_binary(&class.erased_internal_name()));
    for arg in class
        .type_arguments
        .iter()
        .chain(class.suffixes.iter().flat_map(|(_, args)| args))
    {
        match arg {
            TypeArgument::Unbounded => {}
            TypeArgument::Extends(bound)
            | TypeArgument::Super(bound)
            | TypeArgument::Exact(bound) => class_names_in_field_signature(bound, out),
        }
    }
}

pub(crate) fn class_names_in_type_parameters(params: &[TypeParameter], out: &mut Vec<String>) {
    for param in params {
        if let Some(bound) = &param.class_bound {
            class_names_in_field_signature(bound, out);
        }
        for bound in &param.interface_bounds {
            class_names_in_field_signature(bound, out);
        }
    }
}

pub(crate) fn class_names_in_method_signature(sig: &MethodSignature, out: &mut Vec<String>) {
    class_names_in_type_parameters(&sig.type_parameters, out);
    for param in &sig.parameters {
        class_names_in_type_signature(param, out);
    }
    if let Some(ret) = &sig.return_type {
        class_names_in_type_signature(ret, out);
    }
    for thrown in &sig.throws {
        class_names_in_field_signature(thrown, out);
    }
}

#[cfg(test)]
mod tests {
    use girder_classfile::{parse_class_signature, parse_field_signature, parse_method_signature};

    use super::*;

    #[test]
    fn finishes_parameterized_types() {
        let sig = parse_field_signature("Ljava/util/List<+Ljava/lang/Number;>;").unwrap();
        let ty = finish_field_signature(&sig, &TypeVarScope::new());
        assert_eq!(
            ty,
            JavaType::Parameterized {
                raw: "java.util.List".to_string(),
                arguments: vec![JavaType::Wildcard(WildcardBound::Extends(Box::new(
                    JavaType::Class("java.lang.Number".to_string())
                )))],
            }
        );
    }

    #[test]
    fn unscoped_type_variable_stays_unbounded() {
        let sig = parse_field_signature("TT;").unwrap();
        let ty = finish_field_signature(&sig, &TypeVarScope::new());
        assert_eq!(ty, JavaType::TypeVariable("T".to_string()));
    }

    #[test]
    fn self_referential_bounds_resolve_in_their_own_scope() {
        let sig = parse_class_signature(
            "<T:Ljava/lang/Object;:Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;",
        )
        .unwrap();
        let params = finish_type_parameters(&sig.type_parameters, &TypeVarScope::new());
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "T");
        assert_eq!(
            params[0].upper_bounds,
            vec![
                JavaType::Class("java.lang.Object".to_string()),
                JavaType::Parameterized {
                    raw: "java.lang.Comparable".to_string(),
                    arguments: vec![JavaType::TypeVariable("T".to_string())],
                },
            ]
        );
    }

    #[test]
    fn collects_class_names_from_method_signature() {
        let sig = parse_method_signature(
            "(Ljava/util/Map<Ljava/lang/String;Ljava/lang/Integer;>;)Ljava/util/List<TT;>;",
        )
        .unwrap();
        let mut names = Vec::new();
        class_names_in_method_signature(&sig, &mut names);
        assert!(names.contains(&"java.util.Map".to_string()));
        assert!(names.contains(&"java.lang.String".to_string()));
        assert!(names.contains(&"java.lang.Integer".to_string()));
        assert!(names.contains(&"java.util.List".to_string()));
    }
}
