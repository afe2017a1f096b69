//! Final assembly pass: once the universe is complete, bind every class's
//! hierarchy by lookup, finish deferred generic recipes, resolve
//! annotations with their declared defaults, and materialize dependency
//! edges with resolved targets.
//!
//! Target resolution never guesses: an exact owner match wins; otherwise
//! the signature must be declared on exactly one class along the hierarchy
//! above the referenced owner, or the edge resolves to an empty/absent
//! target.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use girder_classfile::{Annotation, ConstValue, ElementValue, ReturnType};
use girder_graph::{
    AccessDetail, AnnotationValue, FieldAccessKind, JavaAccess, JavaAnnotation, JavaClass,
    JavaClasses, JavaConstructor, JavaField, JavaMethod, JavaType, MemberId, MemberSignature,
    Modifiers, Primitive, TryCatchBlock, TypeRef, CONSTRUCTOR_NAME,
};

use crate::generics::{self, field_type_ref, TypeVarScope};
use crate::raw::{RawAccessKind, RawAccessRecord, RawClassFacts, RawCodeUnit, RawTryCatch};
use crate::record::ImportRecord;
use crate::synthetic::{Rewritten, SyntheticOriginResolver};

pub(crate) fn assemble(record: ImportRecord) -> JavaClasses {
    let mut classes: BTreeMap<String, JavaClass> = BTreeMap::new();

    for (name, facts) in record.classes() {
        classes.insert(name.clone(), build_class(name, facts, &record));
    }

    insert_stubs(&mut classes, record.stubbed_names().cloned());

    let resolver = SyntheticOriginResolver::new(record.synthetic_index(), record.predicates());

    let mut edges: BTreeMap<String, Vec<JavaAccess>> = BTreeMap::new();
    let mut blocks: BTreeMap<String, Vec<TryCatchBlock>> = BTreeMap::new();
    let mut owners: Vec<String> = record.class_names().cloned().collect();
    owners.sort();
    for owner in &owners {
        for raw in record.accesses_for(owner) {
            match resolver.rewrite(raw) {
                Rewritten::Unchanged => {
                    let access = build_access(raw, &classes);
                    edges.entry(raw.origin.owner.clone()).or_default().push(access);
                }
                Rewritten::Replaced(records) => {
                    for rewritten in records {
                        let access = build_access(&rewritten, &classes);
                        edges
                            .entry(rewritten.origin.owner.clone())
                            .or_default()
                            .push(access);
                    }
                }
            }
        }
        for raw_block in record.try_catches_for(owner) {
            for block in build_try_catch_blocks(raw_block, &resolver, &classes) {
                blocks
                    .entry(block.origin.owner.clone())
                    .or_default()
                    .push(block);
            }
        }
    }

    for (owner, mut owner_edges) in edges {
        match classes.get_mut(&owner) {
            Some(class) => class.accesses.append(&mut owner_edges),
            None => tracing::warn!(class = %owner,
                "discarding edges attributed to an unknown class"),
        }
    }
    for (owner, mut owner_blocks) in blocks {
        match classes.get_mut(&owner) {
            Some(class) => class.try_catch_blocks.append(&mut owner_blocks),
            None => tracing::warn!(class = %owner,
                "discarding try/catch blocks attributed to an unknown class"),
        }
    }

    ensure_complete(&mut classes);

    JavaClasses::new(classes)
}

// ---------------------------------------------------------------------------
// Classes and members
// ---------------------------------------------------------------------------

fn build_class(name: &str, facts: &RawClassFacts, record: &ImportRecord) -> JavaClass {
    let class_scope = facts
        .signature
        .as_ref()
        .map(|sig| TypeVarScope::of(&sig.type_parameters))
        .unwrap_or_default();

    let (type_parameters, generic_superclass, generic_interfaces) = match &facts.signature {
        Some(sig) => {
            let params = generics::finish_type_parameters(&sig.type_parameters, &TypeVarScope::new());
            let (superclass, interfaces) = generics::finish_class_hierarchy(sig, &class_scope);
            (params, Some(superclass), interfaces)
        }
        None => (Vec::new(), None, Vec::new()),
    };

    let mut fields = BTreeMap::new();
    for raw in &facts.fields {
        let raw_type = TypeRef::from_descriptor(&raw.descriptor);
        let field_type = match &raw.signature {
            Some(sig) => generics::finish_field_signature(sig, &class_scope),
            None => java_type_from_type_ref(&raw_type),
        };
        fields.insert(
            raw.name.clone(),
            JavaField {
                name: raw.name.clone(),
                descriptor: raw.descriptor.clone(),
                modifiers: Modifiers::new(raw.access_flags),
                field_type,
                raw_type,
                annotations: build_annotations(&raw.annotations, record),
            },
        );
    }

    let mut methods = BTreeMap::new();
    for raw in &facts.methods {
        let (raw_parameter_types, raw_return_type) = descriptor_types(&raw.descriptor);
        let (type_parameters, parameter_types, return_type) = finish_code_unit_types(
            raw.signature.as_ref(),
            &class_scope,
            &raw_parameter_types,
            Some(&raw_return_type),
        );
        methods.insert(
            MemberSignature::new(raw.name.clone(), raw.descriptor.clone()),
            JavaMethod {
                name: raw.name.clone(),
                descriptor: raw.descriptor.clone(),
                modifiers: Modifiers::new(raw.access_flags),
                type_parameters,
                parameter_types,
                raw_parameter_types,
                return_type: return_type.unwrap_or(JavaType::Primitive(Primitive::Void)),
                raw_return_type,
                annotations: build_annotations(&raw.annotations, record),
                annotation_default: raw
                    .annotation_default
                    .as_ref()
                    .map(|value| convert_value(value, record)),
            },
        );
    }

    let mut constructors = BTreeMap::new();
    for raw in &facts.constructors {
        let (raw_parameter_types, _) = descriptor_types(&raw.descriptor);
        let (type_parameters, parameter_types, _) = finish_code_unit_types(
            raw.signature.as_ref(),
            &class_scope,
            &raw_parameter_types,
            None,
        );
        constructors.insert(
            raw.descriptor.clone(),
            JavaConstructor {
                descriptor: raw.descriptor.clone(),
                modifiers: Modifiers::new(raw.access_flags),
                type_parameters,
                parameter_types,
                raw_parameter_types,
                annotations: build_annotations(&raw.annotations, record),
            },
        );
    }

    JavaClass {
        type_ref: TypeRef::object(name),
        modifiers: Modifiers::new(facts.access_flags),
        class_file_version: Some(facts.class_file_version),
        source_file: facts.source_file.clone(),
        superclass: facts.superclass().map(str::to_string),
        interfaces: facts.interfaces.clone(),
        type_parameters,
        generic_superclass,
        generic_interfaces,
        fields,
        methods,
        constructors,
        has_static_initializer: facts.has_static_initializer(),
        annotations: build_annotations(&facts.annotations, record),
        enclosing_class: facts.enclosing_class.clone(),
        enclosing_code_unit: facts
            .enclosing_code_unit
            .as_ref()
            .map(|unit| MemberId::new(unit.owner.clone(), unit.name.clone(), unit.descriptor.clone())),
        accesses: Vec::new(),
        try_catch_blocks: Vec::new(),
        stub: false,
    }
}

/// Generic parameter/return types from a signature when present and
/// consistent with the descriptor, erased descriptor types otherwise.
fn finish_code_unit_types(
    signature: Option<&girder_classfile::MethodSignature>,
    class_scope: &TypeVarScope,
    raw_parameter_types: &[TypeRef],
    raw_return_type: Option<&TypeRef>,
) -> (Vec<girder_graph::JavaTypeVariable>, Vec<JavaType>, Option<JavaType>) {
    let erased_parameters = || {
        raw_parameter_types
            .iter()
            .map(java_type_from_type_ref)
            .collect::<Vec<_>>()
    };
    let erased_return = || raw_return_type.map(java_type_from_type_ref);

    match signature {
        // The compiler omits synthetic parameters (e.g. outer-instance
        // captures) from signatures; a mismatched arity falls back to the
        // descriptor wholesale.
        Some(sig) if sig.parameters.len() == raw_parameter_types.len() => {
            let scope = class_scope.child_with(&sig.type_parameters);
            let type_parameters = generics::finish_type_parameters(&sig.type_parameters, class_scope);
            let parameter_types = sig
                .parameters
                .iter()
                .map(|param| generics::finish_type_signature(param, &scope))
                .collect();
            let return_type = match (&sig.return_type, raw_return_type) {
                (Some(ret), Some(_)) => Some(generics::finish_type_signature(ret, &scope)),
                (None, Some(_)) => Some(JavaType::Primitive(Primitive::Void)),
                _ => None,
            };
            (type_parameters, parameter_types, return_type)
        }
        _ => (Vec::new(), erased_parameters(), erased_return()),
    }
}

fn descriptor_types(descriptor: &str) -> (Vec<TypeRef>, TypeRef) {
    match girder_classfile::parse_method_descriptor(descriptor) {
        Ok(parsed) => {
            let params = parsed.params.iter().map(field_type_ref).collect();
            let ret = match &parsed.return_type {
                ReturnType::Void => TypeRef::primitive(Primitive::Void),
                ReturnType::Type(ty) => field_type_ref(ty),
            };
            (params, ret)
        }
        Err(error) => {
            tracing::warn!(%descriptor, %error, "unparseable method descriptor");
            (Vec::new(), TypeRef::primitive(Primitive::Void))
        }
    }
}

pub(crate) fn java_type_from_type_ref(type_ref: &TypeRef) -> JavaType {
    let element = match type_ref.element() {
        girder_graph::TypeElement::Primitive(p) => JavaType::Primitive(*p),
        girder_graph::TypeElement::Object(name) => JavaType::Class(name.clone()),
    };
    (0..type_ref.dimensions()).fold(element, |ty, _| JavaType::Array(Box::new(ty)))
}

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

fn insert_stubs(classes: &mut BTreeMap<String, JavaClass>, names: impl Iterator<Item = String>) {
    let (arrays, plain): (Vec<String>, Vec<String>) =
        names.partition(|name| name.starts_with('['));

    for name in plain {
        let type_ref = TypeRef::from_binary_name(&name);
        let modifiers = if type_ref.is_primitive() {
            Modifiers::primitive()
        } else {
            Modifiers::default()
        };
        classes.insert(name, JavaClass::new_stub(type_ref, modifiers));
    }

    // Array stubs take their element's visibility, so elements go first.
    for name in arrays {
        let type_ref = TypeRef::from_binary_name(&name);
        let element_modifiers = match type_ref.element_object_name() {
            Some(element) => classes
                .get(element)
                .map(|class| class.modifiers)
                .unwrap_or_default(),
            None => Modifiers::primitive(),
        };
        classes.insert(
            name,
            JavaClass::new_stub(type_ref, Modifiers::array_from_element(element_modifiers)),
        );
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

fn build_annotations(annotations: &[Annotation], record: &ImportRecord) -> Vec<JavaAnnotation> {
    annotations
        .iter()
        .map(|annotation| build_annotation(annotation, record))
        .collect()
}

fn build_annotation(annotation: &Annotation, record: &ImportRecord) -> JavaAnnotation {
    let type_name = TypeRef::from_descriptor(&annotation.type_descriptor).binary_name();
    let mut properties: BTreeMap<String, AnnotationValue> = annotation
        .elements
        .iter()
        .map(|(name, value)| (name.clone(), convert_value(value, record)))
        .collect();

    // Declared defaults of the annotation type fill every property the use
    // site left unspecified. A stubbed annotation type contributes none.
    if let Some(facts) = record.class_facts(&type_name) {
        for method in &facts.methods {
            if let Some(default) = &method.annotation_default {
                properties
                    .entry(method.name.clone())
                    .or_insert_with(|| convert_value(default, record));
            }
        }
    }

    JavaAnnotation {
        type_name,
        properties,
    }
}

fn convert_value(value: &ElementValue, record: &ImportRecord) -> AnnotationValue {
    match value {
        ElementValue::Const(constant) => match constant {
            ConstValue::Byte(v) => AnnotationValue::Byte(*v),
            ConstValue::Char(v) => AnnotationValue::Char(*v),
            ConstValue::Short(v) => AnnotationValue::Short(*v),
            ConstValue::Int(v) => AnnotationValue::Int(*v),
            ConstValue::Long(v) => AnnotationValue::Long(*v),
            ConstValue::Float(v) => AnnotationValue::Float(*v),
            ConstValue::Double(v) => AnnotationValue::Double(*v),
            ConstValue::Boolean(v) => AnnotationValue::Boolean(*v),
            ConstValue::String(v) => AnnotationValue::String(v.clone()),
        },
        ElementValue::Enum { type_descriptor, const_name } => AnnotationValue::EnumConstant {
            type_name: TypeRef::from_descriptor(type_descriptor).binary_name(),
            constant: const_name.clone(),
        },
        ElementValue::Class(descriptor) => {
            AnnotationValue::Class(TypeRef::from_descriptor(descriptor))
        }
        ElementValue::Annotation(nested) => {
            AnnotationValue::Annotation(Box::new(build_annotation(nested, record)))
        }
        ElementValue::Array(values) => AnnotationValue::Array(
            values.iter().map(|value| convert_value(value, record)).collect(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Dependency edges
// ---------------------------------------------------------------------------

fn build_access(raw: &RawAccessRecord, classes: &BTreeMap<String, JavaClass>) -> JavaAccess {
    let origin = MemberId::new(
        raw.origin.owner.clone(),
        raw.origin.name.clone(),
        raw.origin.descriptor.clone(),
    );
    let owner = raw.target.owner.clone();
    let detail = match raw.kind {
        RawAccessKind::FieldRead | RawAccessKind::FieldWrite => AccessDetail::FieldAccess {
            kind: if raw.kind == RawAccessKind::FieldWrite {
                FieldAccessKind::Write
            } else {
                FieldAccessKind::Read
            },
            resolved: resolve_field(classes, &owner, &raw.target.name),
            owner,
            name: raw.target.name.clone(),
            descriptor: raw.target.descriptor.clone(),
        },
        RawAccessKind::MethodCall => AccessDetail::MethodCall {
            resolved: resolve_method(classes, &owner, &raw.target.name, &raw.target.descriptor),
            owner,
            name: raw.target.name.clone(),
            descriptor: raw.target.descriptor.clone(),
        },
        RawAccessKind::MethodReference => AccessDetail::MethodReference {
            resolved: resolve_method(classes, &owner, &raw.target.name, &raw.target.descriptor),
            owner,
            name: raw.target.name.clone(),
            descriptor: raw.target.descriptor.clone(),
        },
        RawAccessKind::ConstructorCall => AccessDetail::ConstructorCall {
            resolved: resolve_constructor(classes, &owner, &raw.target.descriptor),
            owner,
            descriptor: raw.target.descriptor.clone(),
        },
        RawAccessKind::ConstructorReference => AccessDetail::ConstructorReference {
            resolved: resolve_constructor(classes, &owner, &raw.target.descriptor),
            owner,
            descriptor: raw.target.descriptor.clone(),
        },
        RawAccessKind::ClassObject => AccessDetail::ClassObject { referenced: owner },
        RawAccessKind::InstanceofCheck => AccessDetail::InstanceofCheck { referenced: owner },
    };
    JavaAccess {
        origin,
        detail,
        line_number: raw.line_number,
        declared_in_lambda: raw.declared_in_lambda,
    }
}

fn build_try_catch_blocks(
    raw: &RawTryCatch,
    resolver: &SyntheticOriginResolver<'_>,
    classes: &BTreeMap<String, JavaClass>,
) -> Vec<TryCatchBlock> {
    let accesses: Vec<JavaAccess> = raw
        .records
        .iter()
        .flat_map(|record| match resolver.rewrite(record) {
            Rewritten::Unchanged => vec![build_access(record, classes)],
            Rewritten::Replaced(records) => records
                .iter()
                .map(|rewritten| build_access(rewritten, classes))
                .collect(),
        })
        .collect();

    let make_block = |origin: &RawCodeUnit, through_lambda: bool| TryCatchBlock {
        origin: MemberId::new(origin.owner.clone(), origin.name.clone(), origin.descriptor.clone()),
        caught_types: raw.caught_types.clone(),
        line_number: raw.line_number,
        accesses: accesses.clone(),
        declared_in_lambda: through_lambda,
    };

    match resolver.origins_for(&raw.origin) {
        None => vec![make_block(&raw.origin, false)],
        Some(chains) if chains.is_empty() => {
            tracing::debug!(
                origin = %raw.origin.owner,
                unit = %raw.origin.name,
                "no invocation of synthetic unit found, dropping try/catch block"
            );
            Vec::new()
        }
        Some(chains) => chains
            .iter()
            .map(|(origin, through_lambda)| make_block(origin, *through_lambda))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Target resolution
// ---------------------------------------------------------------------------

fn owner_class_name(owner: &TypeRef) -> Option<&str> {
    if owner.is_array() {
        return None;
    }
    owner.element_object_name()
}

fn resolve_field(
    classes: &BTreeMap<String, JavaClass>,
    owner: &TypeRef,
    name: &str,
) -> Option<MemberId> {
    let owner_name = owner_class_name(owner)?;
    let declaring = unique_declaring_class(classes, owner_name, |class| {
        class.fields.contains_key(name)
    })?;
    let field = classes.get(&declaring)?.field(name)?;
    Some(MemberId::new(declaring, name, field.descriptor.clone()))
}

fn resolve_method(
    classes: &BTreeMap<String, JavaClass>,
    owner: &TypeRef,
    name: &str,
    descriptor: &str,
) -> Vec<MemberId> {
    let Some(owner_name) = owner_class_name(owner) else {
        return Vec::new();
    };
    let signature = MemberSignature::new(name, descriptor);
    match unique_declaring_class(classes, owner_name, |class| {
        class.methods.contains_key(&signature)
    }) {
        Some(declaring) => vec![MemberId::new(declaring, name, descriptor)],
        None => Vec::new(),
    }
}

/// Constructors are not inherited: exact owner or nothing.
fn resolve_constructor(
    classes: &BTreeMap<String, JavaClass>,
    owner: &TypeRef,
    descriptor: &str,
) -> Option<MemberId> {
    let owner_name = owner_class_name(owner)?;
    classes
        .get(owner_name)?
        .constructor(descriptor)
        .map(|_| MemberId::new(owner_name, CONSTRUCTOR_NAME, descriptor))
}

/// The single class declaring a matching member: the referenced owner
/// itself, or exactly one declaring class found walking the hierarchy
/// class. Zero or several candidates along diamond paths resolve to
/// `None` rather than a guess.
fn unique_declaring_class(
    classes: &BTreeMap<String, JavaClass>,
    owner_name: &str,
    declares: impl Fn(&JavaClass) -> bool,
) -> Option<String> {
    let owner = classes.get(owner_name)?;
    if declares(owner) {
        return Some(owner_name.to_string());
    }

    let mut declaring: BTreeSet<String> = BTreeSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.extend(owner.superclass.iter().cloned());
    queue.extend(owner.interfaces.iter().cloned());

    while let Some(name) = queue.pop_front() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let Some(class) = classes.get(&name) else {
            continue;
        };
        if declares(class) {
            declaring.insert(name);
            continue;
        }
        queue.extend(class.superclass.iter().cloned());
        queue.extend(class.interfaces.iter().cloned());
    }

    if declaring.len() == 1 {
        declaring.into_iter().next()
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Completeness sweep
// ---------------------------------------------------------------------------

/// Belt over the resolution engine: any type name still referenced by the
/// assembled graph but missing from it becomes a stub, so downstream
/// consumers never see a dangling name.
fn ensure_complete(classes: &mut BTreeMap<String, JavaClass>) {
    let mut referenced: BTreeSet<String> = BTreeSet::new();
    for class in classes.values() {
        referenced.extend(class.superclass.iter().cloned());
        referenced.extend(class.interfaces.iter().cloned());
        referenced.extend(class.enclosing_class.iter().cloned());
        for field in class.fields.values() {
            referenced.insert(field.raw_type.binary_name());
            if let Some(element) = field.raw_type.element_object_name() {
                referenced.insert(element.to_string());
            }
        }
        for method in class.methods.values() {
            for ty in method.raw_parameter_types.iter().chain([&method.raw_return_type]) {
                referenced.insert(ty.binary_name());
                if let Some(element) = ty.element_object_name() {
                    referenced.insert(element.to_string());
                }
            }
        }
        for constructor in class.constructors.values() {
            for ty in &constructor.raw_parameter_types {
                referenced.insert(ty.binary_name());
                if let Some(element) = ty.element_object_name() {
                    referenced.insert(element.to_string());
                }
            }
        }
        for annotation in &class.annotations {
            referenced.insert(annotation.type_name.clone());
        }
        for access in &class.accesses {
            let target = access.detail.target_type();
            referenced.insert(target.binary_name());
            if let Some(element) = target.element_object_name() {
                referenced.insert(element.to_string());
            }
        }
        for block in &class.try_catch_blocks {
            for caught in &block.caught_types {
                referenced.insert(caught.binary_name());
            }
        }
    }

    let missing: Vec<String> = referenced
        .into_iter()
        .filter(|name| !classes.contains_key(name))
        .collect();
    if !missing.is_empty() {
        tracing::debug!(count = missing.len(), "stubbing names missed by resolution");
        insert_stubs(classes, missing.into_iter());
    }
}
