//! Fixed-point resolution of the type universe.
//!
//! Every type name referenced anywhere in the recorded facts must end up
//! in the final graph, either decoded or stubbed. Names are queued by
//! reference category; hierarchy and annotation types are chased through
//! unbounded passes (override resolution needs a complete hierarchy),
//! while member types and access-target owners get exactly one additional
//! pass, enough for direct types without pulling in the transitive
//! closure of third-party dependencies. Names still queued when their
//! category's budget is exhausted are stubbed without attempting a decode.

use std::collections::{HashSet, VecDeque};

use girder_classfile::ElementValue;
use girder_classpath::ClassLocator;
use girder_graph::{Primitive, TypeRef};

use crate::decoder::import_class_bytes;
use crate::generics::{self, field_type_ref};
use crate::record::ImportRecord;

pub(crate) const SUPERTYPE_PASSES: Option<u32> = None;
pub(crate) const ANNOTATION_TYPE_PASSES: Option<u32> = None;
pub(crate) const MEMBER_TYPE_PASSES: Option<u32> = Some(1);
pub(crate) const ACCESS_OWNER_PASSES: Option<u32> = Some(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Hierarchy = 0,
    Annotation = 1,
    MemberType = 2,
    AccessTarget = 3,
}

const CATEGORIES: [Category; 4] = [
    Category::Hierarchy,
    Category::Annotation,
    Category::MemberType,
    Category::AccessTarget,
];

pub(crate) fn resolve_universe(record: &mut ImportRecord, locator: &dyn ClassLocator) {
    let mut engine = ResolutionEngine::new();

    let initial: Vec<String> = record.class_names().cloned().collect();
    for name in &initial {
        engine.seen.insert(name.clone());
    }
    for name in &initial {
        engine.enqueue_references_of(record, name);
    }

    engine.run(record, locator);
}

struct ResolutionEngine {
    queues: [VecDeque<String>; 4],
    budgets: [Option<u32>; 4],
    seen: HashSet<String>,
}

impl ResolutionEngine {
    fn new() -> Self {
        Self {
            queues: Default::default(),
            budgets: [
                SUPERTYPE_PASSES,
                ANNOTATION_TYPE_PASSES,
                MEMBER_TYPE_PASSES,
                ACCESS_OWNER_PASSES,
            ],
            seen: HashSet::new(),
        }
    }

    fn run(&mut self, record: &mut ImportRecord, locator: &dyn ClassLocator) {
        loop {
            let mut progressed = false;
            for category in CATEGORIES {
                let index = category as usize;
                if self.queues[index].is_empty() {
                    continue;
                }
                match &mut self.budgets[index] {
                    Some(0) => continue,
                    Some(budget) => *budget -= 1,
                    None => {}
                }
                progressed = true;
                let batch: Vec<String> = self.queues[index].drain(..).collect();
                for name in batch {
                    self.ensure_present(record, locator, name);
                }
            }
            if !progressed {
                break;
            }
        }

        // Budget-exhausted leftovers become stubs without a decode attempt.
        for queue in &mut self.queues {
            for name in queue.drain(..) {
                record.mark_stubbed(name);
            }
        }
    }

    fn ensure_present(&mut self, record: &mut ImportRecord, locator: &dyn ClassLocator, name: String) {
        if record.contains_class(&name) || record.is_stubbed(&name) {
            return;
        }
        // Primitives and array types have no bytes to locate.
        if name.starts_with('[') || Primitive::from_keyword(&name).is_some() {
            record.mark_stubbed(name);
            return;
        }

        let Some(location) = locator.locate(&name) else {
            record.mark_stubbed(name);
            return;
        };

        let bytes = match location.open() {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::debug!(uri = %location.uri(), %error,
                    "failed to read located class, falling back to stub");
                record.mark_stubbed(name);
                return;
            }
        };

        match import_class_bytes(record, &bytes) {
            Ok(Some(decoded)) => {
                if decoded != name {
                    tracing::warn!(requested = %name, found = %decoded, uri = %location.uri(),
                        "located class file declares a different name");
                    record.mark_stubbed(name);
                }
                self.seen.insert(decoded.clone());
                self.enqueue_references_of(record, &decoded);
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(uri = %location.uri(), %error,
                    "skipping malformed class file found during resolution");
                record.mark_stubbed(name);
            }
        }
    }

    fn enqueue(&mut self, category: Category, name: String) {
        if self.seen.insert(name.clone()) {
            self.queues[category as usize].push_back(name);
        }
    }

    fn enqueue_type_ref(&mut self, category: Category, type_ref: &TypeRef) {
        if type_ref.is_array() {
            if let Some(element) = type_ref.element_object_name() {
                self.enqueue(category, element.to_string());
            }
            self.enqueue(category, type_ref.binary_name());
        } else {
            self.enqueue(category, type_ref.binary_name());
        }
    }

    fn enqueue_descriptor(&mut self, category: Category, descriptor: &str) {
        self.enqueue_type_ref(category, &TypeRef::from_descriptor(descriptor));
    }

    /// Queue every type name a newly decoded class refers to.
    fn enqueue_references_of(&mut self, record: &ImportRecord, name: &str) {
        let mut hierarchy: Vec<String> = Vec::new();
        let mut member_types: Vec<String> = Vec::new();
        let mut annotation_types: Vec<String> = Vec::new();
        let mut member_descriptors: Vec<String> = Vec::new();

        if let Some(facts) = record.class_facts(name) {
            hierarchy.extend(facts.superclass().map(str::to_string));
            hierarchy.extend(facts.interfaces.iter().cloned());
            hierarchy.extend(facts.enclosing_class.clone());

            if let Some(signature) = &facts.signature {
                generics::class_names_in_type_parameters(&signature.type_parameters, &mut member_types);
                let mut names = Vec::new();
                for class_type in std::iter::once(&signature.super_class).chain(&signature.interfaces) {
                    generics::class_names_in_field_signature(
                        &girder_classfile::FieldTypeSignature::Class(class_type.clone()),
                        &mut names,
                    );
                }
                member_types.extend(names);
            }

            for field in &facts.fields {
                member_descriptors.push(field.descriptor.clone());
                if let Some(signature) = &field.signature {
                    generics::class_names_in_field_signature(signature, &mut member_types);
                }
                collect_annotation_names(&field.annotations, &mut annotation_types, &mut member_types);
            }
            for method in &facts.methods {
                self.enqueue_method_descriptor(&method.descriptor);
                if let Some(signature) = &method.signature {
                    generics::class_names_in_method_signature(signature, &mut member_types);
                }
                collect_annotation_names(&method.annotations, &mut annotation_types, &mut member_types);
                if let Some(default) = &method.annotation_default {
                    collect_value_names(default, &mut annotation_types, &mut member_types);
                }
            }
            for constructor in &facts.constructors {
                self.enqueue_method_descriptor(&constructor.descriptor);
                if let Some(signature) = &constructor.signature {
                    generics::class_names_in_method_signature(signature, &mut member_types);
                }
                collect_annotation_names(&constructor.annotations, &mut annotation_types, &mut member_types);
            }
            collect_annotation_names(&facts.annotations, &mut annotation_types, &mut member_types);
        }

        for name in hierarchy {
            self.enqueue(Category::Hierarchy, name);
        }
        for name in annotation_types {
            self.enqueue(Category::Annotation, name);
        }
        for name in member_types {
            self.enqueue(Category::MemberType, name);
        }
        for descriptor in member_descriptors {
            self.enqueue_descriptor(Category::MemberType, &descriptor);
        }

        for access in record.accesses_for(name) {
            self.enqueue_type_ref(Category::AccessTarget, &access.target.owner);
        }
        for block in record.try_catches_for(name) {
            for caught in &block.caught_types {
                self.enqueue_type_ref(Category::AccessTarget, caught);
            }
            for contained in &block.records {
                self.enqueue_type_ref(Category::AccessTarget, &contained.target.owner);
            }
        }
    }

    fn enqueue_method_descriptor(&mut self, descriptor: &str) {
        if let Ok(parsed) = girder_classfile::parse_method_descriptor(descriptor) {
            for param in &parsed.params {
                self.enqueue_type_ref(Category::MemberType, &field_type_ref(param));
            }
            if let girder_classfile::ReturnType::Type(ty) = &parsed.return_type {
                self.enqueue_type_ref(Category::MemberType, &field_type_ref(ty));
            }
        }
    }
}

fn collect_annotation_names(
    annotations: &[girder_classfile::Annotation],
    annotation_types: &mut Vec<String>,
    member_types: &mut Vec<String>,
) {
    for annotation in annotations {
        annotation_types.push(TypeRef::from_descriptor(&annotation.type_descriptor).binary_name());
        for (_, value) in &annotation.elements {
            collect_value_names(value, annotation_types, member_types);
        }
    }
}

fn collect_value_names(
    value: &ElementValue,
    annotation_types: &mut Vec<String>,
    member_types: &mut Vec<String>,
) {
    match value {
        ElementValue::Const(_) => {}
        ElementValue::Enum { type_descriptor, .. } => {
            member_types.push(TypeRef::from_descriptor(type_descriptor).binary_name());
        }
        ElementValue::Class(descriptor) => {
            member_types.push(TypeRef::from_descriptor(descriptor).binary_name());
        }
        ElementValue::Annotation(nested) => {
            annotation_types.push(TypeRef::from_descriptor(&nested.type_descriptor).binary_name());
            for (_, nested_value) in &nested.elements {
                collect_value_names(nested_value, annotation_types, member_types);
            }
        }
        ElementValue::Array(values) => {
            for value in values {
                collect_value_names(value, annotation_types, member_types);
            }
        }
    }
}
