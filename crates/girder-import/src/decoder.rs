//! Drives the binary class decoder: turns one parsed class file into raw
//! facts in the recorder. Each type is visited at most once per session;
//! if the recorder already knows the name the body is skipped without
//! decoding it.

use girder_classfile::{
    handle_kind, ClassFile, ClassMember, CodeInfo, InstructionKind, MethodHandleInfo,
};
use girder_graph::{internal_to_binary, TypeRef};

use crate::raw::{
    RawAccessKind, RawAccessRecord, RawClassFacts, RawCodeUnit, RawConstructor, RawField,
    RawMethod, SyntheticInvocation,
};
use crate::record::{ImportRecord, Routing};
use crate::try_catch::correlate_try_catches;

/// Decode one class into the recorder. Returns the decoded binary name, or
/// `None` when the recorder already knew the type and the body was
/// skipped.
pub(crate) fn import_class_bytes(
    record: &mut ImportRecord,
    bytes: &[u8],
) -> girder_classfile::Result<Option<String>> {
    let parsed = ClassFile::parse_filtered(bytes, |internal| {
        !record.contains_class(&internal_to_binary(internal))
    })?;
    let Some(class_file) = parsed else {
        return Ok(None);
    };

    let binary_name = internal_to_binary(&class_file.this_class);
    let facts = collect_facts(record, &binary_name, &class_file);
    record.add_class(binary_name.clone(), facts);
    collect_code_records(record, &binary_name, &class_file);
    Ok(Some(binary_name))
}

fn collect_facts(record: &ImportRecord, binary_name: &str, class_file: &ClassFile) -> RawClassFacts {
    let mut facts = RawClassFacts::default();
    facts.access_flags = class_file.access_flags;
    facts.class_file_version = (class_file.major_version, class_file.minor_version);
    facts.source_file = class_file.source_file.clone();

    if let Some(superclass) = &class_file.super_class {
        facts.set_superclass(binary_name, internal_to_binary(superclass));
    }
    facts.interfaces = class_file
        .interfaces
        .iter()
        .map(|i| internal_to_binary(i))
        .collect();

    if let Some(signature) = &class_file.signature {
        match girder_classfile::parse_class_signature(signature) {
            Ok(parsed) => facts.signature = Some(parsed),
            Err(error) => tracing::warn!(
                class = %binary_name,
                %error,
                "ignoring malformed class signature"
            ),
        }
    }

    // EnclosingMethod wins over InnerClasses: it also names the code unit
    // for local and anonymous classes.
    if let Some(enclosing) = &class_file.enclosing_method {
        let enclosing_class = internal_to_binary(&enclosing.class);
        facts.enclosing_code_unit = enclosing.method.as_ref().map(|(name, descriptor)| {
            RawCodeUnit::new(enclosing_class.clone(), name.clone(), descriptor.clone())
        });
        facts.enclosing_class = Some(enclosing_class);
    } else {
        facts.enclosing_class = class_file
            .inner_classes
            .iter()
            .find(|info| info.inner_class == class_file.this_class)
            .and_then(|info| info.outer_class.as_deref())
            .map(internal_to_binary);
    }

    let predicates = *record.predicates();
    for field in &class_file.fields {
        if (predicates.is_switch_map_field)(&field.name) {
            continue;
        }
        let signature = field.signature.as_deref().and_then(|sig| {
            match girder_classfile::parse_field_signature(sig) {
                Ok(parsed) => Some(parsed),
                Err(error) => {
                    tracing::warn!(class = %binary_name, field = %field.name, %error,
                        "ignoring malformed field signature");
                    None
                }
            }
        });
        facts.fields.push(RawField {
            name: field.name.clone(),
            descriptor: field.descriptor.clone(),
            access_flags: field.access_flags,
            signature,
            annotations: merged_annotations(field),
        });
    }

    for method in &class_file.methods {
        if method.annotation_default.is_some() && method.name.starts_with('<') {
            panic!(
                "annotation default declared on non-method code unit {binary_name}.{}",
                method.name
            );
        }
        match method.name.as_str() {
            "<clinit>" => facts.set_static_initializer(binary_name),
            "<init>" => {
                facts.constructors.push(RawConstructor {
                    descriptor: method.descriptor.clone(),
                    access_flags: method.access_flags,
                    signature: parse_method_signature_lenient(binary_name, method),
                    annotations: merged_annotations(method),
                });
            }
            name if predicates.is_synthetic_unit_name(name) => {
                // Compiler-injected unit: not a member, but its body still
                // produces records (rewritten to real origins later).
            }
            _ => {
                facts.methods.push(RawMethod {
                    name: method.name.clone(),
                    descriptor: method.descriptor.clone(),
                    access_flags: method.access_flags,
                    signature: parse_method_signature_lenient(binary_name, method),
                    annotations: merged_annotations(method),
                    annotation_default: method.annotation_default.clone(),
                });
            }
        }
    }

    facts.annotations = class_file
        .runtime_visible_annotations
        .iter()
        .chain(&class_file.runtime_invisible_annotations)
        .cloned()
        .collect();

    facts
}

fn parse_method_signature_lenient(
    binary_name: &str,
    method: &ClassMember,
) -> Option<girder_classfile::MethodSignature> {
    let sig = method.signature.as_deref()?;
    match girder_classfile::parse_method_signature(sig) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            tracing::warn!(class = %binary_name, method = %method.name, %error,
                "ignoring malformed method signature");
            None
        }
    }
}

fn merged_annotations(member: &ClassMember) -> Vec<girder_classfile::Annotation> {
    member
        .runtime_visible_annotations
        .iter()
        .chain(&member.runtime_invisible_annotations)
        .cloned()
        .collect()
}

fn collect_code_records(record: &mut ImportRecord, binary_name: &str, class_file: &ClassFile) {
    for method in &class_file.methods {
        let Some(code) = &method.code else {
            continue;
        };
        let origin = RawCodeUnit::new(binary_name, method.name.clone(), method.descriptor.clone());
        let mut positioned: Vec<(u16, RawAccessRecord)> = Vec::new();

        for instruction in &code.instructions {
            let line_number = code.line_at(instruction.pc);
            match &instruction.kind {
                InstructionKind::FieldAccess { op, owner, name, descriptor } => {
                    let kind = if op.is_write() {
                        RawAccessKind::FieldWrite
                    } else {
                        RawAccessKind::FieldRead
                    };
                    positioned.push((
                        instruction.pc,
                        member_record(&origin, kind, owner, name, descriptor, line_number),
                    ));
                }
                InstructionKind::Invoke { owner, name, descriptor, .. } => {
                    let kind = if name == "<init>" {
                        RawAccessKind::ConstructorCall
                    } else {
                        RawAccessKind::MethodCall
                    };
                    positioned.push((
                        instruction.pc,
                        member_record(&origin, kind, owner, name, descriptor, line_number),
                    ));
                }
                InstructionKind::InvokeDynamic { bootstrap_index, .. } => {
                    let Some(handle) = class_file.invokedynamic_handle(*bootstrap_index) else {
                        continue;
                    };
                    if let Some(reference) =
                        indy_record(record, &origin, handle, line_number)
                    {
                        positioned.push((instruction.pc, reference));
                    }
                }
                InstructionKind::ClassConstant { class } => {
                    positioned.push((
                        instruction.pc,
                        type_record(&origin, RawAccessKind::ClassObject, class, line_number),
                    ));
                }
                InstructionKind::Instanceof { class } => {
                    positioned.push((
                        instruction.pc,
                        type_record(&origin, RawAccessKind::InstanceofCheck, class, line_number),
                    ));
                }
                // Casts are reported by the decoder but carry no dependency
                // record of their own.
                InstructionKind::Checkcast { .. } => {}
            }
        }

        register_try_catches(record, &origin, code, &positioned);

        for (_, raw) in positioned {
            record.add_access(raw);
        }
    }
}

fn register_try_catches(
    record: &mut ImportRecord,
    origin: &RawCodeUnit,
    code: &CodeInfo,
    positioned: &[(u16, RawAccessRecord)],
) {
    // Only ordinarily-stored records count as "contained"; calls routed
    // into the synthetic index are links, not dependency edges.
    let ordinary: Vec<(u16, RawAccessRecord)> = positioned
        .iter()
        .filter(|(_, raw)| record.classify(raw) == Routing::Ordinary)
        .cloned()
        .collect();
    for block in correlate_try_catches(origin, code, &ordinary) {
        record.add_try_catch(block);
    }
}

/// A lambda-body hook becomes a synthetic-index link; everything else with
/// a resolvable handle is a method or constructor reference record.
fn indy_record(
    record: &mut ImportRecord,
    origin: &RawCodeUnit,
    handle: &MethodHandleInfo,
    line_number: u16,
) -> Option<RawAccessRecord> {
    let predicates = *record.predicates();
    if (predicates.is_lambda_method)(&handle.name) {
        record.add_synthetic_invocation(
            RawCodeUnit::new(
                internal_to_binary(&handle.owner),
                handle.name.clone(),
                handle.descriptor.clone(),
            ),
            SyntheticInvocation {
                origin: origin.clone(),
                through_lambda: true,
            },
        );
        return None;
    }
    let kind = if handle.reference_kind == handle_kind::NEW_INVOKE_SPECIAL
        || handle.name == "<init>"
    {
        RawAccessKind::ConstructorReference
    } else {
        RawAccessKind::MethodReference
    };
    Some(member_record(
        origin,
        kind,
        &handle.owner,
        &handle.name,
        &handle.descriptor,
        line_number,
    ))
}

fn member_record(
    origin: &RawCodeUnit,
    kind: RawAccessKind,
    owner_internal: &str,
    name: &str,
    descriptor: &str,
    line_number: u16,
) -> RawAccessRecord {
    RawAccessRecord {
        origin: origin.clone(),
        kind,
        target: crate::raw::RawTarget {
            owner: TypeRef::from_class_entry(owner_internal),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        },
        line_number,
        declared_in_lambda: false,
    }
}

fn type_record(
    origin: &RawCodeUnit,
    kind: RawAccessKind,
    class_entry: &str,
    line_number: u16,
) -> RawAccessRecord {
    RawAccessRecord {
        origin: origin.clone(),
        kind,
        target: crate::raw::RawTarget::type_only(TypeRef::from_class_entry(class_entry)),
        line_number,
        declared_in_lambda: false,
    }
}
