use crate::annotation::{Annotation, ElementValue};
use crate::code::{parse_code_attribute, CodeInfo};
use crate::constant_pool::{ConstantPool, CpInfo, MethodHandleInfo};
use crate::error::{Error, Result};
use crate::reader::Reader;

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Internal name, e.g. `com/example/Foo$Bar`.
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ClassMember>,
    pub methods: Vec<ClassMember>,
    pub signature: Option<String>,
    pub source_file: Option<String>,
    pub runtime_visible_annotations: Vec<Annotation>,
    pub runtime_invisible_annotations: Vec<Annotation>,
    pub inner_classes: Vec<InnerClassInfo>,
    pub enclosing_method: Option<EnclosingMethodInfo>,
    pub bootstrap_methods: Vec<BootstrapMethodInfo>,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub runtime_visible_annotations: Vec<Annotation>,
    pub runtime_invisible_annotations: Vec<Annotation>,
    /// `AnnotationDefault` value; only present on annotation-type methods.
    pub annotation_default: Option<ElementValue>,
    pub code: Option<CodeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassInfo {
    pub inner_class: String,
    pub outer_class: Option<String>,
    pub inner_name: Option<String>,
    pub access_flags: u16,
}

/// `EnclosingMethod` attribute: the immediately enclosing class and, for
/// classes declared inside a code unit, that unit's name and descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethodInfo {
    pub class: String,
    pub method: Option<(String, String)>,
}

/// One `BootstrapMethods` entry with its `CONSTANT_MethodHandle` static
/// arguments already resolved (other argument kinds are not of interest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethodInfo {
    pub handle_arguments: Vec<MethodHandleInfo>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        match Self::parse_filtered(bytes, |_| true)? {
            Some(class) => Ok(class),
            None => unreachable!("filter accepts every class"),
        }
    }

    /// Parse the header far enough to learn the class name, then hand the
    /// name to `keep`. When `keep` declines, the body is not decoded and
    /// `Ok(None)` is returned.
    pub fn parse_filtered(
        bytes: &[u8],
        keep: impl FnOnce(&str) -> bool,
    ) -> Result<Option<Self>> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != 0xCAFEBABE {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = cp.get_class_name(reader.read_u2()?)?;
        if !keep(&this_class) {
            return Ok(None);
        }

        let super_class_index = reader.read_u2()?;
        let super_class = if super_class_index == 0 {
            None
        } else {
            Some(cp.get_class_name(super_class_index)?)
        };

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(cp.get_class_name(reader.read_u2()?)?);
        }

        let fields_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(fields_count);
        for _ in 0..fields_count {
            fields.push(parse_member(&mut reader, &cp)?);
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_member(&mut reader, &cp)?);
        }

        let class_attrs = parse_attributes(&mut reader, &cp, AttributeTarget::Class)?;

        reader.ensure_empty()?;

        Ok(Some(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            signature: class_attrs.signature,
            source_file: class_attrs.source_file,
            runtime_visible_annotations: class_attrs.runtime_visible_annotations,
            runtime_invisible_annotations: class_attrs.runtime_invisible_annotations,
            inner_classes: class_attrs.inner_classes,
            enclosing_method: class_attrs.enclosing_method,
            bootstrap_methods: class_attrs.bootstrap_methods,
        }))
    }

    /// The method-handle target of an `invokedynamic` instruction's
    /// bootstrap-method slot, if any handle argument was present.
    pub fn invokedynamic_handle(&self, bootstrap_index: u16) -> Option<&MethodHandleInfo> {
        self.bootstrap_methods
            .get(bootstrap_index as usize)?
            .handle_arguments
            .first()
    }
}

fn parse_member(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<ClassMember> {
    let access_flags = reader.read_u2()?;
    let name = cp.get_utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

    let attrs = parse_attributes(reader, cp, AttributeTarget::Member)?;
    Ok(ClassMember {
        access_flags,
        name,
        descriptor,
        signature: attrs.signature,
        runtime_visible_annotations: attrs.runtime_visible_annotations,
        runtime_invisible_annotations: attrs.runtime_invisible_annotations,
        annotation_default: attrs.annotation_default,
        code: attrs.code,
    })
}

#[derive(Default)]
struct ParsedAttributes {
    signature: Option<String>,
    source_file: Option<String>,
    runtime_visible_annotations: Vec<Annotation>,
    runtime_invisible_annotations: Vec<Annotation>,
    inner_classes: Vec<InnerClassInfo>,
    enclosing_method: Option<EnclosingMethodInfo>,
    bootstrap_methods: Vec<BootstrapMethodInfo>,
    annotation_default: Option<ElementValue>,
    code: Option<CodeInfo>,
}

enum AttributeTarget {
    Class,
    Member,
}

fn parse_attributes(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    target: AttributeTarget,
) -> Result<ParsedAttributes> {
    let attributes_count = reader.read_u2()? as usize;
    let mut parsed = ParsedAttributes::default();
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let name = cp.get_utf8(name_index)?;

        let mut sub = Reader::new(info);
        match (name, &target) {
            ("Signature", _) => {
                let sig_index = sub.read_u2()?;
                parsed.signature = Some(cp.get_utf8(sig_index)?.to_string());
                sub.ensure_empty()?;
            }
            ("RuntimeVisibleAnnotations", _) => {
                parsed
                    .runtime_visible_annotations
                    .extend(parse_annotations(&mut sub, cp)?);
                sub.ensure_empty()?;
            }
            ("RuntimeInvisibleAnnotations", _) => {
                parsed
                    .runtime_invisible_annotations
                    .extend(parse_annotations(&mut sub, cp)?);
                sub.ensure_empty()?;
            }
            ("SourceFile", AttributeTarget::Class) => {
                let index = sub.read_u2()?;
                parsed.source_file = Some(cp.get_utf8(index)?.to_string());
                sub.ensure_empty()?;
            }
            ("InnerClasses", AttributeTarget::Class) => {
                let num = sub.read_u2()? as usize;
                for _ in 0..num {
                    let inner_class_info_index = sub.read_u2()?;
                    let outer_class_info_index = sub.read_u2()?;
                    let inner_name_index = sub.read_u2()?;
                    let inner_access_flags = sub.read_u2()?;

                    let inner_class = cp.get_class_name(inner_class_info_index)?;
                    let outer_class = if outer_class_info_index == 0 {
                        None
                    } else {
                        Some(cp.get_class_name(outer_class_info_index)?)
                    };
                    let inner_name = if inner_name_index == 0 {
                        None
                    } else {
                        Some(cp.get_utf8(inner_name_index)?.to_string())
                    };

                    parsed.inner_classes.push(InnerClassInfo {
                        inner_class,
                        outer_class,
                        inner_name,
                        access_flags: inner_access_flags,
                    });
                }
                sub.ensure_empty()?;
            }
            ("EnclosingMethod", AttributeTarget::Class) => {
                let class_index = sub.read_u2()?;
                let method_index = sub.read_u2()?;
                let class = cp.get_class_name(class_index)?;
                let method = if method_index == 0 {
                    None
                } else {
                    let (name, descriptor) = cp.get_name_and_type(method_index)?;
                    Some((name.to_string(), descriptor.to_string()))
                };
                parsed.enclosing_method = Some(EnclosingMethodInfo { class, method });
                sub.ensure_empty()?;
            }
            ("BootstrapMethods", AttributeTarget::Class) => {
                let num = sub.read_u2()? as usize;
                for _ in 0..num {
                    let _bootstrap_method_ref = sub.read_u2()?;
                    let num_args = sub.read_u2()? as usize;
                    let mut handle_arguments = Vec::new();
                    for _ in 0..num_args {
                        let arg_index = sub.read_u2()?;
                        if matches!(cp.get(arg_index)?, CpInfo::MethodHandle { .. }) {
                            handle_arguments.push(cp.get_method_handle(arg_index)?);
                        }
                    }
                    parsed
                        .bootstrap_methods
                        .push(BootstrapMethodInfo { handle_arguments });
                }
                sub.ensure_empty()?;
            }
            ("AnnotationDefault", AttributeTarget::Member) => {
                parsed.annotation_default = Some(ElementValue::parse(&mut sub, cp)?);
                sub.ensure_empty()?;
            }
            ("Code", AttributeTarget::Member) => {
                parsed.code = Some(parse_code_attribute(&mut sub, cp)?);
                sub.ensure_empty()?;
            }
            _ => {
                // Unknown attribute: intentionally skipped.
            }
        }
    }

    Ok(parsed)
}

fn parse_annotations(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Vec<Annotation>> {
    let num = reader.read_u2()? as usize;
    let mut annotations = Vec::with_capacity(num);
    for _ in 0..num {
        annotations.push(Annotation::parse(reader, cp)?);
    }
    Ok(annotations)
}
