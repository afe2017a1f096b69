//! Test-only class-file emitter.
//!
//! Integration tests need real class bytes without shelling out to a JDK;
//! this crate assembles minimal but structurally valid class files:
//! constant pool with deduplication, fields, methods with bytecode,
//! line-number and exception tables, annotations, and bootstrap methods
//! for `invokedynamic` fixtures.

#![forbid(unsafe_code)]

use std::collections::HashMap;

pub mod flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
    pub const ACC_ANNOTATION: u16 = 0x2000;
}

pub mod handle_kind {
    pub const INVOKE_VIRTUAL: u8 = 5;
    pub const INVOKE_STATIC: u8 = 6;
    pub const INVOKE_SPECIAL: u8 = 7;
    pub const NEW_INVOKE_SPECIAL: u8 = 8;
    pub const INVOKE_INTERFACE: u8 = 9;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Entry {
    Utf8(String),
    Integer(i32),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    InvokeDynamic(u16, u16),
}

/// Deduplicating constant-pool builder.
#[derive(Debug, Default)]
pub struct ConstPool {
    entries: Vec<Entry>,
    index: HashMap<Entry, u16>,
}

impl ConstPool {
    fn add(&mut self, entry: Entry) -> u16 {
        if let Some(&idx) = self.index.get(&entry) {
            return idx;
        }
        self.entries.push(entry.clone());
        let idx = self.entries.len() as u16;
        self.index.insert(entry, idx);
        idx
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        self.add(Entry::Utf8(value.to_string()))
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.add(Entry::Integer(value))
    }

    pub fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.add(Entry::Class(name))
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        self.add(Entry::String(utf8))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.add(Entry::NameAndType(name, descriptor))
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.add(Entry::FieldRef(class, nat))
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.add(Entry::MethodRef(class, nat))
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.add(Entry::InterfaceMethodRef(class, nat))
    }

    pub fn method_handle(&mut self, kind: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let reference = if kind == handle_kind::INVOKE_INTERFACE {
            self.interface_method_ref(owner, name, descriptor)
        } else {
            self.method_ref(owner, name, descriptor)
        };
        self.add(Entry::MethodHandle(kind, reference))
    }

    pub fn invoke_dynamic(&mut self, bootstrap_index: u16, name: &str, descriptor: &str) -> u16 {
        let nat = self.name_and_type(name, descriptor);
        self.add(Entry::InvokeDynamic(bootstrap_index, nat))
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.entries.len() as u16 + 1).to_be_bytes());
        for entry in &self.entries {
            match entry {
                Entry::Utf8(value) => {
                    out.push(1);
                    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
                    out.extend_from_slice(value.as_bytes());
                }
                Entry::Integer(value) => {
                    out.push(3);
                    out.extend_from_slice(&value.to_be_bytes());
                }
                Entry::Class(name) => {
                    out.push(7);
                    out.extend_from_slice(&name.to_be_bytes());
                }
                Entry::String(utf8) => {
                    out.push(8);
                    out.extend_from_slice(&utf8.to_be_bytes());
                }
                Entry::FieldRef(class, nat) => {
                    out.push(9);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                Entry::MethodRef(class, nat) => {
                    out.push(10);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                Entry::InterfaceMethodRef(class, nat) => {
                    out.push(11);
                    out.extend_from_slice(&class.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
                Entry::NameAndType(name, descriptor) => {
                    out.push(12);
                    out.extend_from_slice(&name.to_be_bytes());
                    out.extend_from_slice(&descriptor.to_be_bytes());
                }
                Entry::MethodHandle(kind, reference) => {
                    out.push(15);
                    out.push(*kind);
                    out.extend_from_slice(&reference.to_be_bytes());
                }
                Entry::InvokeDynamic(bootstrap, nat) => {
                    out.push(18);
                    out.extend_from_slice(&bootstrap.to_be_bytes());
                    out.extend_from_slice(&nat.to_be_bytes());
                }
            }
        }
    }
}

/// Bytecode buffer for one method body.
#[derive(Debug, Default, Clone)]
pub struct Code {
    bytes: Vec<u8>,
    lines: Vec<(u16, u16)>,
    exceptions: Vec<(u16, u16, u16, Option<String>)>,
    max_stack: u16,
    max_locals: u16,
}

impl Code {
    pub fn new(max_stack: u16, max_locals: u16) -> Self {
        Self {
            max_stack,
            max_locals,
            ..Self::default()
        }
    }

    /// Current bytecode offset; usable as a label for exception ranges.
    pub fn pc(&self) -> u16 {
        self.bytes.len() as u16
    }

    /// Attach a line-number entry at the current offset.
    pub fn line(&mut self, line: u16) -> &mut Self {
        self.lines.push((self.pc(), line));
        self
    }

    pub fn exception(
        &mut self,
        start: u16,
        end: u16,
        handler: u16,
        catch_type: Option<&str>,
    ) -> &mut Self {
        self.exceptions
            .push((start, end, handler, catch_type.map(str::to_string)));
        self
    }

    pub fn nop(&mut self) -> &mut Self {
        self.bytes.push(0x00);
        self
    }

    pub fn aload_0(&mut self) -> &mut Self {
        self.bytes.push(0x2a);
        self
    }

    pub fn iconst_0(&mut self) -> &mut Self {
        self.bytes.push(0x03);
        self
    }

    pub fn pop(&mut self) -> &mut Self {
        self.bytes.push(0x57);
        self
    }

    pub fn dup(&mut self) -> &mut Self {
        self.bytes.push(0x59);
        self
    }

    pub fn aconst_null(&mut self) -> &mut Self {
        self.bytes.push(0x01);
        self
    }

    pub fn return_(&mut self) -> &mut Self {
        self.bytes.push(0xb1);
        self
    }

    pub fn areturn(&mut self) -> &mut Self {
        self.bytes.push(0xb0);
        self
    }

    pub fn ireturn(&mut self) -> &mut Self {
        self.bytes.push(0xac);
        self
    }

    pub fn athrow(&mut self) -> &mut Self {
        self.bytes.push(0xbf);
        self
    }

    pub fn goto(&mut self, target: u16) -> &mut Self {
        let offset = target as i32 - self.pc() as i32;
        self.bytes.push(0xa7);
        self.bytes.extend_from_slice(&(offset as i16).to_be_bytes());
        self
    }

    pub fn new_instance(&mut self, pool: &mut ConstPool, class: &str) -> &mut Self {
        let index = pool.class(class);
        self.bytes.push(0xbb);
        self.bytes.extend_from_slice(&index.to_be_bytes());
        self
    }

    fn member_insn(&mut self, opcode: u8, index: u16) -> &mut Self {
        self.bytes.push(opcode);
        self.bytes.extend_from_slice(&index.to_be_bytes());
        self
    }

    pub fn getstatic(&mut self, pool: &mut ConstPool, owner: &str, name: &str, desc: &str) -> &mut Self {
        let index = pool.field_ref(owner, name, desc);
        self.member_insn(0xb2, index)
    }

    pub fn putstatic(&mut self, pool: &mut ConstPool, owner: &str, name: &str, desc: &str) -> &mut Self {
        let index = pool.field_ref(owner, name, desc);
        self.member_insn(0xb3, index)
    }

    pub fn getfield(&mut self, pool: &mut ConstPool, owner: &str, name: &str, desc: &str) -> &mut Self {
        let index = pool.field_ref(owner, name, desc);
        self.member_insn(0xb4, index)
    }

    pub fn putfield(&mut self, pool: &mut ConstPool, owner: &str, name: &str, desc: &str) -> &mut Self {
        let index = pool.field_ref(owner, name, desc);
        self.member_insn(0xb5, index)
    }

    pub fn invokevirtual(&mut self, pool: &mut ConstPool, owner: &str, name: &str, desc: &str) -> &mut Self {
        let index = pool.method_ref(owner, name, desc);
        self.member_insn(0xb6, index)
    }

    pub fn invokespecial(&mut self, pool: &mut ConstPool, owner: &str, name: &str, desc: &str) -> &mut Self {
        let index = pool.method_ref(owner, name, desc);
        self.member_insn(0xb7, index)
    }

    pub fn invokestatic(&mut self, pool: &mut ConstPool, owner: &str, name: &str, desc: &str) -> &mut Self {
        let index = pool.method_ref(owner, name, desc);
        self.member_insn(0xb8, index)
    }

    pub fn invokeinterface(&mut self, pool: &mut ConstPool, owner: &str, name: &str, desc: &str, count: u8) -> &mut Self {
        let index = pool.interface_method_ref(owner, name, desc);
        self.bytes.push(0xb9);
        self.bytes.extend_from_slice(&index.to_be_bytes());
        self.bytes.push(count);
        self.bytes.push(0);
        self
    }

    pub fn invokedynamic(&mut self, pool: &mut ConstPool, bootstrap_index: u16, name: &str, desc: &str) -> &mut Self {
        let index = pool.invoke_dynamic(bootstrap_index, name, desc);
        self.bytes.push(0xba);
        self.bytes.extend_from_slice(&index.to_be_bytes());
        self.bytes.push(0);
        self.bytes.push(0);
        self
    }

    pub fn ldc_class(&mut self, pool: &mut ConstPool, class: &str) -> &mut Self {
        let index = pool.class(class);
        self.bytes.push(0x13); // ldc_w, index always fits
        self.bytes.extend_from_slice(&index.to_be_bytes());
        self
    }

    pub fn instanceof(&mut self, pool: &mut ConstPool, class: &str) -> &mut Self {
        let index = pool.class(class);
        self.member_insn(0xc1, index)
    }

    pub fn checkcast(&mut self, pool: &mut ConstPool, class: &str) -> &mut Self {
        let index = pool.class(class);
        self.member_insn(0xc0, index)
    }

    pub fn astore(&mut self, slot: u8) -> &mut Self {
        self.bytes.push(0x3a);
        self.bytes.push(slot);
        self
    }
}

/// A simplified annotation for fixture emission.
#[derive(Debug, Clone)]
pub struct AnnotationSpec {
    /// Field descriptor of the annotation type, e.g. `Lcom/example/Marker;`.
    pub type_descriptor: String,
    pub elements: Vec<(String, ValueSpec)>,
}

impl AnnotationSpec {
    pub fn new(type_descriptor: &str) -> Self {
        Self {
            type_descriptor: type_descriptor.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn element(mut self, name: &str, value: ValueSpec) -> Self {
        self.elements.push((name.to_string(), value));
        self
    }
}

#[derive(Debug, Clone)]
pub enum ValueSpec {
    Int(i32),
    String(String),
    Enum { type_descriptor: String, constant: String },
    Class(String),
    Array(Vec<ValueSpec>),
}

impl ValueSpec {
    fn write(&self, pool: &mut ConstPool, out: &mut Vec<u8>) {
        match self {
            ValueSpec::Int(v) => {
                out.push(b'I');
                out.extend_from_slice(&pool.integer(*v).to_be_bytes());
            }
            ValueSpec::String(v) => {
                out.push(b's');
                out.extend_from_slice(&pool.utf8(v).to_be_bytes());
            }
            ValueSpec::Enum { type_descriptor, constant } => {
                out.push(b'e');
                out.extend_from_slice(&pool.utf8(type_descriptor).to_be_bytes());
                out.extend_from_slice(&pool.utf8(constant).to_be_bytes());
            }
            ValueSpec::Class(descriptor) => {
                out.push(b'c');
                out.extend_from_slice(&pool.utf8(descriptor).to_be_bytes());
            }
            ValueSpec::Array(values) => {
                out.push(b'[');
                out.extend_from_slice(&(values.len() as u16).to_be_bytes());
                for value in values {
                    value.write(pool, out);
                }
            }
        }
    }
}

fn write_annotation(annotation: &AnnotationSpec, pool: &mut ConstPool, out: &mut Vec<u8>) {
    out.extend_from_slice(&pool.utf8(&annotation.type_descriptor).to_be_bytes());
    out.extend_from_slice(&(annotation.elements.len() as u16).to_be_bytes());
    for (name, value) in &annotation.elements {
        out.extend_from_slice(&pool.utf8(name).to_be_bytes());
        value.write(pool, out);
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    access: u16,
    name: String,
    descriptor: String,
    signature: Option<String>,
    annotations: Vec<AnnotationSpec>,
}

#[derive(Debug, Clone)]
struct MethodSpec {
    access: u16,
    name: String,
    descriptor: String,
    signature: Option<String>,
    code: Option<Code>,
    annotations: Vec<AnnotationSpec>,
    annotation_default: Option<ValueSpec>,
}

/// Assembles one class file.
pub struct ClassBuilder {
    pub pool: ConstPool,
    access: u16,
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    signature: Option<String>,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
    annotations: Vec<AnnotationSpec>,
    bootstrap_handles: Vec<(u8, String, String, String)>,
    enclosing_method: Option<(String, Option<(String, String)>)>,
}

impl ClassBuilder {
    /// `name` and `superclass` are internal names (`com/example/Foo`).
    pub fn new(access: u16, name: &str, superclass: &str) -> Self {
        Self {
            pool: ConstPool::default(),
            access,
            name: name.to_string(),
            superclass: Some(superclass.to_string()),
            interfaces: Vec::new(),
            signature: None,
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            bootstrap_handles: Vec::new(),
            enclosing_method: None,
        }
    }

    pub fn interface(mut self, internal_name: &str) -> Self {
        self.interfaces.push(internal_name.to_string());
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn annotation(mut self, annotation: AnnotationSpec) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn enclosing_method(mut self, class: &str, method: Option<(&str, &str)>) -> Self {
        self.enclosing_method = Some((
            class.to_string(),
            method.map(|(n, d)| (n.to_string(), d.to_string())),
        ));
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.fields.push(FieldSpec {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            annotations: Vec::new(),
        });
        self
    }

    pub fn field_with(
        mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        annotations: Vec<AnnotationSpec>,
    ) -> Self {
        self.fields.push(FieldSpec {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            annotations,
        });
        self
    }

    pub fn method(mut self, access: u16, name: &str, descriptor: &str, code: Option<Code>) -> Self {
        self.methods.push(MethodSpec {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            code,
            annotations: Vec::new(),
            annotation_default: None,
        });
        self
    }

    pub fn method_with(
        mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        code: Option<Code>,
        signature: Option<&str>,
        annotations: Vec<AnnotationSpec>,
        annotation_default: Option<ValueSpec>,
    ) -> Self {
        self.methods.push(MethodSpec {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            code,
            annotations,
            annotation_default,
        });
        self
    }

    /// Register a bootstrap-method slot whose sole static argument is the
    /// given method handle; returns the slot index for `invokedynamic`.
    pub fn bootstrap_handle(&mut self, kind: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.bootstrap_handles
            .push((kind, owner.to_string(), name.to_string(), descriptor.to_string()));
        (self.bootstrap_handles.len() - 1) as u16
    }

    pub fn build(mut self) -> Vec<u8> {
        let mut pool = std::mem::take(&mut self.pool);

        let this_class = pool.class(&self.name);
        let super_class = self.superclass.as_deref().map(|s| pool.class(s));
        let interface_indexes: Vec<u16> =
            self.interfaces.iter().map(|i| pool.class(i)).collect();

        let fields: Vec<Vec<u8>> = self
            .fields
            .iter()
            .map(|field| {
                let mut attrs: Vec<(u16, Vec<u8>)> = Vec::new();
                if let Some(sig) = &field.signature {
                    let name = pool.utf8("Signature");
                    let value = pool.utf8(sig).to_be_bytes().to_vec();
                    attrs.push((name, value));
                }
                if !field.annotations.is_empty() {
                    attrs.push(annotations_attribute(&field.annotations, &mut pool));
                }
                member_bytes(field.access, &field.name, &field.descriptor, attrs, &mut pool)
            })
            .collect();

        let methods: Vec<Vec<u8>> = self
            .methods
            .iter()
            .map(|method| {
                let mut attrs: Vec<(u16, Vec<u8>)> = Vec::new();
                if let Some(code) = &method.code {
                    attrs.push(code_attribute(code, &mut pool));
                }
                if let Some(sig) = &method.signature {
                    let name = pool.utf8("Signature");
                    let value = pool.utf8(sig).to_be_bytes().to_vec();
                    attrs.push((name, value));
                }
                if !method.annotations.is_empty() {
                    attrs.push(annotations_attribute(&method.annotations, &mut pool));
                }
                if let Some(default) = &method.annotation_default {
                    let name = pool.utf8("AnnotationDefault");
                    let mut value = Vec::new();
                    default.write(&mut pool, &mut value);
                    attrs.push((name, value));
                }
                member_bytes(method.access, &method.name, &method.descriptor, attrs, &mut pool)
            })
            .collect();

        let mut class_attrs: Vec<(u16, Vec<u8>)> = Vec::new();
        if let Some(sig) = &self.signature {
            let name = pool.utf8("Signature");
            let value = pool.utf8(sig).to_be_bytes().to_vec();
            class_attrs.push((name, value));
        }
        if !self.annotations.is_empty() {
            class_attrs.push(annotations_attribute(&self.annotations, &mut pool));
        }
        if let Some((class, method)) = &self.enclosing_method {
            let name = pool.utf8("EnclosingMethod");
            let class_index = pool.class(class);
            let method_index = match method {
                Some((n, d)) => pool.name_and_type(n, d),
                None => 0,
            };
            let mut value = Vec::new();
            value.extend_from_slice(&class_index.to_be_bytes());
            value.extend_from_slice(&method_index.to_be_bytes());
            class_attrs.push((name, value));
        }
        if !self.bootstrap_handles.is_empty() {
            let name = pool.utf8("BootstrapMethods");
            let metafactory = pool.method_handle(
                handle_kind::INVOKE_STATIC,
                "java/lang/invoke/LambdaMetafactory",
                "metafactory",
                "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
            );
            let handles: Vec<u16> = self
                .bootstrap_handles
                .iter()
                .map(|(kind, owner, name, desc)| pool.method_handle(*kind, owner, name, desc))
                .collect();
            let mut value = Vec::new();
            value.extend_from_slice(&(handles.len() as u16).to_be_bytes());
            for handle in handles {
                value.extend_from_slice(&metafactory.to_be_bytes());
                value.extend_from_slice(&1u16.to_be_bytes());
                value.extend_from_slice(&handle.to_be_bytes());
            }
            class_attrs.push((name, value));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // minor
        out.extend_from_slice(&52u16.to_be_bytes()); // major: Java 8
        pool.write(&mut out);
        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&this_class.to_be_bytes());
        out.extend_from_slice(&super_class.unwrap_or(0).to_be_bytes());
        out.extend_from_slice(&(interface_indexes.len() as u16).to_be_bytes());
        for index in interface_indexes {
            out.extend_from_slice(&index.to_be_bytes());
        }
        out.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for field in fields {
            out.extend_from_slice(&field);
        }
        out.extend_from_slice(&(methods.len() as u16).to_be_bytes());
        for method in methods {
            out.extend_from_slice(&method);
        }
        write_attributes(&class_attrs, &mut out);
        out
    }
}

fn annotations_attribute(
    annotations: &[AnnotationSpec],
    pool: &mut ConstPool,
) -> (u16, Vec<u8>) {
    let name = pool.utf8("RuntimeVisibleAnnotations");
    let mut value = Vec::new();
    value.extend_from_slice(&(annotations.len() as u16).to_be_bytes());
    for annotation in annotations {
        write_annotation(annotation, pool, &mut value);
    }
    (name, value)
}

fn code_attribute(code: &Code, pool: &mut ConstPool) -> (u16, Vec<u8>) {
    let name = pool.utf8("Code");
    let mut value = Vec::new();
    value.extend_from_slice(&code.max_stack.to_be_bytes());
    value.extend_from_slice(&code.max_locals.to_be_bytes());
    value.extend_from_slice(&(code.bytes.len() as u32).to_be_bytes());
    value.extend_from_slice(&code.bytes);
    value.extend_from_slice(&(code.exceptions.len() as u16).to_be_bytes());
    for (start, end, handler, catch_type) in &code.exceptions {
        value.extend_from_slice(&start.to_be_bytes());
        value.extend_from_slice(&end.to_be_bytes());
        value.extend_from_slice(&handler.to_be_bytes());
        let catch_index = match catch_type {
            Some(class) => pool.class(class),
            None => 0,
        };
        value.extend_from_slice(&catch_index.to_be_bytes());
    }
    if code.lines.is_empty() {
        value.extend_from_slice(&0u16.to_be_bytes());
    } else {
        value.extend_from_slice(&1u16.to_be_bytes());
        let table_name = pool.utf8("LineNumberTable");
        let mut table = Vec::new();
        table.extend_from_slice(&(code.lines.len() as u16).to_be_bytes());
        for (pc, line) in &code.lines {
            table.extend_from_slice(&pc.to_be_bytes());
            table.extend_from_slice(&line.to_be_bytes());
        }
        value.extend_from_slice(&table_name.to_be_bytes());
        value.extend_from_slice(&(table.len() as u32).to_be_bytes());
        value.extend_from_slice(&table);
    }
    (name, value)
}

fn member_bytes(
    access: u16,
    name: &str,
    descriptor: &str,
    attrs: Vec<(u16, Vec<u8>)>,
    pool: &mut ConstPool,
) -> Vec<u8> {
    let name_index = pool.utf8(name);
    let descriptor_index = pool.utf8(descriptor);
    let mut out = Vec::new();
    out.extend_from_slice(&access.to_be_bytes());
    out.extend_from_slice(&name_index.to_be_bytes());
    out.extend_from_slice(&descriptor_index.to_be_bytes());
    write_attributes(&attrs, &mut out);
    out
}

fn write_attributes(attrs: &[(u16, Vec<u8>)], out: &mut Vec<u8>) {
    out.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
    for (name, value) in attrs {
        out.extend_from_slice(&name.to_be_bytes());
        out.extend_from_slice(&(value.len() as u32).to_be_bytes());
        out.extend_from_slice(value);
    }
}

/// Convenience: a class with a default no-arg constructor calling
/// `java/lang/Object.<init>`.
pub fn simple_class(name: &str) -> ClassBuilder {
    let mut builder = ClassBuilder::new(flags::ACC_PUBLIC, name, "java/lang/Object");
    let mut code = Code::new(1, 1);
    code.line(1);
    code.aload_0();
    code.invokespecial(&mut builder.pool, "java/lang/Object", "<init>", "()V");
    code.return_();
    builder.method(flags::ACC_PUBLIC, "<init>", "()V", Some(code))
}
