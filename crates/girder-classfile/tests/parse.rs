use girder_classfile::{ClassFile, FieldOp, InstructionKind, InvokeKind};
use girder_test_fixtures::{flags, handle_kind, simple_class, ClassBuilder, Code};

#[test]
fn parses_header_members_and_interfaces() {
    let bytes = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/Foo", "java/lang/Object")
        .interface("java/io/Serializable")
        .field(flags::ACC_PRIVATE, "count", "I")
        .method(flags::ACC_PUBLIC | flags::ACC_ABSTRACT, "run", "()V", None)
        .build();

    let class = ClassFile::parse(&bytes).unwrap();
    assert_eq!(class.this_class, "com/example/Foo");
    assert_eq!(class.super_class.as_deref(), Some("java/lang/Object"));
    assert_eq!(class.interfaces, vec!["java/io/Serializable"]);
    assert_eq!(class.fields.len(), 1);
    assert_eq!(class.fields[0].name, "count");
    assert_eq!(class.fields[0].descriptor, "I");
    assert_eq!(class.methods.len(), 1);
    assert!(class.methods[0].code.is_none());
}

#[test]
fn parse_filtered_skips_known_names_after_the_header() {
    let bytes = simple_class("com/example/Foo").build();

    let skipped = ClassFile::parse_filtered(&bytes, |name| {
        assert_eq!(name, "com/example/Foo");
        false
    })
    .unwrap();
    assert!(skipped.is_none());

    let kept = ClassFile::parse_filtered(&bytes, |_| true).unwrap();
    assert!(kept.is_some());
}

#[test]
fn decodes_instructions_of_interest_with_lines_and_exceptions() {
    let mut builder = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/Body", "java/lang/Object");
    let mut code = Code::new(3, 2);
    code.line(10);
    code.aload_0(); // pc 0
    code.getfield(&mut builder.pool, "com/example/Body", "state", "I"); // pc 1
    code.pop(); // pc 4
    code.line(11);
    code.aload_0(); // pc 5
    code.invokevirtual(&mut builder.pool, "com/example/Body", "helper", "()V"); // pc 6
    code.ldc_class(&mut builder.pool, "com/example/Other"); // pc 9
    code.pop(); // pc 12
    code.instanceof(&mut builder.pool, "java/lang/Comparable"); // requires a ref; structural only
    code.return_();
    code.exception(0, 5, 9, Some("java/io/IOException"));
    let bytes = builder
        .method(flags::ACC_PUBLIC, "work", "()V", Some(code))
        .build();

    let class = ClassFile::parse(&bytes).unwrap();
    let code = class.methods[0].code.as_ref().unwrap();

    let kinds: Vec<&InstructionKind> = code.instructions.iter().map(|i| &i.kind).collect();
    assert!(matches!(kinds[0],
        InstructionKind::FieldAccess { op: FieldOp::GetField, owner, name, .. }
            if owner == "com/example/Body" && name == "state"));
    assert!(matches!(kinds[1],
        InstructionKind::Invoke { kind: InvokeKind::Virtual, name, .. } if name == "helper"));
    assert!(matches!(kinds[2],
        InstructionKind::ClassConstant { class } if class == "com/example/Other"));
    assert!(matches!(kinds[3],
        InstructionKind::Instanceof { class } if class == "java/lang/Comparable"));

    assert_eq!(code.line_at(0), 10);
    assert_eq!(code.line_at(6), 11);
    assert_eq!(code.exception_table.len(), 1);
    assert_eq!(
        code.exception_table[0].catch_type.as_deref(),
        Some("java/io/IOException")
    );
}

#[test]
fn resolves_invokedynamic_through_bootstrap_methods() {
    let mut builder = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/Indy", "java/lang/Object");
    let bsm = builder.bootstrap_handle(
        handle_kind::INVOKE_STATIC,
        "com/example/Indy",
        "lambda$go$0",
        "()V",
    );
    let mut code = Code::new(1, 1);
    code.invokedynamic(&mut builder.pool, bsm, "run", "()Ljava/lang/Runnable;");
    code.pop();
    code.return_();
    let bytes = builder
        .method(flags::ACC_PUBLIC, "go", "()V", Some(code))
        .build();

    let class = ClassFile::parse(&bytes).unwrap();
    let code = class.methods[0].code.as_ref().unwrap();
    let indy = code
        .instructions
        .iter()
        .find_map(|i| match &i.kind {
            InstructionKind::InvokeDynamic { bootstrap_index, name, .. } => {
                Some((*bootstrap_index, name.clone()))
            }
            _ => None,
        })
        .expect("invokedynamic decoded");
    assert_eq!(indy.1, "run");

    let handle = class.invokedynamic_handle(indy.0).expect("handle resolved");
    assert_eq!(handle.owner, "com/example/Indy");
    assert_eq!(handle.name, "lambda$go$0");
    assert_eq!(handle.reference_kind, handle_kind::INVOKE_STATIC);
}

#[test]
fn truncated_bytes_are_rejected() {
    let mut bytes = simple_class("com/example/Foo").build();
    bytes.truncate(bytes.len() / 2);
    assert!(ClassFile::parse(&bytes).is_err());

    assert!(ClassFile::parse(&[0, 1, 2, 3]).is_err());
}
