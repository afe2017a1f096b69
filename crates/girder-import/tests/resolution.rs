//! On-demand resolution through a class locator.

use std::cell::RefCell;
use std::collections::HashMap;

use girder_import::{ClassFileImporter, ClassFileLocation, ClassLocator};
use girder_test_fixtures::{flags, simple_class, ClassBuilder, Code};

/// Locator over an in-memory map, counting lookups.
struct MapLocator {
    classes: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl MapLocator {
    fn new(classes: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            classes: classes
                .into_iter()
                .map(|(name, bytes)| (name.to_string(), bytes))
                .collect(),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl ClassLocator for MapLocator {
    fn locate(&self, binary_name: &str) -> Option<ClassFileLocation> {
        self.requests.borrow_mut().push(binary_name.to_string());
        self.classes.get(binary_name).map(|bytes| {
            ClassFileLocation::from_bytes(format!("mem:{binary_name}"), bytes.clone())
        })
    }
}

#[test]
fn superclasses_are_chased_transitively() {
    // A extends B extends C; only A is supplied directly.
    let c = simple_class("com/example/C").build();
    let b = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/B", "com/example/C").build();
    let a = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/A", "com/example/B").build();

    let locator = MapLocator::new(vec![("com.example.B", b), ("com.example.C", c)]);
    let classes = ClassFileImporter::with_locator(&locator)
        .import_locations(&[ClassFileLocation::from_bytes("mem:A", a)])
        .unwrap();

    let b_class = classes.get("com.example.B").expect("B resolved");
    assert!(!b_class.stub);
    let c_class = classes.get("com.example.C").expect("C resolved");
    assert!(!c_class.stub);
    assert_eq!(c_class.superclass.as_deref(), Some("java.lang.Object"));

    let chain: Vec<String> = classes
        .superclass_chain("com.example.A")
        .map(|class| class.name())
        .collect();
    assert_eq!(chain, vec!["com.example.B", "com.example.C", "java.lang.Object"]);
}

#[test]
fn located_class_is_decoded_with_members() {
    let dep = simple_class("com/example/Dep")
        .method(flags::ACC_PUBLIC, "provide", "()I", None)
        .build();

    let mut builder = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/User", "java/lang/Object");
    let mut code = Code::new(1, 2);
    code.aload_0();
    code.invokevirtual(&mut builder.pool, "com/example/Dep", "provide", "()I");
    code.pop();
    code.return_();
    let user = builder
        .method(flags::ACC_PUBLIC, "consume", "()V", Some(code))
        .build();

    let locator = MapLocator::new(vec![("com.example.Dep", dep)]);
    let classes = ClassFileImporter::with_locator(&locator)
        .import_locations(&[ClassFileLocation::from_bytes("mem:User", user)])
        .unwrap();

    let dep_class = classes.get("com.example.Dep").unwrap();
    assert!(!dep_class.stub);
    assert!(dep_class.method("provide", "()I").is_some());
}

#[test]
fn locator_miss_falls_back_to_stub() {
    let builder = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/Solo", "java/lang/Object")
        .field(flags::ACC_PRIVATE, "gone", "Lcom/example/Gone;");
    let mut code = Code::new(1, 1);
    code.return_();
    let solo = builder
        .method(flags::ACC_PUBLIC, "noop", "()V", Some(code))
        .build();

    let locator = MapLocator::new(vec![]);
    let classes = ClassFileImporter::with_locator(&locator)
        .import_locations(&[ClassFileLocation::from_bytes("mem:Solo", solo)])
        .unwrap();

    assert!(locator.requests.borrow().contains(&"com.example.Gone".to_string()));
    assert!(classes.get("com.example.Gone").unwrap().stub);
}

#[test]
fn member_types_of_directly_imported_classes_resolve_in_one_pass() {
    // User has a field of type Direct; Direct has a field of type
    // Transitive. The member-type category gets one pass: Direct is
    // decoded, Transitive is only stubbed.
    let transitive = simple_class("com/example/Transitive").build();
    let direct = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/Direct", "java/lang/Object")
        .field(flags::ACC_PRIVATE, "next", "Lcom/example/Transitive;")
        .build();
    let user = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/User", "java/lang/Object")
        .field(flags::ACC_PRIVATE, "direct", "Lcom/example/Direct;")
        .build();

    let locator = MapLocator::new(vec![
        ("com.example.Direct", direct),
        ("com.example.Transitive", transitive),
    ]);
    let classes = ClassFileImporter::with_locator(&locator)
        .import_locations(&[ClassFileLocation::from_bytes("mem:User", user)])
        .unwrap();

    assert!(!classes.get("com.example.Direct").unwrap().stub);
    let transitive_class = classes.get("com.example.Transitive").unwrap();
    assert!(
        transitive_class.stub,
        "member types of classes decoded during resolution stay within the pass budget"
    );
}

#[test]
fn hierarchy_of_member_type_classes_is_still_completed() {
    // Even when a class is pulled in via the bounded member-type pass, its
    // superclasses resolve through the unbounded hierarchy category.
    let base = simple_class("com/example/Base").build();
    let direct = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/Direct", "com/example/Base")
        .build();
    let user = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/User", "java/lang/Object")
        .field(flags::ACC_PRIVATE, "direct", "Lcom/example/Direct;")
        .build();

    let locator = MapLocator::new(vec![
        ("com.example.Direct", direct),
        ("com.example.Base", base),
    ]);
    let classes = ClassFileImporter::with_locator(&locator)
        .import_locations(&[ClassFileLocation::from_bytes("mem:User", user)])
        .unwrap();

    assert!(!classes.get("com.example.Direct").unwrap().stub);
    assert!(!classes.get("com.example.Base").unwrap().stub);
}

#[test]
fn annotation_types_resolve_with_defaults_applied() {
    use girder_graph::AnnotationValue;
    use girder_test_fixtures::{AnnotationSpec, ValueSpec};

    // @Marker(name = "set") where Marker declares name() and size()
    // with a default for size.
    let marker = ClassBuilder::new(
        flags::ACC_PUBLIC | flags::ACC_INTERFACE | flags::ACC_ABSTRACT | flags::ACC_ANNOTATION,
        "com/example/Marker",
        "java/lang/Object",
    )
    .method_with(
        flags::ACC_PUBLIC | flags::ACC_ABSTRACT,
        "name",
        "()Ljava/lang/String;",
        None,
        None,
        Vec::new(),
        None,
    )
    .method_with(
        flags::ACC_PUBLIC | flags::ACC_ABSTRACT,
        "size",
        "()I",
        None,
        None,
        Vec::new(),
        Some(ValueSpec::Int(42)),
    )
    .build();

    let annotated = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/Marked", "java/lang/Object")
        .annotation(
            AnnotationSpec::new("Lcom/example/Marker;")
                .element("name", ValueSpec::String("set".to_string())),
        )
        .build();

    let locator = MapLocator::new(vec![("com.example.Marker", marker)]);
    let classes = ClassFileImporter::with_locator(&locator)
        .import_locations(&[ClassFileLocation::from_bytes("mem:Marked", annotated)])
        .unwrap();

    let marked = classes.get("com.example.Marked").unwrap();
    assert_eq!(marked.annotations.len(), 1);
    let annotation = &marked.annotations[0];
    assert_eq!(annotation.type_name, "com.example.Marker");
    assert_eq!(
        annotation.property("name"),
        Some(&AnnotationValue::String("set".to_string()))
    );
    assert_eq!(annotation.property("size"), Some(&AnnotationValue::Int(42)));
}

#[test]
fn generic_member_types_are_finished_against_the_universe() {
    use girder_graph::{JavaType, WildcardBound};

    let holder = ClassBuilder::new(flags::ACC_PUBLIC, "com/example/Holder", "java/lang/Object")
        .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
        .field_with(
            flags::ACC_PRIVATE,
            "items",
            "Ljava/util/List;",
            Some("Ljava/util/List<+TT;>;"),
            Vec::new(),
        )
        .build();

    let classes = ClassFileImporter::new()
        .import_locations(&[ClassFileLocation::from_bytes("mem:Holder", holder)])
        .unwrap();

    let holder_class = classes.get("com.example.Holder").unwrap();
    assert_eq!(holder_class.type_parameters.len(), 1);
    assert_eq!(holder_class.type_parameters[0].name, "T");

    let field = holder_class.field("items").unwrap();
    assert_eq!(
        field.field_type,
        JavaType::Parameterized {
            raw: "java.util.List".to_string(),
            arguments: vec![JavaType::Wildcard(WildcardBound::Extends(Box::new(
                JavaType::TypeVariable("T".to_string())
            )))],
        }
    );
    assert!(classes.contains("java.util.List"));
}
