use std::io::Write;
use std::path::Path;

use girder_classpath::{
    locations_for, ClassFileLocation, ClassLocator, ClasspathEntry, ClasspathLocator,
};
use girder_test_fixtures::simple_class;

fn write_class(dir: &Path, internal_name: &str) {
    let path = dir.join(format!("{internal_name}.class"));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, simple_class(internal_name).build()).unwrap();
}

fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)], manifest: Option<&str>) {
    let file = std::fs::File::create(path).unwrap();
    let mut jar = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    if let Some(manifest) = manifest {
        jar.start_file("META-INF/MANIFEST.MF", options).unwrap();
        jar.write_all(manifest.as_bytes()).unwrap();
    }
    for (name, bytes) in entries {
        jar.start_file(*name, options).unwrap();
        jar.write_all(bytes).unwrap();
    }
    jar.finish().unwrap();
}

#[test]
fn enumerates_class_directories_recursively() {
    let tmp = tempfile::TempDir::new().unwrap();
    write_class(tmp.path(), "com/example/Foo");
    write_class(tmp.path(), "com/example/deep/Bar");
    std::fs::write(tmp.path().join("com/example/package-info.class"), b"x").unwrap();
    std::fs::write(tmp.path().join("notes.txt"), b"ignored").unwrap();

    let locations =
        locations_for(&[ClasspathEntry::ClassDir(tmp.path().to_path_buf())]).unwrap();

    assert_eq!(locations.len(), 2);
    assert!(locations.iter().all(|l| l.uri().starts_with("file://")));
    for location in &locations {
        let bytes = location.open().unwrap();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
    }
}

#[test]
fn enumerates_jar_entries_and_filters_markers() {
    let tmp = tempfile::TempDir::new().unwrap();
    let jar_path = tmp.path().join("dep.jar");
    write_jar(
        &jar_path,
        &[
            ("com/example/Foo.class", simple_class("com/example/Foo").build()),
            ("module-info.class", vec![1, 2, 3]),
            ("com/example/package-info.class", vec![1, 2, 3]),
            ("README.txt", b"ignored".to_vec()),
        ],
        None,
    );

    let locations = locations_for(&[ClasspathEntry::Jar(jar_path.clone())]).unwrap();

    assert_eq!(locations.len(), 1);
    assert!(locations[0].uri().contains("dep.jar!/com/example/Foo.class"));
    let bytes = locations[0].open().unwrap();
    assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
}

#[test]
fn versioned_entries_require_the_multi_release_manifest() {
    let tmp = tempfile::TempDir::new().unwrap();
    let entries = vec![
        (
            "com/example/Foo.class",
            simple_class("com/example/Foo").build(),
        ),
        (
            "META-INF/versions/9/com/example/Foo.class",
            simple_class("com/example/Foo").build(),
        ),
    ];

    let plain = tmp.path().join("plain.jar");
    write_jar(&plain, &entries, Some("Manifest-Version: 1.0\n"));
    let locations = locations_for(&[ClasspathEntry::Jar(plain)]).unwrap();
    assert_eq!(locations.len(), 1);

    let multi = tmp.path().join("multi.jar");
    write_jar(
        &multi,
        &entries,
        Some("Manifest-Version: 1.0\nMulti-Release: true\n"),
    );
    let locations = locations_for(&[ClasspathEntry::Jar(multi)]).unwrap();
    assert_eq!(locations.len(), 2);
    // Base entries come first so first-seen-wins import keeps the base.
    assert!(!locations[0].uri().contains("META-INF/versions"));
}

#[test]
fn classpath_locator_finds_classes_in_dirs_and_jars() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = tmp.path().join("classes");
    write_class(&dir, "com/example/FromDir");

    let jar_path = tmp.path().join("dep.jar");
    write_jar(
        &jar_path,
        &[(
            "com/example/FromJar.class",
            simple_class("com/example/FromJar").build(),
        )],
        None,
    );

    let locator = ClasspathLocator::new(vec![
        ClasspathEntry::ClassDir(dir),
        ClasspathEntry::Jar(jar_path),
    ]);

    assert!(locator.locate("com.example.FromDir").is_some());
    assert!(locator.locate("com.example.FromJar").is_some());
    assert!(locator.locate("com.example.Absent").is_none());

    let bytes = locator.locate("com.example.FromJar").unwrap().open().unwrap();
    assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
}

#[test]
fn in_memory_locations_roundtrip() {
    let location = ClassFileLocation::from_bytes("mem:test", vec![1u8, 2, 3]);
    assert_eq!(location.uri(), "mem:test");
    assert_eq!(location.open().unwrap(), vec![1, 2, 3]);
}
