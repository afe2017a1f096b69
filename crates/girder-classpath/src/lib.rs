//! Input-location enumeration and class location.
//!
//! The import engine itself never touches the filesystem; it consumes
//! [`ClassFileLocation`]s (a stable URI plus a way to open the bytes) and,
//! during resolution, asks a [`ClassLocator`] for the location of a class
//! it has not seen. This crate provides both for class directories and JAR
//! archives.

#![forbid(unsafe_code)]

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClasspathEntry {
    ClassDir(PathBuf),
    Jar(PathBuf),
}

impl ClasspathEntry {
    /// Classify a path: an existing directory is a class directory,
    /// anything else is treated as an archive.
    pub fn for_path(path: &Path) -> Self {
        if path.is_dir() {
            ClasspathEntry::ClassDir(path.to_path_buf())
        } else {
            ClasspathEntry::Jar(path.to_path_buf())
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ClasspathEntry::ClassDir(p) | ClasspathEntry::Jar(p) => p,
        }
    }
}

/// One class file that can be opened on demand, identified by a stable URI
/// used in diagnostics.
#[derive(Clone, Debug)]
pub struct ClassFileLocation {
    uri: String,
    source: LocationSource,
}

#[derive(Clone, Debug)]
enum LocationSource {
    File(PathBuf),
    ZipEntry { archive: PathBuf, entry: String },
    Bytes(Arc<[u8]>),
}

impl ClassFileLocation {
    pub fn from_file(path: PathBuf) -> Self {
        Self {
            uri: format!("file://{}", path.display()),
            source: LocationSource::File(path),
        }
    }

    pub fn from_zip_entry(archive: PathBuf, entry: String) -> Self {
        Self {
            uri: format!("jar:file://{}!/{entry}", archive.display()),
            source: LocationSource::ZipEntry { archive, entry },
        }
    }

    /// An in-memory class file; used by tests and embedded byte sources.
    pub fn from_bytes(uri: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            uri: uri.into(),
            source: LocationSource::Bytes(bytes.into()),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn open(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            LocationSource::File(path) => std::fs::read(path),
            LocationSource::ZipEntry { archive, entry } => {
                let file = std::fs::File::open(archive)?;
                let mut zip = zip::ZipArchive::new(file).map_err(zip_to_io)?;
                let mut entry = zip.by_name(entry).map_err(zip_to_io)?;
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
            LocationSource::Bytes(bytes) => Ok(bytes.to_vec()),
        }
    }
}

fn zip_to_io(err: zip::result::ZipError) -> std::io::Error {
    match err {
        zip::result::ZipError::Io(io) => io,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
    }
}

/// Marker classes that never contribute structure to the graph.
fn is_marker_entry(entry_name: &str) -> bool {
    entry_name == "module-info.class"
        || entry_name == "package-info.class"
        || entry_name.ends_with("/package-info.class")
        || entry_name.ends_with("/module-info.class")
}

/// Enumerate every class-file location reachable from the given entries.
///
/// Base JAR entries come before `META-INF/versions/` entries of
/// multi-release JARs, so the importer's first-seen-wins skipping keeps
/// the base class.
pub fn locations_for(entries: &[ClasspathEntry]) -> Result<Vec<ClassFileLocation>, ClasspathError> {
    let mut out = Vec::new();
    for entry in entries {
        match entry {
            ClasspathEntry::ClassDir(dir) => enumerate_class_dir(dir, &mut out),
            ClasspathEntry::Jar(path) => enumerate_jar(path, &mut out)?,
        }
    }
    Ok(out)
}

fn enumerate_class_dir(dir: &Path, out: &mut Vec<ClassFileLocation>) {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension() == Some(OsStr::new("class")))
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    for path in paths {
        let rel = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        if is_marker_entry(&rel) {
            continue;
        }
        out.push(ClassFileLocation::from_file(path));
    }
}

fn enumerate_jar(path: &Path, out: &mut Vec<ClassFileLocation>) -> Result<(), ClasspathError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let multi_release = jar_is_multi_release(&mut archive);

    let mut base = Vec::new();
    let mut versioned = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().to_owned();
        if !name.ends_with(".class") || is_marker_entry(&name) {
            continue;
        }
        if let Some(rest) = name.strip_prefix("META-INF/") {
            let versions_entry =
                multi_release && rest.strip_prefix("versions/").is_some_and(is_versioned_class);
            if versions_entry {
                versioned.push(name);
            }
            continue;
        }
        base.push(name);
    }
    base.sort();
    versioned.sort();

    for entry in base.into_iter().chain(versioned) {
        out.push(ClassFileLocation::from_zip_entry(path.to_path_buf(), entry));
    }
    Ok(())
}

fn is_versioned_class(rest: &str) -> bool {
    match rest.split_once('/') {
        Some((version, _)) => version.parse::<u32>().is_ok(),
        None => false,
    }
}

fn jar_is_multi_release<R: Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>) -> bool {
    let mut file = match archive.by_name("META-INF/MANIFEST.MF") {
        Ok(file) => file,
        Err(_) => return false,
    };
    let mut manifest = String::new();
    if file.read_to_string(&mut manifest).is_err() {
        return false;
    }
    manifest_is_multi_release(&manifest)
}

fn manifest_is_multi_release(manifest: &str) -> bool {
    for line in manifest.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("Multi-Release") {
            return value.trim().eq_ignore_ascii_case("true");
        }
    }
    false
}

/// Pluggable strategy for finding the bytes of a class the importer has not
/// seen: given a binary name, optionally return a location the importer
/// will then decode. Yielding `None` makes the importer fall back to a
/// stub.
pub trait ClassLocator {
    fn locate(&self, binary_name: &str) -> Option<ClassFileLocation>;
}

/// Locator that never finds anything; every unknown class becomes a stub.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLocator;

impl ClassLocator for NoopLocator {
    fn locate(&self, _binary_name: &str) -> Option<ClassFileLocation> {
        None
    }
}

/// Locates classes in a fixed set of classpath entries.
#[derive(Debug, Clone, Default)]
pub struct ClasspathLocator {
    entries: Vec<ClasspathEntry>,
}

impl ClasspathLocator {
    pub fn new(entries: Vec<ClasspathEntry>) -> Self {
        Self { entries }
    }
}

impl ClassLocator for ClasspathLocator {
    fn locate(&self, binary_name: &str) -> Option<ClassFileLocation> {
        let rel = format!("{}.class", binary_name.replace('.', "/"));
        for entry in &self.entries {
            match entry {
                ClasspathEntry::ClassDir(dir) => {
                    let candidate = dir.join(&rel);
                    if candidate.is_file() {
                        return Some(ClassFileLocation::from_file(candidate));
                    }
                }
                ClasspathEntry::Jar(path) => {
                    let Ok(file) = std::fs::File::open(path) else {
                        continue;
                    };
                    let Ok(mut archive) = zip::ZipArchive::new(file) else {
                        continue;
                    };
                    if archive.by_name(&rel).is_ok() {
                        return Some(ClassFileLocation::from_zip_entry(
                            path.clone(),
                            rel.clone(),
                        ));
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_entries_are_filtered() {
        assert!(is_marker_entry("module-info.class"));
        assert!(is_marker_entry("com/example/package-info.class"));
        assert!(!is_marker_entry("com/example/Foo.class"));
    }

    #[test]
    fn manifest_flag_detection() {
        assert!(manifest_is_multi_release(
            "Manifest-Version: 1.0\nMulti-Release: true\n"
        ));
        assert!(!manifest_is_multi_release("Manifest-Version: 1.0\n"));
        assert!(!manifest_is_multi_release("Multi-Release: false\n"));
    }

    #[test]
    fn versioned_entry_detection() {
        assert!(is_versioned_class("9/com/example/Foo.class"));
        assert!(!is_versioned_class("not-a-number/Foo.class"));
        assert!(!is_versioned_class("Foo.class"));
    }
}
