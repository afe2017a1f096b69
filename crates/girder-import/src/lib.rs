//! Class-file import and domain-graph construction.
//!
//! The import runs as an explicit pipeline: decode every supplied class
//! file into raw facts, drive the resolution engine to fixed point so
//! every referenced type name is known (decoded on demand through the
//! configured [`ClassLocator`], or stubbed), then assemble the immutable
//! [`JavaClasses`] graph in one pass.
//!
//! The engine is single-threaded by design: the recorder's maps are owned
//! by one session and resolution can discover new work for the very pass
//! that triggered it. The finished graph is immutable and freely shared.

#![forbid(unsafe_code)]

mod assemble;
mod decoder;
mod generics;
mod raw;
mod record;
mod resolution;
mod synthetic;
mod try_catch;

use std::path::Path;

use thiserror::Error;

use girder_graph::JavaClasses;

pub use girder_classpath::{
    locations_for, ClassFileLocation, ClassLocator, ClasspathEntry, ClasspathLocator, NoopLocator,
};

use crate::record::ImportRecord;

#[derive(Debug, Error)]
pub enum ImportError {
    /// A directly requested location could not be read. Locations found
    /// only via lookup during resolution are skipped silently instead.
    #[error("failed to read class file at {uri}")]
    Location {
        uri: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Classpath(#[from] girder_classpath::ClasspathError),
}

static NOOP_LOCATOR: NoopLocator = NoopLocator;

/// One import session configuration. The importer itself is stateless;
/// each `import_*` call runs a fresh session.
pub struct ClassFileImporter<'a> {
    locator: &'a dyn ClassLocator,
}

impl Default for ClassFileImporter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassFileImporter<'static> {
    /// An importer without a locator: every type not directly supplied
    /// resolves to a stub.
    pub fn new() -> Self {
        Self {
            locator: &NOOP_LOCATOR,
        }
    }
}

impl<'a> ClassFileImporter<'a> {
    pub fn with_locator(locator: &'a dyn ClassLocator) -> Self {
        Self { locator }
    }

    /// Import class directories, JAR archives, or single `.class` files.
    pub fn import_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<JavaClasses, ImportError> {
        let mut locations = Vec::new();
        let mut entries = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.extension().is_some_and(|ext| ext == "class") {
                locations.push(ClassFileLocation::from_file(path.to_path_buf()));
            } else {
                entries.push(ClasspathEntry::for_path(path));
            }
        }
        locations.extend(locations_for(&entries)?);
        self.import_locations(&locations)
    }

    /// Import an explicit sequence of class-file locations.
    pub fn import_locations(
        &self,
        locations: &[ClassFileLocation],
    ) -> Result<JavaClasses, ImportError> {
        let mut record = ImportRecord::new();

        for location in locations {
            let bytes = location.open().map_err(|source| ImportError::Location {
                uri: location.uri().to_string(),
                source,
            })?;
            match decoder::import_class_bytes(&mut record, &bytes) {
                Ok(Some(name)) => {
                    tracing::debug!(class = %name, uri = %location.uri(), "decoded class");
                }
                Ok(None) => {
                    tracing::debug!(uri = %location.uri(), "class already known, skipping body");
                }
                Err(error) => {
                    tracing::warn!(uri = %location.uri(), %error,
                        "skipping structurally malformed class file");
                }
            }
        }

        resolution::resolve_universe(&mut record, self.locator);

        Ok(assemble::assemble(record))
    }
}
