//! External constraint mappings.
//!
//! Mapping documents are the external counterpart of annotations: JSON files
//! that declare constraints for types without touching the types themselves.
//!
//! ```json
//! {
//!   "beans": [
//!     {
//!       "type": "Address",
//!       "id": "address",
//!       "ignoreAnnotations": true,
//!       "properties": [
//!         {
//!           "name": "zip",
//!           "type": "String",
//!           "constraints": [
//!             { "constraint": "Size", "attributes": { "max": 5 } }
//!           ]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! [`MappingLoader`] reads every `*.json` file in a directory through a
//! [`FileSystem`] and accumulates errors across files.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{
    AccessKind, Annotation, BeanDeclaration, ConstraintDeclaration, DeclarationRegistry,
    PropertyDeclaration,
};
use crate::constraint::ConstraintAttributes;
use crate::error::ConfigError;
use crate::types::{TypeKey, TypeRef};

/// A parsed mapping document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MappingDocument {
    /// Default for beans that do not set `ignoreAnnotations` themselves.
    #[serde(default)]
    pub ignore_annotations: bool,
    /// Bean mappings.
    #[serde(default)]
    pub beans: Vec<BeanMapping>,
}

/// Mapping of one type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BeanMapping {
    /// The mapped type.
    #[serde(rename = "type")]
    pub bean_type: TypeKey,
    /// Optional lookup id.
    #[serde(default)]
    pub id: Option<String>,
    /// Overrides the document default.
    #[serde(default)]
    pub ignore_annotations: Option<bool>,
    /// Group sequence (redefined default on classes).
    #[serde(default)]
    pub group_sequence: Option<Vec<TypeKey>>,
    /// Class-level constraints.
    #[serde(default)]
    pub constraints: Vec<ConstraintMapping>,
    /// Property mappings.
    #[serde(default)]
    pub properties: Vec<PropertyMapping>,
}

/// Mapping of one property.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyMapping {
    /// Property name.
    pub name: String,
    /// Field or getter.
    #[serde(default)]
    pub access: AccessKind,
    /// Declared type, `Object` when omitted.
    #[serde(rename = "type", default = "TypeRef::object")]
    pub declared_type: TypeRef,
    /// Cascade into the property value.
    #[serde(default)]
    pub cascade: bool,
    /// Constraints.
    #[serde(default)]
    pub constraints: Vec<ConstraintMapping>,
}

/// Mapping of one constraint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConstraintMapping {
    /// Constraint name.
    pub constraint: String,
    /// Attribute values.
    #[serde(default)]
    pub attributes: ConstraintAttributes,
    /// Groups.
    #[serde(default)]
    pub groups: Vec<TypeKey>,
    /// Payload classifiers.
    #[serde(default)]
    pub payload: Vec<TypeKey>,
    /// Message template override.
    #[serde(default)]
    pub message: Option<String>,
}

impl From<ConstraintMapping> for ConstraintDeclaration {
    fn from(m: ConstraintMapping) -> Self {
        ConstraintDeclaration {
            constraint: m.constraint,
            attributes: m.attributes,
            groups: m.groups,
            payload: m.payload,
            message: m.message,
        }
    }
}

impl MappingDocument {
    /// Parses a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Converts the document into bean declarations.
    pub fn into_declarations(self) -> Vec<BeanDeclaration> {
        let default_ignore = self.ignore_annotations;
        self.beans
            .into_iter()
            .map(|bean| bean.into_declaration(default_ignore))
            .collect()
    }

    /// Converts the document into a declaration registry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateDeclaration` if a type is mapped twice.
    pub fn into_registry(self) -> Result<DeclarationRegistry, ConfigError> {
        let registry = DeclarationRegistry::new();
        for decl in self.into_declarations() {
            registry.declare(decl)?;
        }
        Ok(registry)
    }
}

impl BeanMapping {
    fn into_declaration(self, default_ignore: bool) -> BeanDeclaration {
        BeanDeclaration {
            bean_type: self.bean_type,
            id: self.id,
            class_annotations: self
                .constraints
                .into_iter()
                .map(|c| Annotation::Constraint(c.into()))
                .collect(),
            properties: self
                .properties
                .into_iter()
                .map(|p| PropertyDeclaration {
                    name: p.name,
                    access: p.access,
                    declared_type: p.declared_type,
                    annotations: p
                        .constraints
                        .into_iter()
                        .map(|c| Annotation::Constraint(c.into()))
                        .collect(),
                    cascade: p.cascade,
                })
                .collect(),
            group_sequence: self.group_sequence,
            ignore_annotations: self.ignore_annotations.unwrap_or(default_ignore),
        }
    }
}

/// Abstraction for filesystem operations.
///
/// Enables loading mappings from mock filesystems in tests.
pub trait FileSystem: Send + Sync {
    /// The error type for filesystem operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the contents of a file as a string.
    fn read_file(&self, path: &Path) -> Result<String, Self::Error>;

    /// Lists all entries in a directory.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, Self::Error>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    type Error = std::io::Error;

    fn read_file(&self, path: &Path) -> Result<String, Self::Error> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, Self::Error> {
        let mut entries = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        Ok(entries)
    }
}

/// Errors that can occur while loading mappings.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// IO error reading a file or directory.
    #[error("IO error reading {0}: {1}")]
    Io(PathBuf, Box<dyn std::error::Error + Send + Sync>),

    /// The file is not a valid mapping document.
    #[error("parse error in {0}: {1}")]
    Parse(PathBuf, serde_json::Error),

    /// The mapping conflicts with previously loaded declarations.
    #[error("mapping error in {0}: {1}")]
    Declaration(PathBuf, ConfigError),

    /// Multiple errors occurred.
    #[error("multiple mapping errors: {0:?}")]
    Multiple(Vec<MappingError>),
}

/// Loads mapping documents from a directory.
pub struct MappingLoader<F: FileSystem = StdFileSystem> {
    fs: F,
}

impl MappingLoader<StdFileSystem> {
    /// Creates a loader reading from the real filesystem.
    pub fn new() -> Self {
        Self { fs: StdFileSystem }
    }
}

impl Default for MappingLoader<StdFileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> MappingLoader<F> {
    /// Creates a loader over a custom filesystem.
    pub fn with_filesystem(fs: F) -> Self {
        Self { fs }
    }

    /// Loads every `*.json` file in `dir` into one registry.
    ///
    /// Every file is attempted; all errors are reported together.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<DeclarationRegistry, MappingError> {
        let dir = dir.as_ref();
        let files = self
            .fs
            .read_dir(dir)
            .map_err(|e| MappingError::Io(dir.to_path_buf(), Box::new(e)))?;

        let registry = DeclarationRegistry::new();
        let mut errors = Vec::new();

        for file in files {
            if file.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Err(e) = self.load_file_into(&file, &registry) {
                errors.push(e);
            }
        }

        debug!(
            dir = %dir.display(),
            beans = registry.len(),
            errors = errors.len(),
            "loaded constraint mappings"
        );

        match errors.len() {
            0 => Ok(registry),
            1 => Err(errors.remove(0)),
            _ => Err(MappingError::Multiple(errors)),
        }
    }

    /// Loads one mapping file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeclarationRegistry, MappingError> {
        let registry = DeclarationRegistry::new();
        self.load_file_into(path.as_ref(), &registry)?;
        Ok(registry)
    }

    fn load_file_into(
        &self,
        path: &Path,
        registry: &DeclarationRegistry,
    ) -> Result<(), MappingError> {
        let content = self
            .fs
            .read_file(path)
            .map_err(|e| MappingError::Io(path.to_path_buf(), Box::new(e)))?;

        let document = MappingDocument::from_json(&content)
            .map_err(|e| MappingError::Parse(path.to_path_buf(), e))?;

        for decl in document.into_declarations() {
            registry
                .declare(decl)
                .map_err(|e| MappingError::Declaration(path.to_path_buf(), e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::DeclarationSource;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct MockFileSystemError(String);

    impl std::fmt::Display for MockFileSystemError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for MockFileSystemError {}

    #[derive(Default)]
    struct MockFileSystem {
        files: HashMap<PathBuf, String>,
    }

    impl MockFileSystem {
        fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
            self.files.insert(path.into(), content.into());
        }
    }

    impl FileSystem for MockFileSystem {
        type Error = MockFileSystemError;

        fn read_file(&self, path: &Path) -> Result<String, Self::Error> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| MockFileSystemError(format!("not found: {}", path.display())))
        }

        fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, Self::Error> {
            let mut entries: Vec<_> = self
                .files
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect();
            entries.sort();
            Ok(entries)
        }
    }

    const ADDRESS: &str = r#"{
        "beans": [{
            "type": "Address",
            "id": "address",
            "ignoreAnnotations": true,
            "properties": [{
                "name": "zip",
                "type": "String",
                "constraints": [
                    {"constraint": "NotNull"},
                    {"constraint": "Size", "attributes": {"max": 5}, "groups": ["Strict"]}
                ]
            }]
        }]
    }"#;

    #[test]
    fn test_document_into_registry() {
        let registry = MappingDocument::from_json(ADDRESS)
            .unwrap()
            .into_registry()
            .unwrap();
        let decl = registry.bean_declaration(&TypeKey::from("Address")).unwrap();

        assert!(decl.ignore_annotations);
        assert_eq!(decl.id.as_deref(), Some("address"));
        let zip = &decl.properties[0];
        assert_eq!(zip.declared_type, TypeRef::named("String"));
        assert_eq!(zip.annotations.len(), 2);
        let size = &zip.annotations[1].declarations()[0];
        assert_eq!(size.attributes.int("max"), Some(5));
        assert_eq!(size.groups, vec![TypeKey::from("Strict")]);
    }

    #[test]
    fn test_document_default_ignore_and_generic_types() {
        let doc = MappingDocument::from_json(
            r#"{
                "ignoreAnnotations": true,
                "beans": [{
                    "type": "Person",
                    "properties": [{
                        "name": "addresses",
                        "access": "getter",
                        "type": "Map<String, Address>",
                        "cascade": true
                    }]
                }]
            }"#,
        )
        .unwrap();
        let decls = doc.into_declarations();
        assert!(decls[0].ignore_annotations);
        let prop = &decls[0].properties[0];
        assert_eq!(prop.access, AccessKind::Getter);
        assert!(prop.cascade);
        assert_eq!(prop.declared_type.to_string(), "Map<String, Address>");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(MappingDocument::from_json(r#"{"beens": []}"#).is_err());
    }

    #[test]
    fn test_load_dir() {
        let mut fs = MockFileSystem::default();
        fs.add_file("/mappings/address.json", ADDRESS);
        fs.add_file("/mappings/readme.txt", "ignored");
        fs.add_file(
            "/mappings/order.json",
            r#"{"beans": [{"type": "Order", "groupSequence": ["Order", "Strict"]}]}"#,
        );

        let registry = MappingLoader::with_filesystem(fs)
            .load_dir("/mappings")
            .unwrap();
        assert_eq!(registry.len(), 2);
        let order = registry.bean_declaration(&TypeKey::from("Order")).unwrap();
        assert_eq!(
            order.group_sequence,
            Some(vec![TypeKey::from("Order"), TypeKey::from("Strict")])
        );
    }

    #[test]
    fn test_load_dir_accumulates_errors() {
        let mut fs = MockFileSystem::default();
        fs.add_file("/mappings/a.json", "{ invalid json }");
        fs.add_file("/mappings/b.json", ADDRESS);
        fs.add_file("/mappings/c.json", ADDRESS);
        fs.add_file("/mappings/d.json", r#"{"beans": 3}"#);

        let err = MappingLoader::with_filesystem(fs)
            .load_dir("/mappings")
            .unwrap_err();
        match err {
            MappingError::Multiple(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(matches!(errors[0], MappingError::Parse(..)));
                assert!(matches!(
                    errors[1],
                    MappingError::Declaration(_, ConfigError::DuplicateDeclaration(_))
                ));
                assert!(matches!(errors[2], MappingError::Parse(..)));
            }
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_load_file_missing() {
        let loader = MappingLoader::with_filesystem(MockFileSystem::default());
        assert!(matches!(
            loader.load_file("/nope.json"),
            Err(MappingError::Io(..))
        ));
    }
}
