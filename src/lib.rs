//! Meta-model ⇄ JSON Schema translation
//!
//! Converts an object-oriented meta-model (packages of classes, enums and
//! primitive types) into a tree of JSON-Schema-like documents extended with a
//! closed modeling vocabulary, and reconstructs the meta-model from such
//! documents.
//!
//! # Example
//!
//! ```
//! use metamodel_schema::{
//!     export_package, import_documents, Class, Classifier, ExportOptions, ImportOptions, Package,
//! };
//!
//! let package = Package::new("coffee", "http://example.com/coffee")
//!     .with_prefix("coffee")
//!     .with_classifier(Classifier::class("Machine", Class::default()));
//!
//! let documents = export_package(&package, &ExportOptions::default()).unwrap();
//! let machine = &documents["Machine.json"];
//! assert_eq!(machine.id.as_deref(), Some("http://example.com/coffee/Machine.json"));
//! assert_eq!(machine.title.as_deref(), Some("Machine"));
//!
//! let documents: Vec<_> = documents.into_values().collect();
//! let packages = import_documents(&documents, &ImportOptions::default()).unwrap();
//! assert_eq!(packages[0].name, "coffee");
//! assert!(packages[0].classifier("Machine").unwrap().is_class());
//! ```
//!
//! # Identifiers
//!
//! | Model address | Schema identifier |
//! |---------------|-------------------|
//! | `<nsURI>` + `Name` | `<nsURI>/Name.json` |
//! | `http://www.eclipse.org/emf/2002/Ecore#//EInt` | `https://metamodel-schema.dev/draft/1/types/EInt.json` |
//! | reference `owner` on `Name` | `<nsURI>/Name.json#/owner` |
//!
//! # Unresolved references
//!
//! Identifiers that name no input document and no built-in type import as
//! [`ClassifierRef::Unresolved`] proxies rather than errors. Load the
//! defining packages later and re-resolve with [`PackageIndex`].

#![recursion_limit = "256"]

mod error;
mod export;
mod identifier;
mod import;
mod linter;
mod loader;
mod model;
mod registry;
mod schema;
mod types;
mod validator;

pub use error::{LoadError, SchemaError, TransformError, ValidateError};
pub use export::{export_class, export_classifier, export_enum, export_package, export_primitive};
pub use identifier::{
    classifier_id, identifier_to_proxy, namespace_of, proxy_uri_to_schema_id,
    reference_id, schema_id, schema_id_to_proxy_uri, split_reference_id,
};
pub use import::{import_documents, import_primitive, SchemaImporter, Shells};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{
    collect_document_files, is_url, load_document, load_document_auto, load_document_str,
    load_documents, load_package, load_value, save_packages, write_documents,
};
pub use model::{
    Class, Classifier, ClassifierKind, ClassifierRef, Enum, EnumLiteral, FeatureKind, FeatureRef,
    GenericType, Multiplicity, Operation, Package, Parameter, PrimitiveType, StructuralFeature,
    Supertypes, TypeArgument, TypedElement, UpperBound,
};
pub use registry::{PackageIndex, Registry, Slot};
pub use schema::{MethodSchema, OneOrMany, SchemaNode, SimpleType, TypeExpr};
pub use types::{
    builtin_package, instance_type_for_schema, schema_for_instance_type, ExportOptions,
    ImportOptions, BUILTIN_NS_PREFIX, BUILTIN_NS_URI, SCHEMA_DIALECT, SCHEMA_ID_PREFIX,
    TYPES_ID_PREFIX,
};
pub use validator::{compile_metaschema, metaschema, validate_document, validate_with};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
