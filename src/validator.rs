//! Closed-vocabulary validation of schema documents.
//!
//! The meta-schema lists every keyword a document may use, recursively, with
//! `additionalProperties: false` at each level. Logical JSON-Schema semantics
//! (whether an instance would satisfy the document) are not checked.

use serde_json::{json, Value};

use crate::error::{SchemaError, ValidateError};
use crate::types::SCHEMA_DIALECT;

/// The meta-schema describing the closed document vocabulary.
pub fn metaschema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": SCHEMA_DIALECT,
        "title": "Meta-model schema document",
        "$ref": "#/$defs/node",
        "$defs": {
            "flag": { "type": "boolean" },
            "count": { "type": "integer", "minimum": 0 },
            "simpleType": {
                "enum": ["array", "boolean", "integer", "null", "number", "object", "string"]
            },
            "typeExpr": {
                "anyOf": [
                    { "$ref": "#/$defs/simpleType" },
                    {
                        "type": "array",
                        "items": { "$ref": "#/$defs/simpleType" },
                        "minItems": 1,
                        "maxItems": 2,
                        "uniqueItems": true
                    }
                ]
            },
            "nodeMap": {
                "type": "object",
                "additionalProperties": { "$ref": "#/$defs/node" }
            },
            "stringList": {
                "type": "array",
                "items": { "type": "string" }
            },
            "method": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "parameters": {
                        "type": "array",
                        "items": { "$ref": "#/$defs/node" }
                    },
                    "returnType": { "$ref": "#/$defs/node" }
                }
            },
            "node": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "$id": { "type": "string" },
                    "$schema": { "type": "string" },
                    "$ref": { "type": "string" },
                    "$dynamicAnchor": { "type": "string" },
                    "$comment": { "type": "string" },
                    "$defs": { "$ref": "#/$defs/nodeMap" },
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "readOnly": { "$ref": "#/$defs/flag" },
                    "default": true,
                    "type": { "$ref": "#/$defs/typeExpr" },
                    "format": { "type": "string" },
                    "enum": {
                        "type": "array",
                        "items": { "type": ["string", "integer"] }
                    },
                    "minimum": { "type": "number" },
                    "maximum": { "type": "number" },
                    "minLength": { "$ref": "#/$defs/count" },
                    "maxLength": { "$ref": "#/$defs/count" },
                    "minItems": { "$ref": "#/$defs/count" },
                    "maxItems": { "$ref": "#/$defs/count" },
                    "uniqueItems": { "$ref": "#/$defs/flag" },
                    "required": { "$ref": "#/$defs/stringList" },
                    "allOf": {
                        "type": "array",
                        "items": { "$ref": "#/$defs/node" }
                    },
                    "properties": { "$ref": "#/$defs/nodeMap" },
                    "additionalProperties": { "$ref": "#/$defs/flag" },
                    "items": { "$ref": "#/$defs/node" },
                    "javaType": { "type": "string" },
                    "namespace": { "type": "string" },
                    "abstract": { "$ref": "#/$defs/flag" },
                    "interface": { "$ref": "#/$defs/flag" },
                    "enumNames": { "$ref": "#/$defs/stringList" },
                    "volatile": { "$ref": "#/$defs/flag" },
                    "derived": { "$ref": "#/$defs/flag" },
                    "unordered": { "$ref": "#/$defs/flag" },
                    "transientProperties": { "$ref": "#/$defs/nodeMap" },
                    "reference": { "$ref": "#/$defs/flag" },
                    "id": { "$ref": "#/$defs/flag" },
                    "containment": { "$ref": "#/$defs/flag" },
                    "resolveProxies": { "$ref": "#/$defs/flag" },
                    "opposite": { "type": "string" },
                    "methods": {
                        "type": "object",
                        "additionalProperties": { "$ref": "#/$defs/method" }
                    },
                    "argumentName": { "type": "string" }
                }
            }
        }
    })
}

/// Validate a raw document against [`metaschema`].
///
/// # Errors
///
/// Compiles the meta-schema so many documents can share one validator.
pub fn compile_metaschema() -> Result<jsonschema::Validator, ValidateError> {
    jsonschema::validator_for(&metaschema()).map_err(|e| ValidateError::MetaSchema {
        message: e.to_string(),
    })
}

/// Checks `document` against an already compiled meta-schema.
pub fn validate_with(validator: &jsonschema::Validator, document: &Value) -> Result<(), ValidateError> {
    let errors: Vec<SchemaError> = validator
        .iter_errors(document)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

/// Returns `ValidateError::Invalid` with one entry per violation, or
/// `ValidateError::MetaSchema` if the meta-schema itself fails to compile.
pub fn validate_document(document: &Value) -> Result<(), ValidateError> {
    validate_with(&compile_metaschema()?, document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export_package;
    use crate::model::{
        Class, Classifier, ClassifierRef, EnumLiteral, GenericType, Multiplicity, Package,
        StructuralFeature, TypedElement,
    };
    use crate::types::{ExportOptions, BUILTIN_NS_URI};

    #[test]
    fn metaschema_compiles() {
        assert!(compile_metaschema().is_ok());
    }

    #[test]
    fn compiled_validator_is_reusable() {
        let validator = compile_metaschema().unwrap();
        let valid = json!({ "$id": "http://example.com/coffee/Machine.json", "title": "Machine" });
        let invalid = json!({ "title": "Machine", "format": "uri" });

        assert!(validate_with(&validator, &valid).is_ok());
        assert!(matches!(
            validate_with(&validator, &invalid),
            Err(ValidateError::Invalid { .. })
        ));
        assert!(validate_with(&validator, &valid).is_ok());
    }

    #[test]
    fn exported_documents_are_valid() {
        let string = TypedElement::of(GenericType::of(ClassifierRef::resolved(BUILTIN_NS_URI, "EString")));
        let package = Package::new("coffee", "http://example.com/coffee")
            .with_prefix("coffee")
            .with_classifier(Classifier::class(
                "Machine",
                Class {
                    features: vec![StructuralFeature::attribute(
                        "tags",
                        string.with_multiplicity(Multiplicity::unbounded(1)),
                    )],
                    ..Class::default()
                },
            ))
            .with_classifier(Classifier::enumeration(
                "Size",
                vec![EnumLiteral::new("SMALL", 0).with_literal("small")],
            ))
            .with_classifier(Classifier::primitive("Count", "int"));

        let documents = export_package(&package, &ExportOptions::default()).unwrap();
        for (key, document) in documents {
            let value = serde_json::to_value(&document).unwrap();
            assert!(validate_document(&value).is_ok(), "{key} should be valid");
        }
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        let document = json!({
            "$id": "http://example.com/coffee/Machine.json",
            "title": "Machine",
            "properties": {
                "cups": { "$ref": "x", "pattern": "^[0-9]+$" }
            }
        });
        match validate_document(&document) {
            Err(ValidateError::Invalid { errors }) => {
                assert!(errors.iter().any(|e| e.path.starts_with("/properties/cups")));
            }
            other => panic!("expected vocabulary error, got {other:?}"),
        }
    }

    #[test]
    fn three_member_union_is_rejected() {
        let document = json!({ "type": ["string", "integer", "null"] });
        assert!(matches!(
            validate_document(&document),
            Err(ValidateError::Invalid { .. })
        ));
    }

    #[test]
    fn method_shape_is_checked() {
        let document = json!({ "methods": { "brew": { "returns": {} } } });
        assert!(validate_document(&document).is_err());

        let document = json!({
            "methods": {
                "brew": {
                    "parameters": [{ "$ref": "x", "argumentName": "cups" }],
                    "returnType": { "$ref": "y" }
                }
            }
        });
        assert!(validate_document(&document).is_ok());
    }
}
