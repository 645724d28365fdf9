//! Schema document model.
//!
//! A [`SchemaNode`] is either a top-level document (one per classifier) or a
//! nested fragment. The set of keys is closed: the JSON-Schema core keywords
//! the transformers use plus the modeling vocabulary. Unknown keys are
//! rejected when deserializing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::TransformError;

/// Primitive JSON kinds usable in a `type` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimpleType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl SimpleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleType::Array => "array",
            SimpleType::Boolean => "boolean",
            SimpleType::Integer => "integer",
            SimpleType::Null => "null",
            SimpleType::Number => "number",
            SimpleType::Object => "object",
            SimpleType::String => "string",
        }
    }
}

impl std::fmt::Display for SimpleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that is either a single item or a list of items.
///
/// Serialized without a tag: a bare value for [`OneOrMany::One`], a JSON array
/// for [`OneOrMany::Many`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item),
            OneOrMany::Many(items) => items,
        }
    }
}

/// The `type` keyword: one kind, or a `[kind, "null"]` pair.
pub type TypeExpr = OneOrMany<SimpleType>;

impl TypeExpr {
    /// `[kind, "null"]`.
    pub fn nullable(kind: SimpleType) -> Self {
        OneOrMany::Many(vec![kind, SimpleType::Null])
    }

    /// True only for the single-kind form equal to `kind`.
    pub fn is(&self, kind: SimpleType) -> bool {
        matches!(self, OneOrMany::One(k) if *k == kind)
    }

    /// Returns the value kind and whether `null` is admitted.
    ///
    /// Lists must contain `null` and exactly one other kind.
    pub fn value_kind(&self) -> Result<(SimpleType, bool), TransformError> {
        match self {
            OneOrMany::One(kind) => Ok((*kind, false)),
            OneOrMany::Many(kinds) => {
                if kinds.len() > 2 {
                    return Err(TransformError::unsupported(format!(
                        "union type with {} members; only [<kind>, \"null\"] is supported",
                        kinds.len()
                    )));
                }
                if !kinds.contains(&SimpleType::Null) {
                    return Err(TransformError::unsupported(
                        "union type without \"null\"; only [<kind>, \"null\"] is supported",
                    ));
                }
                let value = kinds
                    .iter()
                    .copied()
                    .find(|k| *k != SimpleType::Null)
                    .ok_or_else(|| {
                        TransformError::unsupported("union type without a value kind")
                    })?;
                Ok((value, true))
            }
        }
    }
}

/// One schema document or nested schema fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaNode {
    // core
    #[serde(rename = "$id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema_dialect: Option<String>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub schema_ref: Option<String>,
    #[serde(rename = "$dynamicAnchor", skip_serializing_if = "Option::is_none")]
    pub dynamic_anchor: Option<String>,
    #[serde(rename = "$comment", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "$defs", skip_serializing_if = "Option::is_none")]
    pub defs: Option<IndexMap<String, SchemaNode>>,

    // meta-data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    // validation
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<TypeExpr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    // applicator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    // modeling: external type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_type: Option<String>,

    // modeling: package
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    // modeling: class
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<bool>,
    #[serde(rename = "interface", skip_serializing_if = "Option::is_none")]
    pub interface_flag: Option<bool>,

    // modeling: enum
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_names: Option<Vec<String>>,

    // modeling: structural feature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unordered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transient_properties: Option<IndexMap<String, SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<bool>,

    // modeling: attribute
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub key: Option<bool>,

    // modeling: reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_proxies: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opposite: Option<String>,

    // modeling: operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<IndexMap<String, MethodSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument_name: Option<String>,
}

/// An operation: ordered parameter schemas plus an optional return type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MethodSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Box<SchemaNode>>,
}

impl SchemaNode {
    /// A node whose only field is `$ref`.
    pub fn reference_to(id: impl Into<String>) -> Self {
        Self {
            schema_ref: Some(id.into()),
            ..Self::default()
        }
    }

    /// Serialized names of every field that is set, in declaration order.
    pub fn set_fields(&self) -> Vec<&'static str> {
        let mut set = Vec::new();
        let mut check = |present: bool, name: &'static str| {
            if present {
                set.push(name);
            }
        };
        check(self.id.is_some(), "$id");
        check(self.schema_dialect.is_some(), "$schema");
        check(self.schema_ref.is_some(), "$ref");
        check(self.dynamic_anchor.is_some(), "$dynamicAnchor");
        check(self.comment.is_some(), "$comment");
        check(self.defs.is_some(), "$defs");
        check(self.title.is_some(), "title");
        check(self.description.is_some(), "description");
        check(self.read_only.is_some(), "readOnly");
        check(self.default.is_some(), "default");
        check(self.type_expr.is_some(), "type");
        check(self.format.is_some(), "format");
        check(self.enum_values.is_some(), "enum");
        check(self.minimum.is_some(), "minimum");
        check(self.maximum.is_some(), "maximum");
        check(self.min_length.is_some(), "minLength");
        check(self.max_length.is_some(), "maxLength");
        check(self.min_items.is_some(), "minItems");
        check(self.max_items.is_some(), "maxItems");
        check(self.unique_items.is_some(), "uniqueItems");
        check(self.required.is_some(), "required");
        check(self.all_of.is_some(), "allOf");
        check(self.properties.is_some(), "properties");
        check(self.additional_properties.is_some(), "additionalProperties");
        check(self.items.is_some(), "items");
        check(self.java_type.is_some(), "javaType");
        check(self.namespace.is_some(), "namespace");
        check(self.is_abstract.is_some(), "abstract");
        check(self.interface_flag.is_some(), "interface");
        check(self.enum_names.is_some(), "enumNames");
        check(self.volatile.is_some(), "volatile");
        check(self.derived.is_some(), "derived");
        check(self.unordered.is_some(), "unordered");
        check(self.transient_properties.is_some(), "transientProperties");
        check(self.reference.is_some(), "reference");
        check(self.key.is_some(), "id");
        check(self.containment.is_some(), "containment");
        check(self.resolve_proxies.is_some(), "resolveProxies");
        check(self.opposite.is_some(), "opposite");
        check(self.methods.is_some(), "methods");
        check(self.argument_name.is_some(), "argumentName");
        set
    }

    /// True iff `$ref` is the only field set.
    pub fn is_pure_reference(&self) -> bool {
        self.set_fields() == ["$ref"]
    }

    /// True iff `type` is the only field set.
    pub fn is_simple_type(&self) -> bool {
        self.set_fields() == ["type"]
    }

    /// True iff no field is set.
    pub fn is_empty(&self) -> bool {
        self.set_fields().is_empty()
    }

    /// True when the node models a multi-valued element (`type: "array"`).
    pub fn is_array(&self) -> bool {
        self.type_expr
            .as_ref()
            .map(|t| t.is(SimpleType::Array))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pure_reference_predicate() {
        let node = SchemaNode::reference_to("https://example.com/model/A.json");
        assert!(node.is_pure_reference());
        assert!(!node.is_simple_type());
        assert!(!node.is_empty());

        let mut with_defs = node.clone();
        with_defs.defs = Some(IndexMap::new());
        assert!(!with_defs.is_pure_reference());

        // Modeling keywords count too.
        let mut flagged = node;
        flagged.containment = Some(false);
        assert!(!flagged.is_pure_reference());
    }

    #[test]
    fn simple_type_predicate() {
        let node = SchemaNode {
            type_expr: Some(OneOrMany::One(SimpleType::String)),
            ..SchemaNode::default()
        };
        assert!(node.is_simple_type());

        let node = SchemaNode {
            type_expr: Some(OneOrMany::One(SimpleType::String)),
            format: Some("date-time".into()),
            ..SchemaNode::default()
        };
        assert!(!node.is_simple_type());
    }

    #[test]
    fn empty_predicate() {
        assert!(SchemaNode::default().is_empty());
        assert!(!SchemaNode {
            argument_name: Some("x".into()),
            ..SchemaNode::default()
        }
        .is_empty());
    }

    #[test]
    fn type_expr_single_and_list_forms() {
        let single: TypeExpr = serde_json::from_value(json!("integer")).unwrap();
        assert_eq!(single, OneOrMany::One(SimpleType::Integer));
        assert_eq!(single.value_kind().unwrap(), (SimpleType::Integer, false));

        let pair: TypeExpr = serde_json::from_value(json!(["string", "null"])).unwrap();
        assert_eq!(pair, TypeExpr::nullable(SimpleType::String));
        assert_eq!(pair.value_kind().unwrap(), (SimpleType::String, true));
        assert_eq!(serde_json::to_value(&pair).unwrap(), json!(["string", "null"]));
    }

    #[test]
    fn type_expr_rejects_wide_unions() {
        let wide: TypeExpr =
            serde_json::from_value(json!(["string", "integer", "null"])).unwrap();
        assert!(matches!(
            wide.value_kind(),
            Err(TransformError::UnsupportedShape { .. })
        ));

        let no_null: TypeExpr = serde_json::from_value(json!(["string", "integer"])).unwrap();
        assert!(no_null.value_kind().is_err());

        let only_null: TypeExpr = serde_json::from_value(json!(["null", "null"])).unwrap();
        assert!(only_null.value_kind().is_err());
    }

    #[test]
    fn keyword_names_on_the_wire() {
        let node: SchemaNode = serde_json::from_value(json!({
            "$id": "https://example.com/model/Machine.json",
            "$ref": "https://example.com/model/Component.json",
            "title": "Machine",
            "interface": true,
            "abstract": true,
            "transientProperties": {
                "cache": { "$ref": "https://example.com/model/Cache.json", "reference": true }
            },
            "properties": {
                "serial": { "$ref": "https://example.com/types/EString.json", "id": true }
            }
        }))
        .unwrap();

        assert_eq!(node.interface_flag, Some(true));
        assert_eq!(node.is_abstract, Some(true));
        let props = node.properties.as_ref().unwrap();
        assert_eq!(props["serial"].key, Some(true));
        let transient = node.transient_properties.as_ref().unwrap();
        assert_eq!(transient["cache"].reference, Some(true));

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["$id"], "https://example.com/model/Machine.json");
        assert_eq!(back["interface"], true);
        assert!(back.get("interfaceFlag").is_none());
        assert!(back.get("methods").is_none());
    }

    #[test]
    fn unknown_keywords_rejected() {
        let result = serde_json::from_value::<SchemaNode>(json!({
            "title": "A",
            "x-custom": 1
        }));
        assert!(result.is_err());

        let result = serde_json::from_value::<MethodSchema>(json!({
            "parameters": [],
            "throws": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn properties_keep_insertion_order() {
        let node: SchemaNode = serde_json::from_value(json!({
            "properties": {
                "zeta": { "$ref": "a" },
                "alpha": { "$ref": "b" },
                "mid": { "$ref": "c" }
            }
        }))
        .unwrap();
        let names: Vec<&str> = node
            .properties
            .as_ref()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }
}
