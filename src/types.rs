//! Core constants, transformer options and the primitive type table.

use serde_json::{Number, Value};

use crate::error::TransformError;
use crate::model::{Class, Classifier, Package};
use crate::schema::{SchemaNode, SimpleType, TypeExpr};

/// Root of every identifier this system mints for its own documents.
pub const SCHEMA_ID_PREFIX: &str = "https://metamodel-schema.dev/draft/1";

/// Meta-schema written to `$schema` by default.
pub const SCHEMA_DIALECT: &str = "https://metamodel-schema.dev/draft/1/schema.json";

/// Schema-space namespace of the built-in primitive types.
pub const TYPES_ID_PREFIX: &str = "https://metamodel-schema.dev/draft/1/types";

/// Model-space namespace URI of the built-in primitive types.
pub const BUILTIN_NS_URI: &str = "http://www.eclipse.org/emf/2002/Ecore";

pub const BUILTIN_NS_PREFIX: &str = "ecore";

/// Namespace rewrites applied when turning a proxy address into an
/// identifier (left to right) and back (right to left).
pub const NAMESPACE_REWRITES: &[(&str, &str)] = &[(BUILTIN_NS_URI, TYPES_ID_PREFIX)];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Options for the forward transformer.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Value of `$schema` on every top-level document. `None` omits it.
    pub dialect: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            dialect: Some(SCHEMA_DIALECT.to_string()),
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or clear) the `$schema` value.
    pub fn dialect(mut self, dialect: Option<impl Into<String>>) -> Self {
        self.dialect = dialect.map(Into::into);
        self
    }
}

/// Options for the reverse transformer.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// When true, an `opposite` naming a reference that does not exist on a
    /// loaded class is an error. When false a placeholder is linked instead.
    pub strict_opposites: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strict_opposites: true,
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict_opposites(mut self, strict: bool) -> Self {
        self.strict_opposites = strict;
        self
    }
}

fn integer_range(nullable: bool, min: i64, max: i64) -> SchemaNode {
    SchemaNode {
        type_expr: Some(kind(SimpleType::Integer, nullable)),
        minimum: Some(Number::from(min)),
        maximum: Some(Number::from(max)),
        ..SchemaNode::default()
    }
}

fn single_char(nullable: bool) -> SchemaNode {
    SchemaNode {
        type_expr: Some(kind(SimpleType::String, nullable)),
        min_length: Some(1),
        max_length: Some(1),
        ..SchemaNode::default()
    }
}

fn kind(kind: SimpleType, nullable: bool) -> TypeExpr {
    if nullable {
        TypeExpr::nullable(kind)
    } else {
        TypeExpr::One(kind)
    }
}

fn typed(kind_expr: TypeExpr) -> SchemaNode {
    SchemaNode {
        type_expr: Some(kind_expr),
        ..SchemaNode::default()
    }
}

/// Structural schema for a host-language instance type.
///
/// Unmapped types yield an empty node; the caller still sets `javaType`.
pub fn schema_for_instance_type(instance_type: &str) -> SchemaNode {
    match instance_type {
        "char" => single_char(false),
        "java.lang.Character" => single_char(true),
        "java.lang.String" => typed(TypeExpr::nullable(SimpleType::String)),
        "boolean" => typed(TypeExpr::One(SimpleType::Boolean)),
        "java.lang.Boolean" => typed(TypeExpr::nullable(SimpleType::Boolean)),
        "byte" => integer_range(false, i8::MIN.into(), i8::MAX.into()),
        "java.lang.Byte" => integer_range(true, i8::MIN.into(), i8::MAX.into()),
        "short" => integer_range(false, i16::MIN.into(), i16::MAX.into()),
        "java.lang.Short" => integer_range(true, i16::MIN.into(), i16::MAX.into()),
        "int" => integer_range(false, i32::MIN.into(), i32::MAX.into()),
        "java.lang.Integer" => integer_range(true, i32::MIN.into(), i32::MAX.into()),
        "long" => integer_range(false, i64::MIN, i64::MAX),
        "java.lang.Long" => integer_range(true, i64::MIN, i64::MAX),
        "java.math.BigInteger" => typed(TypeExpr::nullable(SimpleType::Integer)),
        "byte[]" => SchemaNode {
            type_expr: Some(TypeExpr::nullable(SimpleType::Array)),
            items: Some(Box::new(integer_range(false, i8::MIN.into(), i8::MAX.into()))),
            ..SchemaNode::default()
        },
        "float" | "double" => typed(TypeExpr::One(SimpleType::Number)),
        "java.lang.Float" | "java.lang.Double" | "java.math.BigDecimal" => {
            typed(TypeExpr::nullable(SimpleType::Number))
        }
        "java.lang.Void" => typed(TypeExpr::One(SimpleType::Null)),
        "java.util.Date" => SchemaNode {
            type_expr: Some(TypeExpr::nullable(SimpleType::String)),
            format: Some("date-time".to_string()),
            ..SchemaNode::default()
        },
        _ => SchemaNode::default(),
    }
}

/// Host-language instance type for a structural schema without `javaType`.
pub fn instance_type_for_schema(node: &SchemaNode) -> Result<&'static str, TransformError> {
    let expr = node
        .type_expr
        .as_ref()
        .ok_or_else(|| TransformError::missing("type", "primitive type schema"))?;
    let (value_kind, nullable) = expr.value_kind()?;
    let pick = |boxed: &'static str, unboxed: &'static str| if nullable { boxed } else { unboxed };

    let instance_type = match value_kind {
        SimpleType::String => {
            if node.format.as_deref() == Some("date-time") {
                "java.util.Date"
            } else if node.min_length == Some(1) && node.max_length == Some(1) {
                pick("java.lang.Character", "char")
            } else {
                "java.lang.String"
            }
        }
        SimpleType::Boolean => pick("java.lang.Boolean", "boolean"),
        SimpleType::Integer => integer_instance_type(node, nullable),
        SimpleType::Number => pick("java.lang.Double", "double"),
        SimpleType::Null => "java.lang.Void",
        SimpleType::Object | SimpleType::Array => {
            return Err(TransformError::unsupported(format!(
                "'{value_kind}' cannot describe a primitive type"
            )))
        }
    };
    Ok(instance_type)
}

fn integer_instance_type(node: &SchemaNode, nullable: bool) -> &'static str {
    let pick = |boxed: &'static str, unboxed: &'static str| if nullable { boxed } else { unboxed };
    let (min, max) = match (&node.minimum, &node.maximum) {
        (Some(min), Some(max)) => (min, max),
        _ => return pick("java.lang.Long", "long"),
    };
    let (min, max) = match (min.as_i64(), max.as_i64()) {
        (Some(min), Some(max)) => (min, max),
        _ => return "java.math.BigInteger",
    };
    let fits = |lo: i64, hi: i64| min >= lo && max <= hi;

    if fits(i16::MIN.into(), i16::MAX.into()) {
        pick("java.lang.Short", "short")
    } else if fits(i32::MIN.into(), i32::MAX.into()) {
        pick("java.lang.Integer", "int")
    } else {
        pick("java.lang.Long", "long")
    }
}

/// Built-in primitive data types: name, instance type, type parameters.
const BUILTIN_TYPES: &[(&str, &str, &[&str])] = &[
    ("EBigDecimal", "java.math.BigDecimal", &[]),
    ("EBigInteger", "java.math.BigInteger", &[]),
    ("EBoolean", "boolean", &[]),
    ("EBooleanObject", "java.lang.Boolean", &[]),
    ("EByte", "byte", &[]),
    ("EByteArray", "byte[]", &[]),
    ("EByteObject", "java.lang.Byte", &[]),
    ("EChar", "char", &[]),
    ("ECharacterObject", "java.lang.Character", &[]),
    ("EDate", "java.util.Date", &[]),
    ("EDiagnosticChain", "org.eclipse.emf.common.util.DiagnosticChain", &[]),
    ("EDouble", "double", &[]),
    ("EDoubleObject", "java.lang.Double", &[]),
    ("EEList", "org.eclipse.emf.common.util.EList", &["E"]),
    ("EEnumerator", "org.eclipse.emf.common.util.Enumerator", &[]),
    ("EFeatureMap", "org.eclipse.emf.ecore.util.FeatureMap", &[]),
    ("EFeatureMapEntry", "org.eclipse.emf.ecore.util.FeatureMap$Entry", &[]),
    ("EFloat", "float", &[]),
    ("EFloatObject", "java.lang.Float", &[]),
    ("EInt", "int", &[]),
    ("EIntegerObject", "java.lang.Integer", &[]),
    ("EInvocationTargetException", "java.lang.reflect.InvocationTargetException", &[]),
    ("EJavaClass", "java.lang.Class", &["T"]),
    ("EJavaObject", "java.lang.Object", &[]),
    ("ELong", "long", &[]),
    ("ELongObject", "java.lang.Long", &[]),
    ("EMap", "java.util.Map", &["K", "V"]),
    ("EResource", "org.eclipse.emf.ecore.resource.Resource", &[]),
    ("EResourceSet", "org.eclipse.emf.ecore.resource.ResourceSet", &[]),
    ("EShort", "short", &[]),
    ("EShortObject", "java.lang.Short", &[]),
    ("EString", "java.lang.String", &[]),
    ("ETreeIterator", "org.eclipse.emf.common.util.TreeIterator", &["E"]),
];

/// The built-in package: primitive data types plus the root `EObject` class.
pub fn builtin_package() -> Package {
    let mut package = Package::new(BUILTIN_NS_PREFIX, BUILTIN_NS_URI).with_prefix(BUILTIN_NS_PREFIX);
    package.classifiers = BUILTIN_TYPES
        .iter()
        .map(|(name, instance_type, parameters)| {
            Classifier::primitive(*name, *instance_type).with_type_parameters(parameters.iter().copied())
        })
        .collect();
    package
        .classifiers
        .push(Classifier::class("EObject", Class::default()));
    package
}
