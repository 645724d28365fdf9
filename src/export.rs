//! Forward transformer: meta-model → schema documents.
//!
//! One top-down pass. Relational links are emitted as identifiers, so cycles
//! between classifiers never block the walk.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::TransformError;
use crate::identifier::{classifier_id, reference_id};
use crate::model::{
    Class, Classifier, ClassifierKind, Enum, FeatureKind, GenericType, Operation, Package,
    Parameter, PrimitiveType, StructuralFeature, Supertypes, TypedElement, UpperBound,
};
use crate::schema::{MethodSchema, SchemaNode, SimpleType, TypeExpr};
use crate::types::{schema_for_instance_type, ExportOptions};

/// Transforms a package tree into one document per classifier.
///
/// Keys are relative paths: `<Name>.json` for the package's own classifiers
/// and `<sub>/<Name>.json` (recursively) for sub-packages.
pub fn export_package(
    package: &Package,
    options: &ExportOptions,
) -> Result<IndexMap<String, SchemaNode>, TransformError> {
    let mut documents = IndexMap::new();
    for classifier in &package.classifiers {
        let document = export_classifier(package, classifier, options)?;
        documents.insert(format!("{}.json", classifier.name), document);
    }
    for sub in &package.subpackages {
        for (key, document) in export_package(sub, options)? {
            documents.insert(format!("{}/{}", sub.name, key), document);
        }
    }
    Ok(documents)
}

/// Top-level document for one classifier owned by `package`.
pub fn export_classifier(
    package: &Package,
    classifier: &Classifier,
    options: &ExportOptions,
) -> Result<SchemaNode, TransformError> {
    let mut document = match &classifier.kind {
        ClassifierKind::Class(class) => export_class(class)?,
        ClassifierKind::Enum(e) => export_enum(e),
        ClassifierKind::Primitive(p) => export_primitive(p),
    };
    document.schema_dialect = options.dialect.clone();
    document.id = Some(classifier_id(&package.classifier_ref(&classifier.name))?);
    document.title = Some(classifier.name.clone());
    document.namespace = Some(
        package
            .ns_prefix
            .clone()
            .unwrap_or_else(|| package.name.clone()),
    );
    Ok(document)
}

pub fn export_class(class: &Class) -> Result<SchemaNode, TransformError> {
    let mut node = SchemaNode {
        type_expr: Some(TypeExpr::nullable(SimpleType::Object)),
        is_abstract: class.is_abstract.then_some(true),
        interface_flag: class.is_interface.then_some(true),
        ..SchemaNode::default()
    };

    match &class.supertypes {
        Supertypes::Direct(superclass) => {
            node.schema_ref = Some(classifier_id(superclass)?);
        }
        Supertypes::Generic(list) if list.len() == 1 && list[0].arguments.is_empty() => {
            node.schema_ref = Some(classifier_id(&list[0].classifier)?);
        }
        Supertypes::Generic(list) => {
            let fragments = list
                .iter()
                .map(|g| {
                    let mut fragment = SchemaNode::default();
                    encode_generic_type(&mut fragment, g)?;
                    Ok(fragment)
                })
                .collect::<Result<Vec<_>, TransformError>>()?;
            node.all_of = Some(fragments);
        }
        Supertypes::None => node.all_of = Some(Vec::new()),
    }

    let mut properties = IndexMap::new();
    let mut transient = IndexMap::new();
    let mut required = Vec::new();
    for feature in &class.features {
        let encoded = export_feature(feature)?;
        if feature.ty.multiplicity.is_required() {
            required.push(feature.name.clone());
        }
        if feature.transient {
            transient.insert(feature.name.clone(), encoded);
        } else {
            properties.insert(feature.name.clone(), encoded);
        }
    }
    node.properties = non_empty_map(properties);
    node.transient_properties = non_empty_map(transient);
    node.required = (!required.is_empty()).then_some(required);

    let methods = class
        .operations
        .iter()
        .map(|op| Ok((op.name.clone(), export_operation(op)?)))
        .collect::<Result<IndexMap<_, _>, TransformError>>()?;
    node.methods = non_empty_map(methods);

    Ok(node)
}

fn non_empty_map<V>(map: IndexMap<String, V>) -> Option<IndexMap<String, V>> {
    (!map.is_empty()).then_some(map)
}

/// Enum literals in ordinal order. `enumNames` only appears when some
/// literal string differs from its name.
pub fn export_enum(e: &Enum) -> SchemaNode {
    let mut literals: Vec<_> = e.literals.iter().collect();
    literals.sort_by_key(|l| l.value);

    let distinct = literals
        .iter()
        .any(|l| l.literal.as_deref().is_some_and(|lit| lit != l.name));

    SchemaNode {
        enum_values: Some(
            literals
                .iter()
                .map(|l| Value::String(l.literal_or_name().to_string()))
                .collect(),
        ),
        enum_names: distinct.then(|| literals.iter().map(|l| l.name.clone()).collect()),
        ..SchemaNode::default()
    }
}

pub fn export_primitive(primitive: &PrimitiveType) -> SchemaNode {
    let mut node = schema_for_instance_type(&primitive.instance_type);
    node.java_type = Some(primitive.instance_type.clone());
    node
}

fn export_feature(feature: &StructuralFeature) -> Result<SchemaNode, TransformError> {
    let mut node = SchemaNode::default();
    encode_typed_element(&mut node, &feature.ty)?;

    node.read_only = (!feature.changeable).then_some(true);
    node.volatile = feature.volatile.then_some(true);
    node.derived = feature.derived.then_some(true);
    node.default = feature.default_value.clone().map(Value::String);

    match &feature.kind {
        FeatureKind::Attribute { is_id } => {
            node.key = is_id.then_some(true);
        }
        FeatureKind::Reference {
            containment,
            resolve_proxies,
            opposite,
        } => {
            node.reference = Some(true);
            node.containment = containment.then_some(true);
            node.resolve_proxies = (!resolve_proxies).then_some(false);
            node.opposite = opposite
                .as_ref()
                .map(|o| reference_id(&o.owner, &o.name))
                .transpose()?;
        }
    }
    Ok(node)
}

fn export_operation(operation: &Operation) -> Result<MethodSchema, TransformError> {
    let parameters = operation
        .parameters
        .iter()
        .map(export_parameter)
        .collect::<Result<Vec<_>, TransformError>>()?;
    let return_type = operation
        .return_type
        .as_ref()
        .map(|ty| {
            let mut node = SchemaNode::default();
            encode_typed_element(&mut node, ty)?;
            Ok::<_, TransformError>(Box::new(node))
        })
        .transpose()?;
    Ok(MethodSchema {
        parameters: (!parameters.is_empty()).then_some(parameters),
        return_type,
    })
}

fn export_parameter(parameter: &Parameter) -> Result<SchemaNode, TransformError> {
    let mut node = SchemaNode::default();
    encode_typed_element(&mut node, &parameter.ty)?;
    node.argument_name = Some(parameter.name.clone());
    Ok(node)
}

/// Multi-valued elements become arrays whose `items` carry the type.
fn encode_typed_element(node: &mut SchemaNode, ty: &TypedElement) -> Result<(), TransformError> {
    if !ty.multiplicity.is_many() {
        return encode_optional_generic(node, ty);
    }

    node.type_expr = Some(TypeExpr::One(SimpleType::Array));
    node.min_items = (ty.multiplicity.lower != 0).then_some(u64::from(ty.multiplicity.lower));
    node.max_items = match ty.multiplicity.upper {
        UpperBound::Bounded(upper) => Some(u64::from(upper)),
        UpperBound::Unbounded => None,
    };
    node.unique_items = ty.unique.then_some(true);
    node.unordered = (!ty.ordered).then_some(true);

    let mut items = SchemaNode::default();
    encode_optional_generic(&mut items, ty)?;
    node.items = Some(Box::new(items));
    Ok(())
}

// Untyped elements carry no `$ref`.
fn encode_optional_generic(node: &mut SchemaNode, ty: &TypedElement) -> Result<(), TransformError> {
    match &ty.generic_type {
        Some(generic) => encode_generic_type(node, generic),
        None => Ok(()),
    }
}

fn encode_generic_type(node: &mut SchemaNode, generic: &GenericType) -> Result<(), TransformError> {
    if !generic.arguments.is_empty() {
        let mut defs = IndexMap::new();
        for argument in &generic.arguments {
            let definition = SchemaNode {
                dynamic_anchor: Some(argument.parameter.clone()),
                schema_ref: argument.classifier.as_ref().map(classifier_id).transpose()?,
                ..SchemaNode::default()
            };
            defs.insert(argument.parameter.clone(), definition);
        }
        node.defs = Some(defs);
    }
    node.schema_ref = Some(classifier_id(&generic.classifier)?);
    Ok(())
}
