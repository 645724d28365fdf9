//! Reverse transformer: schema documents → meta-model.
//!
//! Documents reference each other by identifier, possibly forwards or in
//! cycles, so reconstruction runs in two passes:
//!
//! 1. [`SchemaImporter::create_shells`] registers one classifier per document
//!    with its identity, kind and untyped members.
//! 2. [`SchemaImporter::wire`] links supertypes for every class, then types
//!    features, parameters and return types and resolves opposites.
//!
//! Pass 2 never starts before pass 1 has finished for every document.
//! Identifiers that match no document and no built-in type become proxies.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TransformError;
use crate::identifier::{identifier_to_proxy, namespace_of, schema_id, split_reference_id};
use crate::model::{
    Class, Classifier, ClassifierKind, ClassifierRef, Enum, EnumLiteral, FeatureKind, FeatureRef,
    GenericType, Multiplicity, Operation, Package, Parameter, PrimitiveType, StructuralFeature,
    Supertypes, TypeArgument, TypedElement, UpperBound,
};
use crate::registry::{Registry, Slot};
use crate::schema::SchemaNode;
use crate::types::{builtin_package, instance_type_for_schema, json_type_name, ImportOptions};

/// Reconstructs packages from a set of top-level documents.
pub fn import_documents(
    documents: &[SchemaNode],
    options: &ImportOptions,
) -> Result<Vec<Package>, TransformError> {
    SchemaImporter::new(options.clone()).transform(documents)
}

/// Primitive type for a document: `javaType` when present, otherwise derived
/// from the structural `type`.
pub fn import_primitive(node: &SchemaNode) -> Result<PrimitiveType, TransformError> {
    let instance_type = match &node.java_type {
        Some(java_type) => java_type.clone(),
        None => instance_type_for_schema(node)?.to_string(),
    };
    Ok(PrimitiveType { instance_type })
}

#[derive(Debug)]
struct Entry {
    ns_uri: String,
    classifier: Classifier,
    /// Slots of the resolved supertypes, filled in by pass 2.
    supertypes: Vec<usize>,
}

#[derive(Debug, Default)]
struct PackageShell {
    prefix: Option<String>,
    members: Vec<usize>,
}

/// Classifier slots created by pass 1, one per input document, in order.
#[derive(Debug, Clone)]
pub struct Shells {
    slots: Vec<usize>,
}

impl Shells {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Typed data computed for one class before it is written back.
#[derive(Default)]
struct ClassWiring {
    features: Vec<(usize, TypedElement, Option<FeatureRef>)>,
    operations: Vec<(usize, Option<TypedElement>, Vec<TypedElement>)>,
}

/// Two-pass schema importer.
///
/// Owns the identifier registry and package table for one transformation.
/// After an error the importer is left partially populated and should be
/// discarded.
#[derive(Debug)]
pub struct SchemaImporter {
    options: ImportOptions,
    classifiers: Vec<Entry>,
    registry: Registry,
    packages: IndexMap<String, PackageShell>,
}

impl Default for SchemaImporter {
    fn default() -> Self {
        Self::new(ImportOptions::default())
    }
}

impl SchemaImporter {
    /// Creates an importer with the built-in types already registered.
    pub fn new(options: ImportOptions) -> Self {
        let mut importer = Self {
            options,
            classifiers: Vec::new(),
            registry: Registry::new(),
            packages: IndexMap::new(),
        };
        let builtins = builtin_package();
        for classifier in builtins.classifiers {
            let id = schema_id(&builtins.ns_uri, &classifier.name);
            let index = importer.push(builtins.ns_uri.clone(), classifier);
            importer.registry.insert(
                id,
                Slot {
                    index,
                    builtin: true,
                },
            );
        }
        importer
    }

    /// Runs both passes and returns the reconstructed packages.
    pub fn transform(mut self, documents: &[SchemaNode]) -> Result<Vec<Package>, TransformError> {
        let shells = self.create_shells(documents)?;
        self.wire(documents, &shells)?;
        Ok(self.into_packages())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Classifier registered under `id`, built-ins included.
    pub fn classifier(&self, id: &str) -> Option<&Classifier> {
        self.registry
            .get(id)
            .map(|slot| &self.classifiers[slot.index].classifier)
    }

    fn push(&mut self, ns_uri: String, classifier: Classifier) -> usize {
        self.classifiers.push(Entry {
            ns_uri,
            classifier,
            supertypes: Vec::new(),
        });
        self.classifiers.len() - 1
    }

    fn reference_for(&self, slot: Slot) -> ClassifierRef {
        let entry = &self.classifiers[slot.index];
        ClassifierRef::resolved(&entry.ns_uri, &entry.classifier.name)
    }

    fn lookup(&self, id: &str) -> Option<(ClassifierRef, &Classifier)> {
        self.registry
            .get(id)
            .map(|slot| (self.reference_for(slot), &self.classifiers[slot.index].classifier))
    }

    fn resolve_classifier(&self, id: &str) -> Result<ClassifierRef, TransformError> {
        match self.lookup(id) {
            Some((classifier, _)) => Ok(classifier),
            None => {
                debug!("no document for {}, creating proxy", id);
                identifier_to_proxy(id)
            }
        }
    }

    // Pass 1

    /// Pass 1: registers a shell classifier for every document.
    pub fn create_shells(&mut self, documents: &[SchemaNode]) -> Result<Shells, TransformError> {
        let slots = documents
            .iter()
            .map(|document| self.create_shell(document))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Shells { slots })
    }

    fn create_shell(&mut self, document: &SchemaNode) -> Result<usize, TransformError> {
        let id = document
            .id
            .as_deref()
            .ok_or_else(|| TransformError::missing("$id", "top-level schema"))?;
        let namespace = namespace_of(id)?.to_string();
        let name = document
            .title
            .clone()
            .ok_or_else(|| TransformError::missing("title", format!("top-level schema '{id}'")))?;
        debug!("creating shell for {}", id);
        if id.rsplit('/').next() != Some(format!("{name}.json").as_str()) {
            warn!(
                "'{}' is titled '{}'; references to it will use '{}'",
                id,
                name,
                schema_id(&namespace, &name)
            );
        }

        let kind = if let Some(values) = &document.enum_values {
            ClassifierKind::Enum(decode_enum(id, values, document.enum_names.as_deref())?)
        } else if document.java_type.is_some() {
            ClassifierKind::Primitive(import_primitive(document)?)
        } else {
            ClassifierKind::Class(class_shell(id, document)?)
        };
        let classifier = Classifier {
            name,
            type_parameters: Vec::new(),
            kind,
        };

        if let Some(existing) = self.registry.get(id) {
            if !existing.builtin {
                return Err(TransformError::unsupported(format!(
                    "duplicate schema identifier '{id}'"
                )));
            }
            debug!("{} replaces a built-in type", id);
        }
        let index = self.push(namespace.clone(), classifier);
        self.registry.insert(
            id,
            Slot {
                index,
                builtin: false,
            },
        );

        let package = self.packages.entry(namespace).or_default();
        if package.prefix.is_none() {
            package.prefix = document.namespace.clone();
        }
        package.members.push(index);
        Ok(index)
    }

    // Pass 2

    /// Pass 2: links and types the shells created by [`Self::create_shells`].
    pub fn wire(&mut self, documents: &[SchemaNode], shells: &Shells) -> Result<(), TransformError> {
        if documents.len() != shells.slots.len() {
            return Err(TransformError::unsupported(format!(
                "{} documents given for {} shells",
                documents.len(),
                shells.slots.len()
            )));
        }

        // All supertypes first so opposite lookup can walk inherited references.
        for (document, &index) in documents.iter().zip(&shells.slots) {
            if !self.classifiers[index].classifier.is_class() {
                continue;
            }
            let (supertypes, slots) = self.decode_supertypes(document)?;
            let entry = &mut self.classifiers[index];
            entry.supertypes = slots;
            if let Some(class) = entry.classifier.as_class_mut() {
                class.supertypes = supertypes;
            }
        }

        for (document, &index) in documents.iter().zip(&shells.slots) {
            let Some(class) = self.classifiers[index].classifier.as_class() else {
                continue;
            };
            debug!("wiring {}", document.id.as_deref().unwrap_or_default());
            let wiring = self.decode_members(document, class)?;
            if let Some(class) = self.classifiers[index].classifier.as_class_mut() {
                apply_wiring(class, wiring);
            }
        }
        Ok(())
    }

    /// Supertypes of a class document, with the slot of each resolved one.
    fn decode_supertypes(
        &self,
        document: &SchemaNode,
    ) -> Result<(Supertypes, Vec<usize>), TransformError> {
        let id = document.id.as_deref().unwrap_or_default();
        let mut decoded = Vec::new();

        if let Some(target) = &document.schema_ref {
            decoded.extend(self.decode_supertype(id, target, None)?);
        }
        for fragment in document.all_of.iter().flatten() {
            let target = match &fragment.schema_ref {
                Some(target) if is_supertype_fragment(fragment) => target,
                _ => {
                    return Err(TransformError::unsupported(format!(
                        "'{id}': anonymous supertypes are not allowed"
                    )))
                }
            };
            decoded.extend(self.decode_supertype(id, target, fragment.defs.as_ref())?);
        }

        let (mut supertypes, slots): (Vec<_>, Vec<_>) = decoded.into_iter().unzip();
        let supertypes = match supertypes.len() {
            0 => Supertypes::None,
            1 if document.all_of.is_none() && supertypes[0].arguments.is_empty() => {
                Supertypes::Direct(supertypes.remove(0).classifier)
            }
            _ => Supertypes::Generic(supertypes),
        };
        Ok((supertypes, slots))
    }

    fn decode_supertype(
        &self,
        id: &str,
        target: &str,
        defs: Option<&IndexMap<String, SchemaNode>>,
    ) -> Result<Option<(GenericType, usize)>, TransformError> {
        let Some(slot) = self.registry.get(target) else {
            debug!("skipping unresolved supertype {} of {}", target, id);
            return Ok(None);
        };
        let classifier = &self.classifiers[slot.index].classifier;
        if !classifier.is_class() {
            return Err(TransformError::unsupported(format!(
                "'{id}': only classes can be supertypes, '{target}' is not a class"
            )));
        }
        let arguments = self.decode_type_arguments(classifier, defs)?;
        let generic = GenericType {
            classifier: self.reference_for(slot),
            arguments,
        };
        Ok(Some((generic, slot.index)))
    }

    fn decode_members(&self, document: &SchemaNode, class: &Class) -> Result<ClassWiring, TransformError> {
        let id = document.id.as_deref().unwrap_or_default();
        let required: HashSet<&str> = document
            .required
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        let mut wiring = ClassWiring::default();

        let properties = document
            .properties
            .iter()
            .flatten()
            .chain(document.transient_properties.iter().flatten());
        for (name, node) in properties {
            let position = class
                .features
                .iter()
                .position(|f| &f.name == name)
                .ok_or_else(|| {
                    TransformError::unsupported(format!("'{id}': feature '{name}' has no shell"))
                })?;
            let context = format!("feature '{name}' of '{id}'");
            let ty = self.decode_typed(node, required.contains(name.as_str()), &context)?;
            let opposite = match (&class.features[position].kind, &node.opposite) {
                (FeatureKind::Reference { .. }, Some(opposite)) => Some(self.resolve_opposite(opposite)?),
                _ => None,
            };
            wiring.features.push((position, ty, opposite));
        }

        for (position, (name, method)) in document.methods.iter().flatten().enumerate() {
            let context = format!("method '{name}' of '{id}'");
            let return_type = method
                .return_type
                .as_deref()
                .map(|node| self.decode_typed(node, false, &context))
                .transpose()?;
            let parameters = method
                .parameters
                .iter()
                .flatten()
                .map(|node| self.decode_typed(node, false, &context))
                .collect::<Result<Vec<_>, _>>()?;
            wiring.operations.push((position, return_type, parameters));
        }
        Ok(wiring)
    }

    /// Bounds and element type of a feature, parameter or return type.
    fn decode_typed(
        &self,
        node: &SchemaNode,
        required: bool,
        context: &str,
    ) -> Result<TypedElement, TransformError> {
        let mut ty = TypedElement::default();
        let empty = SchemaNode::default();

        let element = if node.is_array() {
            let lower = match node.min_items {
                Some(n) => bound(n, context)?,
                None => 0,
            };
            let upper = match node.max_items {
                Some(n) => UpperBound::Bounded(bound(n, context)?),
                None => UpperBound::Unbounded,
            };
            ty.multiplicity = Multiplicity { lower, upper };
            ty.unique = node.unique_items == Some(true);
            ty.ordered = node.unordered != Some(true);
            node.items.as_deref().unwrap_or(&empty)
        } else {
            ty.multiplicity = if required {
                Multiplicity::required()
            } else {
                Multiplicity::single()
            };
            node
        };

        let id = element
            .schema_ref
            .as_deref()
            .ok_or_else(|| TransformError::missing("$ref", context))?;
        let generic = match self.lookup(id) {
            Some((classifier, declared)) => GenericType {
                classifier,
                arguments: self.decode_type_arguments(declared, element.defs.as_ref())?,
            },
            None => GenericType::of(self.resolve_classifier(id)?),
        };
        ty.generic_type = Some(generic);
        Ok(ty)
    }

    /// Binds each declared type parameter that has a matching `$defs` entry.
    fn decode_type_arguments(
        &self,
        classifier: &Classifier,
        defs: Option<&IndexMap<String, SchemaNode>>,
    ) -> Result<Vec<TypeArgument>, TransformError> {
        let Some(defs) = defs else {
            return Ok(Vec::new());
        };
        let mut arguments = Vec::new();
        for parameter in &classifier.type_parameters {
            let Some(definition) = defs.get(parameter) else {
                continue;
            };
            if definition.dynamic_anchor.as_deref() != Some(parameter.as_str()) {
                return Err(TransformError::unsupported(format!(
                    "$defs entry '{parameter}' of '{}' must declare $dynamicAnchor '{parameter}'",
                    classifier.name
                )));
            }
            let bound = definition
                .schema_ref
                .as_deref()
                .map(|id| self.resolve_classifier(id))
                .transpose()?;
            arguments.push(TypeArgument {
                parameter: parameter.clone(),
                classifier: bound,
            });
        }
        Ok(arguments)
    }

    fn resolve_opposite(&self, opposite: &str) -> Result<FeatureRef, TransformError> {
        let (class_id, name) = split_reference_id(opposite)?;
        let Some(slot) = self.registry.get(class_id) else {
            debug!("opposite {} targets an unloaded classifier, linking placeholder", opposite);
            return Ok(FeatureRef {
                owner: identifier_to_proxy(class_id)?,
                name: name.to_string(),
            });
        };

        let owner = self.reference_for(slot);
        if !self.has_reference(slot.index, name) {
            if self.options.strict_opposites {
                return Err(TransformError::UnresolvedRequiredReference {
                    reference: name.to_string(),
                    target: class_id.to_string(),
                });
            }
            warn!("opposite {} does not exist, linking placeholder", opposite);
        }
        Ok(FeatureRef {
            owner,
            name: name.to_string(),
        })
    }

    /// Whether the class at `index` declares or inherits reference `name`.
    fn has_reference(&self, index: usize, name: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![index];
        while let Some(index) = pending.pop() {
            if !seen.insert(index) {
                continue;
            }
            let entry = &self.classifiers[index];
            let Some(class) = entry.classifier.as_class() else {
                continue;
            };
            if class.reference(name).is_some() {
                return true;
            }
            pending.extend(&entry.supertypes);
        }
        false
    }

    /// Consumes the importer, returning the packages built from documents.
    ///
    /// Built-in types are not included.
    pub fn into_packages(self) -> Vec<Package> {
        let mut entries: Vec<Option<Entry>> = self.classifiers.into_iter().map(Some).collect();
        self.packages
            .into_iter()
            .map(|(ns_uri, shell)| {
                let name = shell
                    .prefix
                    .clone()
                    .unwrap_or_else(|| last_segment(&ns_uri).to_string());
                let mut package = Package::new(name, ns_uri);
                package.ns_prefix = shell.prefix;
                package.classifiers = shell
                    .members
                    .iter()
                    .filter_map(|&index| entries[index].take())
                    .map(|entry| entry.classifier)
                    .collect();
                package
            })
            .collect()
    }
}

fn apply_wiring(class: &mut Class, wiring: ClassWiring) {
    for (position, ty, opposite) in wiring.features {
        let feature = &mut class.features[position];
        feature.ty = ty;
        if let FeatureKind::Reference { opposite: slot, .. } = &mut feature.kind {
            *slot = opposite;
        }
    }
    for (position, return_type, parameters) in wiring.operations {
        let Some(operation) = class.operations.get_mut(position) else {
            continue;
        };
        operation.return_type = return_type;
        for (parameter, ty) in operation.parameters.iter_mut().zip(parameters) {
            parameter.ty = ty;
        }
    }
}

/// A supertype fragment is a bare `$ref`, optionally with `$defs` binding
/// type arguments.
fn is_supertype_fragment(fragment: &SchemaNode) -> bool {
    fragment
        .set_fields()
        .iter()
        .all(|field| matches!(*field, "$ref" | "$defs"))
}

fn bound(value: u64, context: &str) -> Result<u32, TransformError> {
    u32::try_from(value).map_err(|_| {
        TransformError::unsupported(format!("{context}: bound {value} is out of range"))
    })
}

fn last_segment(ns_uri: &str) -> &str {
    ns_uri
        .trim_end_matches('/')
        .rsplit_once('/')
        .map(|(_, segment)| segment)
        .unwrap_or(ns_uri)
}

fn class_shell(id: &str, document: &SchemaNode) -> Result<Class, TransformError> {
    let mut class = Class {
        is_abstract: document.is_abstract == Some(true),
        is_interface: document.interface_flag == Some(true),
        ..Class::default()
    };
    for (name, node) in document.properties.iter().flatten() {
        class.features.push(feature_shell(name, node, false));
    }
    for (name, node) in document.transient_properties.iter().flatten() {
        if class.feature(name).is_some() {
            return Err(TransformError::unsupported(format!(
                "'{id}': feature '{name}' is declared in both properties and transientProperties"
            )));
        }
        class.features.push(feature_shell(name, node, true));
    }
    for (name, method) in document.methods.iter().flatten() {
        let mut operation = Operation::new(name.as_str());
        for parameter in method.parameters.iter().flatten() {
            let parameter_name = parameter.argument_name.clone().ok_or_else(|| {
                TransformError::missing("argumentName", format!("parameter of method '{name}' in '{id}'"))
            })?;
            operation.parameters.push(Parameter {
                name: parameter_name,
                ty: TypedElement::default(),
            });
        }
        class.operations.push(operation);
    }
    Ok(class)
}

fn feature_shell(name: &str, node: &SchemaNode, transient: bool) -> StructuralFeature {
    let mut feature = if node.reference == Some(true) {
        let mut reference = StructuralFeature::reference(name, TypedElement::default());
        reference.kind = FeatureKind::Reference {
            containment: node.containment == Some(true),
            resolve_proxies: node.resolve_proxies != Some(false),
            opposite: None,
        };
        reference
    } else {
        let mut attribute = StructuralFeature::attribute(name, TypedElement::default());
        attribute.kind = FeatureKind::Attribute {
            is_id: node.key == Some(true),
        };
        attribute
    };
    feature.changeable = node.read_only != Some(true);
    feature.volatile = node.volatile == Some(true);
    feature.derived = node.derived == Some(true);
    feature.transient = transient;
    feature.default_value = node.default.as_ref().map(|value| match value {
        Value::String(literal) => literal.clone(),
        other => other.to_string(),
    });
    feature
}

fn decode_enum(id: &str, values: &[Value], names: Option<&[String]>) -> Result<Enum, TransformError> {
    if let Some(names) = names {
        if names.len() != values.len() {
            return Err(TransformError::unsupported(format!(
                "'{id}': {} enum values but {} enumNames",
                values.len(),
                names.len()
            )));
        }
    }

    let mut literals = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        let ordinal = i32::try_from(index)
            .map_err(|_| TransformError::unsupported(format!("'{id}': too many enum literals")))?;
        let name = names.map(|names| names[index].clone());
        let literal = match (value, name) {
            (Value::String(literal), Some(name)) => EnumLiteral::new(name, ordinal).with_literal(literal.as_str()),
            (Value::String(literal), None) => EnumLiteral::new(literal.as_str(), ordinal),
            (Value::Number(number), Some(name)) => {
                let value = number
                    .as_i64()
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or_else(|| {
                        TransformError::unsupported(format!(
                            "'{id}': enum value {number} is not a 32-bit integer"
                        ))
                    })?;
                EnumLiteral::new(name, value)
            }
            (Value::Number(_), None) => {
                return Err(TransformError::unsupported(format!(
                    "'{id}': integer enum values require enumNames"
                )))
            }
            (other, _) => {
                return Err(TransformError::unsupported(format!(
                    "'{id}': enum values must be strings, found {}",
                    json_type_name(other)
                )))
            }
        };
        literals.push(literal);
    }
    Ok(Enum { literals })
}
