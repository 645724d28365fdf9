//! Meta-model domain model.
//!
//! Packages own classifiers, classifiers own their features and operations.
//! Everything relational (supertypes, feature types, opposites) is a
//! non-owning [`ClassifierRef`] or [`FeatureRef`] addressed by identity, so a
//! model can point at classifiers in packages that are not loaded.
//!
//! All types are serde-serializable; the external loader and sink persist
//! them as JSON.

use serde::{Deserialize, Serialize};

/// A namespace owning classifiers and, recursively, sub-packages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    /// Namespace URI; classifier identities are derived from it.
    pub ns_uri: String,
    /// Short name, written to `namespace` on every exported document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns_prefix: Option<String>,
    #[serde(default)]
    pub classifiers: Vec<Classifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subpackages: Vec<Package>,
}

impl Package {
    pub fn new(name: impl Into<String>, ns_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ns_uri: ns_uri.into(),
            ns_prefix: None,
            classifiers: Vec::new(),
            subpackages: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ns_prefix = Some(prefix.into());
        self
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifiers.push(classifier);
        self
    }

    pub fn with_subpackage(mut self, package: Package) -> Self {
        self.subpackages.push(package);
        self
    }

    pub fn classifier(&self, name: &str) -> Option<&Classifier> {
        self.classifiers.iter().find(|c| c.name == name)
    }

    /// Reference to a classifier owned by this package.
    pub fn classifier_ref(&self, name: &str) -> ClassifierRef {
        ClassifierRef::resolved(&self.ns_uri, name)
    }
}

/// A named type: class, enum or primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classifier {
    pub name: String,
    /// Declared generic parameters, by name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
    #[serde(flatten)]
    pub kind: ClassifierKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClassifierKind {
    Class(Class),
    Enum(Enum),
    Primitive(PrimitiveType),
}

impl Classifier {
    pub fn class(name: impl Into<String>, class: Class) -> Self {
        Self {
            name: name.into(),
            type_parameters: Vec::new(),
            kind: ClassifierKind::Class(class),
        }
    }

    pub fn enumeration(name: impl Into<String>, literals: Vec<EnumLiteral>) -> Self {
        Self {
            name: name.into(),
            type_parameters: Vec::new(),
            kind: ClassifierKind::Enum(Enum { literals }),
        }
    }

    pub fn primitive(name: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_parameters: Vec::new(),
            kind: ClassifierKind::Primitive(PrimitiveType {
                instance_type: instance_type.into(),
            }),
        }
    }

    pub fn with_type_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    pub fn as_class(&self) -> Option<&Class> {
        match &self.kind {
            ClassifierKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut Class> {
        match &mut self.kind {
            ClassifierKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Enum> {
        match &self.kind {
            ClassifierKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveType> {
        match &self.kind {
            ClassifierKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, ClassifierKind::Class(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Class {
    pub is_abstract: bool,
    pub is_interface: bool,
    pub supertypes: Supertypes,
    pub features: Vec<StructuralFeature>,
    pub operations: Vec<Operation>,
}

impl Class {
    pub fn feature(&self, name: &str) -> Option<&StructuralFeature> {
        self.features.iter().find(|f| f.name == name)
    }

    /// A reference feature declared directly on this class.
    pub fn reference(&self, name: &str) -> Option<&StructuralFeature> {
        self.features
            .iter()
            .find(|f| f.name == name && f.is_reference())
    }
}

/// Inheritance of a class.
///
/// Single non-generic inheritance uses [`Supertypes::Direct`]; multiple or
/// generic inheritance uses [`Supertypes::Generic`]. The two never mix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Supertypes {
    #[default]
    None,
    Direct(ClassifierRef),
    Generic(Vec<GenericType>),
}

impl Supertypes {
    /// Every supertype classifier, in declaration order.
    pub fn classifiers(&self) -> Vec<&ClassifierRef> {
        match self {
            Supertypes::None => Vec::new(),
            Supertypes::Direct(r) => vec![r],
            Supertypes::Generic(list) => list.iter().map(|g| &g.classifier).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Supertypes::None => true,
            Supertypes::Direct(_) => false,
            Supertypes::Generic(list) => list.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub literals: Vec<EnumLiteral>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumLiteral {
    pub name: String,
    pub value: i32,
    /// Distinct literal string; the name doubles as the literal when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl EnumLiteral {
    pub fn new(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            value,
            literal: None,
        }
    }

    pub fn with_literal(mut self, literal: impl Into<String>) -> Self {
        self.literal = Some(literal.into());
        self
    }

    /// The literal string, falling back to the name.
    pub fn literal_or_name(&self) -> &str {
        self.literal.as_deref().unwrap_or(&self.name)
    }
}

/// A data type bound to an external (host language) type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveType {
    pub instance_type: String,
}

/// Non-owning link to a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassifierRef {
    /// A classifier owned by a package that was loaded, by namespace URI and name.
    #[serde(rename_all = "camelCase")]
    Resolved { ns_uri: String, name: String },
    /// A proxy: the raw external address (`<namespace>#//<Name>`) of a
    /// classifier whose package is not loaded.
    #[serde(rename_all = "camelCase")]
    Unresolved { proxy_uri: String },
}

impl ClassifierRef {
    pub fn resolved(ns_uri: impl Into<String>, name: impl Into<String>) -> Self {
        ClassifierRef::Resolved {
            ns_uri: ns_uri.into(),
            name: name.into(),
        }
    }

    pub fn proxy(proxy_uri: impl Into<String>) -> Self {
        ClassifierRef::Unresolved {
            proxy_uri: proxy_uri.into(),
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, ClassifierRef::Unresolved { .. })
    }

    /// Classifier name; for proxies, the fragment after `#//`.
    pub fn name(&self) -> &str {
        match self {
            ClassifierRef::Resolved { name, .. } => name,
            ClassifierRef::Unresolved { proxy_uri } => proxy_uri
                .rsplit_once("#//")
                .map(|(_, name)| name)
                .unwrap_or(proxy_uri),
        }
    }
}

/// A feature `name` looked up on classifier `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRef {
    pub owner: ClassifierRef,
    pub name: String,
}

/// A classifier together with its bound type arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericType {
    pub classifier: ClassifierRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<TypeArgument>,
}

impl GenericType {
    pub fn of(classifier: ClassifierRef) -> Self {
        Self {
            classifier,
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, parameter: impl Into<String>, classifier: Option<ClassifierRef>) -> Self {
        self.arguments.push(TypeArgument {
            parameter: parameter.into(),
            classifier,
        });
        self
    }
}

/// Binding of a declared type parameter to a concrete classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeArgument {
    pub parameter: String,
    /// `None` when the argument's classifier cannot be determined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpperBound {
    Bounded(u32),
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Multiplicity {
    pub lower: u32,
    pub upper: UpperBound,
}

impl Default for Multiplicity {
    fn default() -> Self {
        Self::single()
    }
}

impl Multiplicity {
    /// `0..1`
    pub fn single() -> Self {
        Self {
            lower: 0,
            upper: UpperBound::Bounded(1),
        }
    }

    /// `1..1`
    pub fn required() -> Self {
        Self {
            lower: 1,
            upper: UpperBound::Bounded(1),
        }
    }

    /// `lower..*`
    pub fn unbounded(lower: u32) -> Self {
        Self {
            lower,
            upper: UpperBound::Unbounded,
        }
    }

    pub fn bounded(lower: u32, upper: u32) -> Self {
        Self {
            lower,
            upper: UpperBound::Bounded(upper),
        }
    }

    /// Any upper bound other than 1.
    pub fn is_many(&self) -> bool {
        self.upper != UpperBound::Bounded(1)
    }

    pub fn is_required(&self) -> bool {
        self.lower > 0
    }
}

/// Type and multiplicity shared by features, parameters and return types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypedElement {
    /// `None` until typed; the reverse transformer fills it in the wiring pass.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub generic_type: Option<GenericType>,
    pub multiplicity: Multiplicity,
    pub ordered: bool,
    pub unique: bool,
}

impl Default for TypedElement {
    fn default() -> Self {
        Self {
            generic_type: None,
            multiplicity: Multiplicity::single(),
            ordered: true,
            unique: true,
        }
    }
}

impl TypedElement {
    pub fn of(generic_type: GenericType) -> Self {
        Self {
            generic_type: Some(generic_type),
            ..Self::default()
        }
    }

    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralFeature {
    pub name: String,
    pub kind: FeatureKind,
    #[serde(default)]
    pub ty: TypedElement,
    #[serde(default = "yes")]
    pub changeable: bool,
    #[serde(default)]
    pub volatile: bool,
    #[serde(default)]
    pub derived: bool,
    #[serde(default)]
    pub transient: bool,
    /// Raw default literal, never parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKind {
    #[serde(rename_all = "camelCase")]
    Attribute {
        /// The attribute is the object's identifying key.
        #[serde(default)]
        is_id: bool,
    },
    #[serde(rename_all = "camelCase")]
    Reference {
        #[serde(default)]
        containment: bool,
        #[serde(default = "yes")]
        resolve_proxies: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opposite: Option<FeatureRef>,
    },
}

impl StructuralFeature {
    fn new(name: impl Into<String>, kind: FeatureKind, ty: TypedElement) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            changeable: true,
            volatile: false,
            derived: false,
            transient: false,
            default_value: None,
        }
    }

    pub fn attribute(name: impl Into<String>, ty: TypedElement) -> Self {
        Self::new(name, FeatureKind::Attribute { is_id: false }, ty)
    }

    pub fn reference(name: impl Into<String>, ty: TypedElement) -> Self {
        Self::new(
            name,
            FeatureKind::Reference {
                containment: false,
                resolve_proxies: true,
                opposite: None,
            },
            ty,
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FeatureKind::Reference { .. })
    }

    pub fn opposite(&self) -> Option<&FeatureRef> {
        match &self.kind {
            FeatureKind::Reference { opposite, .. } => opposite.as_ref(),
            FeatureKind::Attribute { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypedElement>,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub ty: TypedElement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplicity_many() {
        assert!(!Multiplicity::single().is_many());
        assert!(!Multiplicity::required().is_many());
        assert!(Multiplicity::unbounded(0).is_many());
        assert!(Multiplicity::bounded(2, 5).is_many());
        assert!(Multiplicity::bounded(0, 0).is_many());
    }

    #[test]
    fn proxy_ref_name() {
        let proxy = ClassifierRef::proxy("http://www.eclipse.org/emf/2002/Ecore#//EInt");
        assert!(proxy.is_proxy());
        assert_eq!(proxy.name(), "EInt");

        let resolved = ClassifierRef::resolved("http://example.com/coffee", "Machine");
        assert!(!resolved.is_proxy());
        assert_eq!(resolved.name(), "Machine");
    }

    #[test]
    fn classifier_serializes_with_kind_tag() {
        let classifier = Classifier::primitive("EInt", "int");
        let value = serde_json::to_value(&classifier).unwrap();
        assert_eq!(value["kind"], "primitive");
        assert_eq!(value["instanceType"], "int");

        let back: Classifier = serde_json::from_value(value).unwrap();
        assert_eq!(back, classifier);
    }

    #[test]
    fn feature_defaults_when_deserialized() {
        let feature: StructuralFeature = serde_json::from_value(serde_json::json!({
            "name": "parts",
            "kind": { "reference": {} }
        }))
        .unwrap();
        assert!(feature.changeable);
        assert!(feature.ty.ordered);
        assert!(feature.ty.unique);
        match feature.kind {
            FeatureKind::Reference {
                containment,
                resolve_proxies,
                ref opposite,
            } => {
                assert!(!containment);
                assert!(resolve_proxies);
                assert!(opposite.is_none());
            }
            _ => panic!("expected reference"),
        }
    }

    #[test]
    fn class_reference_lookup_skips_attributes() {
        let string = TypedElement::of(GenericType::of(ClassifierRef::resolved("ns", "EString")));
        let class = Class {
            features: vec![
                StructuralFeature::attribute("owner", string.clone()),
                StructuralFeature::reference("parts", string),
            ],
            ..Class::default()
        };
        assert!(class.reference("owner").is_none());
        assert!(class.reference("parts").is_some());
        assert!(class.feature("owner").is_some());
    }
}
