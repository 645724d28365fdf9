//! Mapping between model-space classifier addresses and schema identifiers.
//!
//! A loaded classifier's identifier is `<namespace>/<Name>.json`. A proxy
//! carries its raw external address (`<namespace>#//<Name>`), which is
//! re-encoded through [`NAMESPACE_REWRITES`] so that built-in types land under
//! this system's own types namespace.

use url::Url;

use crate::error::TransformError;
use crate::model::ClassifierRef;
use crate::types::NAMESPACE_REWRITES;

fn to_schema_namespace(namespace: &str) -> &str {
    NAMESPACE_REWRITES
        .iter()
        .find(|(model, _)| *model == namespace)
        .map(|(_, schema)| *schema)
        .unwrap_or(namespace)
}

fn to_model_namespace(namespace: &str) -> &str {
    NAMESPACE_REWRITES
        .iter()
        .find(|(_, schema)| *schema == namespace)
        .map(|(model, _)| *model)
        .unwrap_or(namespace)
}

/// Identifier of classifier `name` in namespace `ns_uri`.
pub fn schema_id(ns_uri: &str, name: &str) -> String {
    format!("{}/{}.json", to_schema_namespace(ns_uri.trim_end_matches('/')), name)
}

/// Stable identifier for a classifier reference.
pub fn classifier_id(classifier: &ClassifierRef) -> Result<String, TransformError> {
    match classifier {
        ClassifierRef::Resolved { ns_uri, name } => Ok(schema_id(ns_uri, name)),
        ClassifierRef::Unresolved { proxy_uri } => proxy_uri_to_schema_id(proxy_uri),
    }
}

/// Checks that `identifier` is an absolute URI.
///
/// Only validates: namespaces are cut from the original text, so host case
/// and explicit ports survive the mapping.
fn validate(identifier: &str) -> Result<Url, TransformError> {
    Url::parse(identifier).map_err(|e| TransformError::invalid_id(identifier, e.to_string()))
}

/// Re-encodes a proxy address `<namespace>#//<Name>` as a schema identifier.
pub fn proxy_uri_to_schema_id(proxy_uri: &str) -> Result<String, TransformError> {
    validate(proxy_uri)?;
    let (namespace, name) = proxy_uri
        .split_once('#')
        .and_then(|(namespace, fragment)| Some((namespace, fragment.strip_prefix("//")?)))
        .filter(|(_, name)| !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| {
            TransformError::invalid_id(proxy_uri, "only top-level classifiers can be referenced")
        })?;
    Ok(schema_id(namespace, name))
}

/// Decodes a schema identifier into the equivalent proxy address.
pub fn schema_id_to_proxy_uri(id: &str) -> Result<String, TransformError> {
    let url = validate(id)?;
    let names_file = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .is_some_and(|segment| !segment.is_empty());
    let address = id.split(['#', '?']).next().unwrap_or(id);
    let (namespace, file) = address
        .rsplit_once('/')
        .filter(|_| names_file)
        .ok_or_else(|| TransformError::invalid_id(id, "identifier does not name a classifier"))?;
    let name = file.strip_suffix(".json").unwrap_or(file);
    if name.is_empty() {
        return Err(TransformError::invalid_id(id, "identifier does not name a classifier"));
    }
    Ok(format!("{}#//{}", to_model_namespace(namespace), name))
}

/// Unresolved handle for an identifier that is not registered.
pub fn identifier_to_proxy(id: &str) -> Result<ClassifierRef, TransformError> {
    schema_id_to_proxy_uri(id).map(ClassifierRef::proxy)
}

/// Package namespace prefix of a document identifier: everything before the
/// final path segment.
pub fn namespace_of(id: &str) -> Result<&str, TransformError> {
    id.rsplit_once('/')
        .map(|(namespace, _)| namespace)
        .filter(|namespace| !namespace.is_empty())
        .ok_or_else(|| TransformError::invalid_id(id, "identifier has no namespace"))
}

/// Identifier of feature `feature` on `owner`: `<classifier id>#/<feature>`.
pub fn reference_id(owner: &ClassifierRef, feature: &str) -> Result<String, TransformError> {
    Ok(format!("{}#/{}", classifier_id(owner)?, feature))
}

/// Splits an opposite identifier into classifier identifier and feature name.
pub fn split_reference_id(id: &str) -> Result<(&str, &str), TransformError> {
    let (classifier, fragment) = id
        .split_once('#')
        .ok_or_else(|| TransformError::invalid_id(id, "opposite has no '#/<feature>' fragment"))?;
    let feature = fragment.strip_prefix('/').unwrap_or(fragment);
    if classifier.is_empty() || feature.is_empty() {
        return Err(TransformError::invalid_id(id, "opposite must be '<classifier>#/<feature>'"));
    }
    Ok((classifier, feature))
}
