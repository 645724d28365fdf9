//! Document and model loading from various sources.
//!
//! Handles schema documents from files, strings, directories and HTTP URLs,
//! and meta-model packages persisted as JSON. The transformers never touch
//! the filesystem; everything on disk goes through here.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;
use crate::model::Package;
use crate::schema::SchemaNode;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: DeserializeOwned>(content: &str, origin: impl Into<String>) -> Result<T, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson {
        origin: origin.into(),
        source,
    })
}

fn write_file(path: &Path, content: &str) -> Result<(), LoadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| LoadError::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| LoadError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

fn to_json<T: Serialize>(value: &T, pretty: bool, origin: &Path) -> Result<String, LoadError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.map_err(|source| LoadError::InvalidJson {
        origin: origin.display().to_string(),
        source,
    })
}

/// Load raw JSON from a file path, without checking the vocabulary.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_value(path: &Path) -> Result<Value, LoadError> {
    parse(&read_file(path)?, path.display().to_string())
}

/// Load a schema document from a file path.
///
/// Unknown keywords are rejected as `LoadError::InvalidJson`.
pub fn load_document(path: &Path) -> Result<SchemaNode, LoadError> {
    parse(&read_file(path)?, path.display().to_string())
}

/// Load a schema document from a JSON string.
pub fn load_document_str(content: &str) -> Result<SchemaNode, LoadError> {
    parse(content, "<inline>")
}

/// Load every `.json` document under the given files and directories.
///
/// Directories are walked recursively and each one's files are taken in
/// sorted path order.
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<SchemaNode>, LoadError> {
    let mut documents = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(LoadError::FileNotFound { path: path.clone() });
        }
        for file in collect_document_files(path) {
            debug!("loading {}", file.display());
            documents.push(load_document(&file)?);
        }
    }
    Ok(documents)
}

/// Load a single package tree persisted as JSON.
pub fn load_package(path: &Path) -> Result<Package, LoadError> {
    parse(&read_file(path)?, path.display().to_string())
}

/// Persist packages as a JSON array.
pub fn save_packages(path: &Path, packages: &[Package], pretty: bool) -> Result<(), LoadError> {
    write_file(path, &to_json(&packages, pretty, path)?)
}

/// Write documents keyed by relative path (`Name.json`, `sub/Name.json`)
/// under `dir`, creating sub-directories as needed.
///
/// Returns the written paths in key order.
pub fn write_documents(
    dir: &Path,
    documents: &IndexMap<String, SchemaNode>,
    pretty: bool,
) -> Result<Vec<PathBuf>, LoadError> {
    let mut written = Vec::with_capacity(documents.len());
    for (key, document) in documents {
        let path = dir.join(key);
        let mut text = to_json(document, pretty, &path)?;
        text.push('\n');
        write_file(&path, &text)?;
        written.push(path);
    }
    Ok(written)
}

/// Load a schema document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or `LoadError::InvalidJson` if the body isn't a valid document.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<SchemaNode, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(network)?;

    let body = response.text().map_err(network)?;
    parse(&body, url)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_document_auto(source: &str) -> Result<SchemaNode, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Collect all .json files in a path (file or directory), sorted.
pub fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, Classifier};
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn load_document_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"title": "Machine", "type": ["object", "null"]}}"#).unwrap();

        let document = load_document(file.path()).unwrap();
        assert_eq!(document.title.as_deref(), Some("Machine"));
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_document(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_document_rejects_unknown_keyword() {
        let result = load_document_str(r#"{"title": "Machine", "patternProperties": {}}"#);
        assert!(matches!(result, Err(LoadError::InvalidJson { ref origin, .. }) if origin == "<inline>"));
    }

    #[test]
    fn load_value_accepts_any_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"anything": [1, 2]}}"#).unwrap();
        assert_eq!(load_value(file.path()).unwrap()["anything"][1], 2);
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/Machine.json"));
        assert!(is_url("http://example.com/Machine.json"));
        assert!(!is_url("/path/to/Machine.json"));
        assert!(!is_url("Machine.json"));
    }

    #[test]
    fn load_document_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "string"}}"#).unwrap();

        let document = load_document_auto(file.path().to_str().unwrap()).unwrap();
        assert!(document.is_simple_type());
    }

    #[test]
    fn load_documents_walks_directories_in_order() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("parts")).unwrap();
        std::fs::write(dir.path().join("B.json"), r#"{"title": "B"}"#).unwrap();
        std::fs::write(dir.path().join("A.json"), r#"{"title": "A"}"#).unwrap();
        std::fs::write(dir.path().join("parts/C.json"), r#"{"title": "C"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let documents = load_documents(&[dir.path().to_path_buf()]).unwrap();
        let titles: Vec<_> = documents.iter().filter_map(|d| d.title.as_deref()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn load_documents_missing_path() {
        let result = load_documents(&[PathBuf::from("/nonexistent/dir")]);
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn write_documents_creates_nested_dirs() {
        let dir = tempdir().unwrap();
        let mut documents = IndexMap::new();
        documents.insert("Machine.json".to_string(), SchemaNode::reference_to("x"));
        documents.insert("parts/Grinder.json".to_string(), SchemaNode::reference_to("y"));

        let written = write_documents(dir.path(), &documents, true).unwrap();
        assert_eq!(written.len(), 2);
        let grinder = load_document(&dir.path().join("parts/Grinder.json")).unwrap();
        assert_eq!(grinder.schema_ref.as_deref(), Some("y"));
    }

    #[test]
    fn packages_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/model.json");
        let package = Package::new("coffee", "http://example.com/coffee")
            .with_classifier(Classifier::class("Machine", Class::default()));

        save_packages(&path, std::slice::from_ref(&package), false).unwrap();
        let value = load_value(&path).unwrap();
        assert_eq!(value[0]["nsUri"], "http://example.com/coffee");

        std::fs::write(&path, serde_json::to_string(&package).unwrap()).unwrap();
        assert_eq!(load_package(&path).unwrap(), package);
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_document_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/coffee/Machine.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"$id": "http://example.com/coffee/Machine.json", "title": "Machine"}"#)
                .create();

            let url = format!("{}/coffee/Machine.json", server.url());
            let document = load_document_url(&url).unwrap();
            assert_eq!(document.title.as_deref(), Some("Machine"));
            mock.assert();
        }

        #[test]
        fn load_document_url_404() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let result = load_document_url(&format!("{}/missing.json", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }

        #[test]
        fn load_document_url_bad_body() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/broken.json")
                .with_status(200)
                .with_body("{ not json")
                .create();

            let url = format!("{}/broken.json", server.url());
            let result = load_document_url(&url);
            assert!(matches!(result, Err(LoadError::InvalidJson { ref origin, .. }) if *origin == url));
        }

        #[test]
        fn load_document_auto_url() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/A.json")
                .with_status(200)
                .with_body(r#"{"title": "A"}"#)
                .create();

            let document = load_document_auto(&format!("{}/A.json", server.url())).unwrap();
            assert_eq!(document.title.as_deref(), Some("A"));
        }
    }
}
