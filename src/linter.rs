//! Document linting - static analysis of a directory of schema documents.
//!
//! Checks each file for:
//! - JSON syntax errors (E001)
//! - keywords outside the closed vocabulary (E002)
//! - missing `$id` (E003) or `title` (E004) on the top-level document
//! - an `$id` already used by another file in the set (E005)
//! - `$ref` / `opposite` targets that no file defines and that are not
//!   built-in types; these would import as proxies (W001)
//! - missing `namespace` (W002)

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidateError;
use crate::identifier::schema_id;
use crate::loader::{collect_document_files, load_value};
use crate::types::builtin_package;
use crate::validator::{compile_metaschema, validate_with};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/properties/owner/$ref")
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &str, file: &Path, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            file: file.to_path_buf(),
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(code: &str, file: &Path, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, file, path, message)
        }
    }
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files. Identifiers
/// are checked across the whole set. If `strict` is true, warnings are
/// treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_document_files(path);

    let loaded: Vec<(PathBuf, Result<Value, String>)> = files
        .iter()
        .map(|file| (file.clone(), load_value(file).map_err(|e| e.to_string())))
        .collect();

    let mut known: HashSet<String> = builtin_ids();
    let mut owners: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for (file, value) in &loaded {
        if let Some(id) = value.as_ref().ok().and_then(|v| v.get("$id")).and_then(Value::as_str) {
            known.insert(id.to_string());
            owners.entry(id.to_string()).or_default().push(file.clone());
        }
    }

    let validator = compile_metaschema();
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for (file, value) in &loaded {
        let mut diagnostics = match value {
            Ok(document) => {
                let mut diagnostics = check_document(document, file, &validator);
                check_targets(document, file, "", &known, &mut diagnostics);
                check_duplicate(document, file, &owners, &mut diagnostics);
                diagnostics
            }
            Err(message) => vec![Diagnostic::error(
                "E001",
                file,
                "/",
                format!("syntax error: {}", message),
            )],
        };
        diagnostics.sort_by(|a, b| a.code.cmp(&b.code));

        total_errors += diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result(file, path, diagnostics));
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single document on its own.
///
/// Cross-file checks (E005, W001) need the whole set and only run in
/// [`lint`].
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let diagnostics = match load_value(file) {
        Ok(document) => check_document(&document, file, &compile_metaschema()),
        Err(e) => vec![Diagnostic::error(
            "E001",
            file,
            "/",
            format!("syntax error: {}", e),
        )],
    };
    file_result(file, base_path, diagnostics)
}

fn file_result(file: &Path, base_path: &Path, diagnostics: Vec<Diagnostic>) -> FileResult {
    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

fn builtin_ids() -> HashSet<String> {
    let builtins = builtin_package();
    builtins
        .classifiers
        .iter()
        .map(|c| schema_id(&builtins.ns_uri, &c.name))
        .collect()
}

/// Single-file checks: vocabulary and top-level identity.
fn check_document(
    document: &Value,
    file: &Path,
    validator: &Result<Validator, ValidateError>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    match validator {
        Ok(validator) => {
            if let Err(ValidateError::Invalid { errors }) = validate_with(validator, document) {
                for error in errors {
                    let path = if error.path.is_empty() {
                        "/".to_string()
                    } else {
                        error.path
                    };
                    diagnostics.push(Diagnostic::error("E002", file, path, error.message));
                }
            }
        }
        Err(e) => diagnostics.push(Diagnostic::error("E002", file, "/", e.to_string())),
    }

    if document.get("$id").is_none() {
        diagnostics.push(Diagnostic::error(
            "E003",
            file,
            "/",
            "document missing $id field",
        ));
    }
    if document.get("title").is_none() {
        diagnostics.push(Diagnostic::error(
            "E004",
            file,
            "/",
            "document missing title field",
        ));
    }
    if document.get("namespace").is_none() {
        diagnostics.push(Diagnostic::warning(
            "W002",
            file,
            "/",
            "document missing namespace field",
        ));
    }
    diagnostics
}

fn check_duplicate(
    document: &Value,
    file: &Path,
    owners: &HashMap<String, Vec<PathBuf>>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(id) = document.get("$id").and_then(Value::as_str) else {
        return;
    };
    let Some(files) = owners.get(id) else {
        return;
    };
    if files.len() > 1 {
        let others: Vec<String> = files
            .iter()
            .filter(|f| f.as_path() != file)
            .map(|f| f.display().to_string())
            .collect();
        diagnostics.push(Diagnostic::error(
            "E005",
            file,
            "/$id",
            format!("duplicate $id {} (also in {})", id, others.join(", ")),
        ));
    }
}

/// Recursively check `$ref` and `opposite` targets against the known set.
fn check_targets(
    value: &Value,
    file: &Path,
    path: &str,
    known: &HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("$ref") {
                check_target(target, "$ref", file, path, known, diagnostics);
            }
            if let Some(Value::String(opposite)) = map.get("opposite") {
                let target = opposite.split('#').next().unwrap_or(opposite);
                check_target(target, "opposite", file, path, known, diagnostics);
            }

            for (key, val) in map {
                let child_path = format!("{}/{}", path, key);
                check_targets(val, file, &child_path, known, diagnostics);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let child_path = format!("{}/{}", path, i);
                check_targets(item, file, &child_path, known, diagnostics);
            }
        }
        _ => {}
    }
}

fn check_target(
    target: &str,
    keyword: &str,
    file: &Path,
    path: &str,
    known: &HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if target.starts_with('#') || known.contains(target) {
        return;
    }
    diagnostics.push(Diagnostic::warning(
        "W001",
        file,
        format!("{}/{}", path, keyword),
        format!("{} is not defined in this set and will import as a proxy", target),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TYPES_ID_PREFIX;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn write(dir: &Path, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn lint_valid_document() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
            "$id": "http://example.com/coffee/Machine.json",
            "title": "Machine",
            "namespace": "coffee",
            "type": ["object", "null"],
            "properties": {{
                "cups": {{ "$ref": "{TYPES_ID_PREFIX}/EInt.json" }}
            }}
        }}"#
        )
        .unwrap();

        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Ok);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn directory_shares_one_validator() {
        let dir = tempdir().unwrap();
        for name in ["A", "B", "C"] {
            write(
                dir.path(),
                &format!("{name}.json"),
                json!({
                    "$id": format!("http://example.com/coffee/{name}.json"),
                    "title": name,
                    "namespace": "coffee"
                }),
            );
        }
        write(
            dir.path(),
            "D.json",
            json!({
                "$id": "http://example.com/coffee/D.json",
                "title": "D",
                "namespace": "coffee",
                "minLength": 1
            }),
        );

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 4);
        assert_eq!(result.failed, 1);
        let failing: Vec<_> = result
            .results
            .iter()
            .filter(|r| r.status == FileStatus::Error)
            .collect();
        assert_eq!(failing[0].file, PathBuf::from("D.json"));
        assert!(failing[0].diagnostics.iter().all(|d| d.code == "E002"));
    }

    #[test]
    fn unusable_metaschema_still_checks_identity() {
        let broken = Err(ValidateError::MetaSchema {
            message: "unreachable $ref".to_string(),
        });
        let diagnostics = check_document(&json!({}), Path::new("x.json"), &broken);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["E002", "E003", "E004", "W002"]);
        assert!(diagnostics[0].message.contains("unreachable $ref"));
    }

    #[test]
    fn lint_invalid_json_syntax() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not valid json }}").unwrap();

        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E001");
    }

    #[test]
    fn lint_unknown_keyword() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
            "$id": "http://example.com/coffee/Machine.json",
            "title": "Machine",
            "namespace": "coffee",
            "properties": {{
                "serial": {{ "type": "string", "pattern": "^[A-Z]+$" }}
            }}
        }}"#
        )
        .unwrap();

        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Error);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == "E002" && d.path.starts_with("/properties/serial")));
    }

    #[test]
    fn lint_missing_identity() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "type": ["object", "null"] }}"#).unwrap();

        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Error);
        let codes: Vec<_> = result.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert!(codes.contains(&"E003"));
        assert!(codes.contains(&"E004"));
        assert!(codes.contains(&"W002"));
    }

    #[test]
    fn lint_missing_namespace_warning() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{ "$id": "http://example.com/coffee/Machine.json", "title": "Machine" }}"#
        )
        .unwrap();

        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Warning);
        assert!(result.diagnostics.iter().any(|d| d.code == "W002"));
    }

    #[test]
    fn lint_directory() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "Machine.json",
            serde_json::json!({
                "$id": "http://example.com/coffee/Machine.json",
                "title": "Machine",
                "namespace": "coffee"
            }),
        );
        std::fs::write(dir.path().join("broken.json"), "{ not json }").unwrap();

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn lint_unknown_target_warns() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "Machine.json",
            serde_json::json!({
                "$id": "http://example.com/coffee/Machine.json",
                "title": "Machine",
                "namespace": "coffee",
                "$ref": "http://example.com/coffee/Appliance.json",
                "properties": {
                    "owner": {
                        "$ref": "http://example.com/people/Person.json",
                        "reference": true,
                        "opposite": "http://example.com/people/Person.json#/machines"
                    },
                    "cups": { "$ref": format!("{TYPES_ID_PREFIX}/EInt.json") }
                }
            }),
        );
        write(
            dir.path(),
            "Appliance.json",
            serde_json::json!({
                "$id": "http://example.com/coffee/Appliance.json",
                "title": "Appliance",
                "namespace": "coffee"
            }),
        );

        let result = lint(dir.path(), false);
        assert!(result.is_ok());
        let machine = result
            .results
            .iter()
            .find(|r| r.file == Path::new("Machine.json"))
            .unwrap();
        let paths: Vec<_> = machine
            .diagnostics
            .iter()
            .filter(|d| d.code == "W001")
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec!["/properties/owner/$ref", "/properties/owner/opposite"]
        );
    }

    #[test]
    fn lint_duplicate_id() {
        let dir = tempdir().unwrap();
        let document = serde_json::json!({
            "$id": "http://example.com/coffee/Machine.json",
            "title": "Machine",
            "namespace": "coffee"
        });
        write(dir.path(), "A.json", document.clone());
        write(dir.path(), "B.json", document);

        let result = lint(dir.path(), false);
        assert_eq!(result.failed, 2);
        assert!(result
            .results
            .iter()
            .all(|r| r.diagnostics.iter().any(|d| d.code == "E005")));
    }

    #[test]
    fn lint_strict_mode() {
        let dir = tempdir().unwrap();
        // Warning only (missing namespace)
        let file_path = write(
            dir.path(),
            "Machine.json",
            serde_json::json!({
                "$id": "http://example.com/coffee/Machine.json",
                "title": "Machine"
            }),
        );

        let result = lint(&file_path, false);
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 0);

        let result = lint(&file_path, true);
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 1);
    }
}
