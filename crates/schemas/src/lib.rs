use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

/// Schema targets published for machine-readable files.
pub const KNOWN_TARGETS: &[&str] = &[
    "allowed-amounts",
    "in-network-rates",
    "provider-reference",
    "table-of-contents",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not find a schema version named \"{requested}\". Available versions are:\n{}", .available.join("\n"))]
    UnknownVersion {
        requested: String,
        available: Vec<String>,
    },
    #[error("no version selected; call use_version first")]
    NoVersionSelected,
    #[error("no schema for target \"{target}\" in version {version}")]
    MissingSchema { version: String, target: String },
    #[error("failed to read schema {path}: {reason}")]
    SchemaRead { path: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A local schema repository laid out as
/// `<repo>/<version>/schemas/<target>/<target>.json`.
///
/// Prepared schemas (optionally made strict) are staged in a temporary
/// directory that lives as long as the store, and cached per
/// (target, version, strictness).
pub struct SchemaStore {
    repo_dir: PathBuf,
    staging: tempfile::TempDir,
    version: Option<String>,
    staged: HashMap<String, PathBuf>,
}

impl SchemaStore {
    pub fn open(repo_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self {
            repo_dir: repo_dir.into(),
            staging: tempfile::tempdir()?,
            version: None,
            staged: HashMap::new(),
        })
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Versions available in the repository, sorted by name.
    pub fn list_versions(&self) -> Result<Vec<String>, StoreError> {
        let mut versions = Vec::new();
        if self.repo_dir.is_dir() {
            for entry in fs::read_dir(&self.repo_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    if let Ok(name) = entry.file_name().into_string() {
                        versions.push(name);
                    }
                }
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Select a version, erroring with the available ones when it is absent.
    pub fn use_version(&mut self, version: &str) -> Result<(), StoreError> {
        if self.version.as_deref() == Some(version) {
            return Ok(());
        }
        let available = self.list_versions()?;
        if available.iter().any(|v| v == version) {
            self.version = Some(version.to_string());
            Ok(())
        } else {
            Err(StoreError::UnknownVersion {
                requested: version.to_string(),
                available,
            })
        }
    }

    /// Targets that have a schema file in the selected version.
    pub fn available_targets(&self) -> Result<Vec<String>, StoreError> {
        let version = self.version.as_deref().ok_or(StoreError::NoVersionSelected)?;
        let root = self.repo_dir.join(version).join("schemas");
        let mut targets = Vec::new();
        for entry in WalkDir::new(&root)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json" || ext == "xsd") {
                if let Some(target) = path
                    .parent()
                    .and_then(Path::file_name)
                    .and_then(|n| n.to_str())
                {
                    targets.push(target.to_string());
                }
            }
        }
        targets.sort();
        targets.dedup();
        Ok(targets)
    }

    /// Stage the schema for `target`, applying the strict transformation when
    /// asked, and return the staged path.
    pub fn prepare(&mut self, target: &str, strict: bool) -> Result<PathBuf, StoreError> {
        let version = self
            .version
            .clone()
            .ok_or(StoreError::NoVersionSelected)?;
        let staged_name = format!(
            "{target}-{version}-{}.json",
            if strict { "strict" } else { "loose" }
        );
        if let Some(path) = self.staged.get(&staged_name) {
            return Ok(path.clone());
        }
        let source = self
            .repo_dir
            .join(&version)
            .join("schemas")
            .join(target)
            .join(format!("{target}.json"));
        if !source.is_file() {
            return Err(StoreError::MissingSchema {
                version,
                target: target.to_string(),
            });
        }
        let mut contents = fs::read_to_string(&source)?;
        if strict {
            let mut schema: Value =
                serde_json::from_str(&contents).map_err(|e| StoreError::SchemaRead {
                    path: source.display().to_string(),
                    reason: e.to_string(),
                })?;
            make_schema_strict(&mut schema);
            contents = schema.to_string();
        }
        let staged_path = self.staging.path().join(&staged_name);
        fs::write(&staged_path, contents)?;
        self.staged.insert(staged_name, staged_path.clone());
        Ok(staged_path)
    }
}

/// Forbid undeclared properties at the top level and at the first level of
/// `definitions`. Nested definitions are left alone.
pub fn make_schema_strict(schema: &mut Value) {
    if let Value::Object(map) = schema {
        map.insert("additionalProperties".to_string(), Value::Bool(false));
        if let Some(Value::Object(defs)) = map.get_mut("definitions") {
            for def in defs.values_mut() {
                if let Value::Object(def_map) = def {
                    def_map.insert("additionalProperties".to_string(), Value::Bool(false));
                }
            }
        }
    }
}

/// What an XSD declares, for `schemas` listings.
#[derive(Debug, Clone)]
pub struct XsdSummary {
    pub target_namespace: Option<String>,
    pub root_elements: Vec<String>,
}

pub fn describe_xsd(path: &Path) -> Result<XsdSummary, StoreError> {
    let text = fs::read_to_string(path)?;
    let doc = roxmltree::Document::parse(&text).map_err(|e| StoreError::SchemaRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let root = doc.root_element();
    let target_namespace = root.attribute("targetNamespace").map(str::to_string);
    let root_elements = root
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "element")
        .filter_map(|c| c.attribute("name"))
        .map(str::to_string)
        .collect();
    Ok(XsdSummary {
        target_namespace,
        root_elements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed_repo() -> tempfile::TempDir {
        let repo = tempfile::tempdir().unwrap();
        for version in ["v1.0.0", "v2.0.0"] {
            let dir = repo
                .path()
                .join(version)
                .join("schemas")
                .join("in-network-rates");
            fs::create_dir_all(&dir).unwrap();
            let schema = json!({
                "type": "object",
                "properties": { "in_network": { "type": "array" } },
                "definitions": {
                    "rate": { "type": "object", "properties": { "amount": { "type": "number" } } }
                }
            });
            fs::write(dir.join("in-network-rates.json"), schema.to_string()).unwrap();
        }
        repo
    }

    #[test]
    fn versions_are_listed_sorted() {
        let repo = seed_repo();
        let store = SchemaStore::open(repo.path()).unwrap();
        assert_eq!(store.list_versions().unwrap(), vec!["v1.0.0", "v2.0.0"]);
    }

    #[test]
    fn unknown_version_error_names_available_versions() {
        let repo = seed_repo();
        let mut store = SchemaStore::open(repo.path()).unwrap();
        let err = store.use_version("v9.9.9").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("\"v9.9.9\""));
        assert!(text.contains("v1.0.0"));
        assert!(text.contains("v2.0.0"));
    }

    #[test]
    fn prepare_stages_loose_schema() {
        let repo = seed_repo();
        let mut store = SchemaStore::open(repo.path()).unwrap();
        store.use_version("v1.0.0").unwrap();
        let staged = store.prepare("in-network-rates", false).unwrap();
        assert!(staged
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("v1.0.0-loose.json"));
        let schema: Value = serde_json::from_str(&fs::read_to_string(&staged).unwrap()).unwrap();
        assert!(schema.get("additionalProperties").is_none());
    }

    #[test]
    fn prepare_strict_rewrites_schema() {
        let repo = seed_repo();
        let mut store = SchemaStore::open(repo.path()).unwrap();
        store.use_version("v1.0.0").unwrap();
        let staged = store.prepare("in-network-rates", true).unwrap();
        let schema: Value = serde_json::from_str(&fs::read_to_string(&staged).unwrap()).unwrap();
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
        assert_eq!(
            schema["definitions"]["rate"]["additionalProperties"],
            Value::Bool(false)
        );
    }

    #[test]
    fn prepare_is_cached_per_strictness() {
        let repo = seed_repo();
        let mut store = SchemaStore::open(repo.path()).unwrap();
        store.use_version("v1.0.0").unwrap();
        let loose = store.prepare("in-network-rates", false).unwrap();
        let strict = store.prepare("in-network-rates", true).unwrap();
        assert_ne!(loose, strict);
        assert_eq!(loose, store.prepare("in-network-rates", false).unwrap());
    }

    #[test]
    fn missing_target_is_an_error() {
        let repo = seed_repo();
        let mut store = SchemaStore::open(repo.path()).unwrap();
        store.use_version("v1.0.0").unwrap();
        let err = store.prepare("table-of-contents", false).unwrap_err();
        assert!(matches!(err, StoreError::MissingSchema { .. }));
    }

    #[test]
    fn available_targets_reflect_repo_contents() {
        let repo = seed_repo();
        let mut store = SchemaStore::open(repo.path()).unwrap();
        store.use_version("v2.0.0").unwrap();
        assert_eq!(store.available_targets().unwrap(), vec!["in-network-rates"]);
    }

    #[test]
    fn strict_leaves_nested_definitions_alone() {
        let mut schema = json!({
            "definitions": {
                "outer": {
                    "definitions": { "inner": { "type": "object" } }
                }
            }
        });
        make_schema_strict(&mut schema);
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
        assert_eq!(
            schema["definitions"]["outer"]["additionalProperties"],
            Value::Bool(false)
        );
        assert!(schema["definitions"]["outer"]["definitions"]["inner"]
            .get("additionalProperties")
            .is_none());
    }

    #[test]
    fn describe_xsd_reports_namespace_and_roots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xsd");
        fs::write(
            &path,
            r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="https://example.com/mrf">
  <xs:element name="reportingPlan" type="xs:string"/>
</xs:schema>"#,
        )
        .unwrap();
        let summary = describe_xsd(&path).unwrap();
        assert_eq!(
            summary.target_namespace.as_deref(),
            Some("https://example.com/mrf")
        );
        assert_eq!(summary.root_elements, vec!["reportingPlan"]);
    }
}
