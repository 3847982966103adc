use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// One JSON Schema violation, with JSON Pointer paths into the instance and
/// the schema.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub instance_path: String,
    pub schema_path: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "instance={}, schema={}: {}",
            self.instance_path, self.schema_path, self.message
        )
    }
}

/// Why a JSON Schema could not be turned into a validator. Same staging as
/// the XSD side: missing file, malformed JSON (with position), or a schema
/// the engine rejects.
#[derive(Debug, Error)]
pub enum JsonSchemaError {
    #[error("{message}")]
    NotFound { message: String },
    #[error("Line: {line}, Column: {column}\n{message}")]
    Parse {
        line: u64,
        column: u64,
        message: String,
    },
    #[error("{message}")]
    Compile { message: String },
}

#[derive(Debug, Error)]
pub enum JsonDataError {
    #[error("{message}")]
    NotFound { message: String },
    #[error("Line: {line}, Column: {column}\n{message}")]
    Parse {
        line: u64,
        column: u64,
        message: String,
    },
}

/// Outcome of validating one JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

/// A compiled JSON Schema validator.
pub struct JsonValidator {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for JsonValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonValidator").finish_non_exhaustive()
    }
}

impl JsonValidator {
    pub fn compile(path: &Path) -> Result<Self, JsonSchemaError> {
        let content = fs::read_to_string(path).map_err(|e| JsonSchemaError::NotFound {
            message: format!("{}: {}", path.display(), e),
        })?;
        let schema: Value =
            serde_json::from_str(&content).map_err(|e| JsonSchemaError::Parse {
                line: e.line() as u64,
                column: e.column() as u64,
                message: e.to_string(),
            })?;
        Self::from_value(&schema)
    }

    pub fn from_value(schema: &Value) -> Result<Self, JsonSchemaError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| JsonSchemaError::Compile {
                message: e.to_string(),
            })?;
        Ok(Self { validator })
    }

    /// Validate a parsed document. `fail_fast` stops at the first violation;
    /// otherwise every violation is collected.
    pub fn validate_value(&self, value: &Value, fail_fast: bool) -> DocumentReport {
        let violations: Vec<Violation> = if fail_fast {
            match self.validator.validate(value) {
                Ok(()) => Vec::new(),
                Err(err) => vec![violation_from(&err)],
            }
        } else {
            self.validator
                .iter_errors(value)
                .map(|err| violation_from(&err))
                .collect()
        };
        DocumentReport {
            valid: violations.is_empty(),
            violations,
        }
    }

    pub fn validate_file(&self, path: &Path, fail_fast: bool) -> Result<DocumentReport, JsonDataError> {
        let value = load_document(path)?;
        Ok(self.validate_value(&value, fail_fast))
    }
}

/// Read and parse a JSON data file, reporting the position of any parse
/// failure.
pub fn load_document(path: &Path) -> Result<Value, JsonDataError> {
    let content = fs::read_to_string(path).map_err(|e| JsonDataError::NotFound {
        message: format!("{}: {}", path.display(), e),
    })?;
    serde_json::from_str(&content).map_err(|e| JsonDataError::Parse {
        line: e.line() as u64,
        column: e.column() as u64,
        message: e.to_string(),
    })
}

fn violation_from(err: &jsonschema::ValidationError<'_>) -> Violation {
    Violation {
        instance_path: err.instance_path.to_string(),
        schema_path: err.schema_path.to_string(),
        message: err.to_string(),
    }
}
