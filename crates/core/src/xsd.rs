use std::fs::File;
use std::path::Path;

use libxml::error::StructuredError;
use libxml::schemas::{SchemaParserContext, SchemaValidationContext};
use thiserror::Error;

use crate::outcome::ValidationOutcome;

/// Why an XSD could not be turned into a usable validator.
///
/// The three variants mirror the three distinct failure reports of the
/// runner: a missing file, a schema that is not well-formed (with the
/// position of the parse failure), and everything else the engine rejects.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{message}")]
    NotFound { message: String },
    #[error("Line: {line}, Column: {column}\n{message}")]
    Parse {
        line: u64,
        column: u64,
        message: String,
    },
    #[error("{message}")]
    Other { message: String },
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct DataError {
    pub message: String,
}

/// An XSD compiled by libxml2, ready to validate documents.
pub struct CompiledSchema {
    ctx: SchemaValidationContext,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile the schema at `path`.
    pub fn compile(path: &Path) -> Result<Self, SchemaError> {
        // check the file ourselves first: libxml reports a missing schema as
        // a generic "failed to load" without the OS error text
        if let Err(e) = File::open(path) {
            return Err(SchemaError::NotFound {
                message: format!("{}: {}", path.display(), e),
            });
        }
        let path_str = path.to_str().ok_or_else(|| SchemaError::Other {
            message: format!("schema path is not valid UTF-8: {}", path.display()),
        })?;
        let mut parser = SchemaParserContext::from_file(path_str);
        match SchemaValidationContext::from_parser(&mut parser) {
            Ok(ctx) => Ok(Self { ctx }),
            Err(errors) => Err(classify_compile_errors(errors)),
        }
    }

    /// Validate the document at `path`, reporting the first violation.
    ///
    /// The engine accumulates every error it finds; only the first is
    /// surfaced, since validation outcomes report a single failure.
    pub fn validate_file(&mut self, path: &Path) -> Result<ValidationOutcome, DataError> {
        if let Err(e) = File::open(path) {
            return Err(DataError {
                message: format!("{}: {}", path.display(), e),
            });
        }
        let path_str = path.to_str().ok_or_else(|| DataError {
            message: format!("data path is not valid UTF-8: {}", path.display()),
        })?;
        match self.ctx.validate_file(path_str) {
            Ok(()) => Ok(ValidationOutcome::Success),
            Err(errors) => Ok(first_failure(&errors)),
        }
    }
}

fn error_message(err: &StructuredError) -> String {
    err.message
        .as_deref()
        .map(|m| m.trim_end().to_string())
        .unwrap_or_else(|| "unknown validation error".to_string())
}

fn error_position(err: &StructuredError) -> (Option<u64>, Option<u64>) {
    let line = err.line.and_then(|v| u64::try_from(v).ok()).filter(|v| *v > 0);
    let column = err.col.and_then(|v| u64::try_from(v).ok()).filter(|v| *v > 0);
    (line, column)
}

fn classify_compile_errors(errors: Vec<StructuredError>) -> SchemaError {
    let Some(first) = errors.first() else {
        return SchemaError::Other {
            message: "schema compilation failed".to_string(),
        };
    };
    let message = error_message(first);
    match error_position(first) {
        (Some(line), column) => SchemaError::Parse {
            line,
            column: column.unwrap_or(0),
            message,
        },
        _ => SchemaError::Other { message },
    }
}

fn first_failure(errors: &[StructuredError]) -> ValidationOutcome {
    let Some(first) = errors.first() else {
        return ValidationOutcome::Failure {
            message: "validation failed".to_string(),
            line: None,
            column: None,
        };
    };
    let (line, column) = error_position(first);
    ValidationOutcome::Failure {
        message: error_message(first),
        line,
        column,
    }
}
