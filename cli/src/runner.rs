//! The XSD validation runner: compile one schema, validate one data file,
//! report to the chosen sink, return the process exit code.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use mrf_core::xsd::{CompiledSchema, SchemaError};
use mrf_core::ValidationOutcome;

/// Run one validation. `args` are the positional arguments: schema path,
/// data path, and optionally an output path (standard output otherwise).
///
/// Every failure mode short-circuits with exit code 1. Only the validation
/// result itself goes to the chosen sink; all earlier errors go to standard
/// error, and the usage message goes to standard output.
pub fn run(args: &[String]) -> u8 {
    let (schema_path, data_path, output_path) = match args {
        [schema, data] => (schema, data, None),
        [schema, data, output] => (schema, data, Some(output)),
        _ => {
            println!("Usage: mrf-validator <path to schema> <path to data> [path to output]");
            return 1;
        }
    };

    // The output file is created before the schema is compiled; if
    // compilation then fails, the (empty) file stays on disk untouched.
    let mut sink: Box<dyn Write> = match output_path {
        Some(path) => match File::create(path) {
            Ok(file) => Box::new(file),
            Err(_) => {
                eprintln!("Unable to open file {path} for output.");
                return 1;
            }
        },
        None => Box::new(io::stdout()),
    };

    let mut schema = match CompiledSchema::compile(Path::new(schema_path)) {
        Ok(schema) => schema,
        Err(SchemaError::NotFound { message }) => {
            eprintln!("Error opening schema: {message}");
            return 1;
        }
        Err(SchemaError::Parse {
            line,
            column,
            message,
        }) => {
            eprintln!("Error parsing schema:\nLine: {line}, Column: {column}");
            eprintln!("{message}");
            return 1;
        }
        Err(SchemaError::Other { message }) => {
            eprintln!("{message}");
            return 1;
        }
    };

    match schema.validate_file(Path::new(data_path)) {
        Err(err) => {
            eprintln!("Error opening data file: {}", err.message);
            1
        }
        Ok(ValidationOutcome::Success) => {
            let _ = writeln!(sink, "Validation successful.");
            0
        }
        Ok(ValidationOutcome::Failure {
            message,
            line,
            column,
        }) => {
            let _ = writeln!(sink, "Validation failure.");
            if let Some(line) = line {
                let _ = writeln!(sink, "Line: {line}, Column: {}", column.unwrap_or(0));
            }
            let _ = writeln!(sink, "{message}");
            1
        }
    }
}
