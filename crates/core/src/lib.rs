pub mod extract;
pub mod json;
pub mod outcome;
pub mod xsd;

pub use extract::{collect_locations, write_reports, Locations};
pub use json::{DocumentReport, JsonValidator, Violation};
pub use outcome::ValidationOutcome;
pub use xsd::CompiledSchema;
