mod errors;
mod prompt;
mod result_table;

pub use errors::DomainError;
pub use prompt::{completion_to_select, SchemaPrompt, PRIMING_TOKEN};
pub use result_table::{artifact_file_name, ResultArtifact, ResultTable};
