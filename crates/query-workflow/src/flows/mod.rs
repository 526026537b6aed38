pub mod query_flow;

pub use query_flow::steps::{ExecuteQueryStep, GenerateQueryStep, PublishResultsStep};
