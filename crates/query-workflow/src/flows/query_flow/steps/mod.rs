pub mod execute_query_step2;
pub mod generate_query_step1;
pub mod publish_results_step3;

pub use execute_query_step2::ExecuteQueryStep;
pub use generate_query_step1::GenerateQueryStep;
pub use publish_results_step3::PublishResultsStep;
