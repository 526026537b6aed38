pub mod coordinator;

pub use coordinator::{WorkflowCoordinator, MISSING_QUERY_MESSAGE};
