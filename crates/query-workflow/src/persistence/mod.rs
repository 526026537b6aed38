pub mod repo_adapter;

pub use repo_adapter::RepoAdapter;
