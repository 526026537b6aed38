//! query-providers: colaboradores externos del flujo de consultas.
//!
//! Cada colaborador se expone como un trait async para que el coordinador
//! pueda sustituirlo por los stubs de `stubs` en pruebas:
//!
//! - `SqlExecutor`: ejecuta SQL en PostgreSQL y produce el CSV.
//! - `QueryGenerator`: traduce lenguaje natural a SQL vía completions.
//! - `ResultPublisher`: sube el CSV a Blob Storage y firma la URL de lectura.

pub mod completion;
pub mod errors;
pub mod executor;
pub mod generator;
pub mod pool;
pub mod settings;
pub mod storage;
pub mod stubs;

pub use completion::CompletionClient;
pub use errors::{ProviderError, Result};
pub use executor::{PostgresSqlExecutor, SqlExecutor};
pub use generator::{CompletionQueryGenerator, PostgresSchemaSource, QueryGenerator, SchemaSource};
pub use pool::PgPool;
pub use settings::{CompletionSettings, DatabaseSettings, StorageCredential, StorageSettings};
pub use storage::{AzureBlobPublisher, ResultPublisher};
