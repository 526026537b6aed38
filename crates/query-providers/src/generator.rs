// Generación de SQL a partir de lenguaje natural.
use crate::completion::CompletionClient;
use crate::errors::{ProviderError, Result};
use crate::pool::PgPool;
use async_trait::async_trait;
use query_domain::{completion_to_select, SchemaPrompt};
use std::sync::Arc;

/// Traduce una consulta en lenguaje natural a una sentencia SQL literal.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
  async fn generate(&self, text_query: &str) -> Result<String>;
}

/// Fuente de las líneas de descripción del esquema usadas en el prompt.
#[async_trait]
pub trait SchemaSource: Send + Sync {
  async fn schema_lines(&self) -> Result<Vec<String>>;
}

/// Lee las líneas marcadas con `include` de la tabla de prompt.
#[derive(Debug, Clone)]
pub struct PostgresSchemaSource {
  pool: PgPool,
  table: String,
}

impl PostgresSchemaSource {
  pub const DEFAULT_TABLE: &'static str = "config.prompt";

  pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
    let table = table.into();
    // the table name is interpolated into SQL, so only identifiers are allowed
    if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
      return Err(ProviderError::Configuration(format!("nombre de tabla de prompt inválido: '{}'", table)));
    }
    Ok(Self { pool, table })
  }

  fn query(&self) -> String {
    format!("SELECT line FROM {} WHERE include IS TRUE", self.table)
  }
}

#[async_trait]
impl SchemaSource for PostgresSchemaSource {
  async fn schema_lines(&self) -> Result<Vec<String>> {
    let sql = self.query();
    self.pool
        .run(move |client| {
          let rows = client.query(sql.as_str(), &[])?;
          rows.iter()
              .map(|r| r.try_get::<_, Option<String>>(0).map(|v| v.unwrap_or_default()))
              .collect::<std::result::Result<Vec<_>, _>>()
              .map_err(ProviderError::from)
        })
        .await
  }
}

/// Generador que arma el prompt con el esquema y consulta el servicio de
/// completions.
pub struct CompletionQueryGenerator {
  schema: Arc<dyn SchemaSource>,
  completion: CompletionClient,
}

impl CompletionQueryGenerator {
  pub fn new(schema: Arc<dyn SchemaSource>, completion: CompletionClient) -> Self {
    Self { schema, completion }
  }
}

#[async_trait]
impl QueryGenerator for CompletionQueryGenerator {
  async fn generate(&self, text_query: &str) -> Result<String> {
    let lines = self.schema.schema_lines().await?;
    let prompt = SchemaPrompt::new(lines).render(text_query)
                                         .map_err(|e| ProviderError::Completion(e.to_string()))?;
    log::info!("prompt de {} caracteres para '{}'", prompt.len(), text_query);
    let body = self.completion.complete(&prompt).await?;
    Ok(completion_to_select(&body))
  }
}
