// Ejecución de SQL contra PostgreSQL y serialización del resultado a CSV.
use crate::errors::Result;
use crate::pool::PgPool;
use async_trait::async_trait;
use postgres::SimpleQueryMessage;
use query_domain::{ResultArtifact, ResultTable};

/// Ejecuta una sentencia SQL y devuelve el resultado como CSV.
///
/// No reintenta: cualquier fallo de conexión o ejecución se devuelve con el
/// mensaje del driver.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
  async fn execute(&self, sql: &str) -> Result<ResultArtifact>;
}

/// Ejecutor sobre el driver síncrono `postgres` con conexiones del pool.
#[derive(Debug, Clone)]
pub struct PostgresSqlExecutor {
  pool: PgPool,
}

impl PostgresSqlExecutor {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl SqlExecutor for PostgresSqlExecutor {
  /// Usa el protocolo simple: todos los valores llegan como texto, así que
  /// cualquier tipo de columna se serializa sin conversiones.
  async fn execute(&self, sql: &str) -> Result<ResultArtifact> {
    let sql = sql.to_string();
    log::debug!("ejecutando SQL ({} caracteres)", sql.len());
    let table = self.pool
                    .run(move |client| {
                      let messages = client.simple_query(&sql)?;
                      table_from_messages(messages)
                    })
                    .await?;
    Ok(table.to_csv()?)
  }
}

/// Arma la tabla del último conjunto de resultados (como hace un cursor
/// cuando se envían varias sentencias).
fn table_from_messages(messages: Vec<SimpleQueryMessage>) -> Result<ResultTable> {
  let mut table = ResultTable::default();
  let mut described = false;
  for msg in messages {
    match msg {
      SimpleQueryMessage::RowDescription(columns) => {
        table = ResultTable::new(columns.iter().map(|c| c.name().to_string()).collect());
        described = true;
      }
      SimpleQueryMessage::Row(row) => {
        if !described {
          table = ResultTable::new(row.columns().iter().map(|c| c.name().to_string()).collect());
          described = true;
        }
        let cells = (0..row.len()).map(|i| row.get(i).map(str::to_string)).collect();
        table.push_row(cells)?;
      }
      _ => {}
    }
  }
  Ok(table)
}
