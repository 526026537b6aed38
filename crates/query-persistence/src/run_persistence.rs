// Archivo: run_persistence.rs
// Propósito: `RunRepository` durable sobre PostgreSQL.
//
// El driver `postgres` es síncrono: las conexiones salen de un pool r2d2 y
// se usan dentro del pool de hilos bloqueantes de tokio.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flow::domain::{PersistResult, RunState, RunStatus};
use flow::errors::{FlowError, Result};
use flow::repository::RunRepository;
use postgres::{Client, NoTls};
use r2d2_postgres::PostgresConnectionManager;
use std::time::Duration;
use uuid::Uuid;

mod embedded {
  refinery::embed_migrations!("migrations");
}

const TERMINAL_STATUSES: [&str; 2] = ["Completed", "Failed"];
const POOL_SIZE: u32 = 4;
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);
/// Migraciones concurrentes pueden chocar al crear el historial de refinery.
const MIGRATION_ATTEMPTS: u32 = 2;

type Pool = r2d2::Pool<PostgresConnectionManager<NoTls>>;

fn db_err(e: postgres::Error) -> FlowError {
  FlowError::Storage(format!("db: {}", e))
}

fn encode(state: &RunState) -> Result<String> {
  serde_json::to_string(state).map_err(|e| FlowError::Storage(format!("serialización: {}", e)))
}

fn decode(raw: &str) -> Result<RunState> {
  serde_json::from_str(raw).map_err(|e| FlowError::Storage(format!("estado corrupto: {}", e)))
}

/// Repositorio de ejecuciones en la tabla `workflow_runs`.
#[derive(Clone)]
pub struct PostgresRunRepository {
  pool: Option<Pool>,
  dbname: Option<String>,
}

impl std::fmt::Debug for PostgresRunRepository {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PostgresRunRepository")
     .field("dbname", &self.dbname)
     .field("pool_size", &POOL_SIZE)
     .finish()
  }
}

impl PostgresRunRepository {
  /// Conecta con `database_url` (formato `postgres://...` o clave=valor),
  /// arma el pool y aplica las migraciones pendientes.
  pub async fn connect(database_url: &str) -> Result<Self> {
    let config: postgres::Config = database_url.parse()
                                               .map_err(|e| FlowError::Storage(format!("URL de base de datos inválida: {}", e)))?;
    let dbname = config.get_dbname().map(str::to_string);
    let pool = r2d2::Pool::builder().max_size(POOL_SIZE)
                                    .min_idle(Some(0))
                                    .connection_timeout(CHECKOUT_TIMEOUT)
                                    .build_unchecked(PostgresConnectionManager::new(config, NoTls));
    let repo = Self { pool: Some(pool), dbname };
    repo.migrate().await?;
    log::info!("historial de ejecuciones listo en {:?}", repo.dbname);
    Ok(repo)
  }

  async fn migrate(&self) -> Result<()> {
    let mut attempt = 1;
    loop {
      let outcome = self.with_client(|c| {
                          embedded::migrations::runner().run(c)
                                                        .map_err(|e| FlowError::Storage(format!("migración: {}", e)))
                        })
                        .await;
      match outcome {
        Ok(report) => {
          for m in report.applied_migrations() {
            log::info!("migración aplicada: {}", m);
          }
          return Ok(());
        }
        Err(e) if attempt < MIGRATION_ATTEMPTS => {
          log::warn!("reintentando migración: {}", e);
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn with_client<T, F>(&self, f: F) -> Result<T>
    where T: Send + 'static,
          F: FnOnce(&mut Client) -> Result<T> + Send + 'static
  {
    let pool = self.pool
                   .clone()
                   .ok_or_else(|| FlowError::Storage("pool de conexiones cerrado".into()))?;
    tokio::task::spawn_blocking(move || {
      let mut conn = pool.get().map_err(|e| FlowError::Storage(format!("db: {}", e)))?;
      f(&mut *conn)
    }).await
      .map_err(|e| FlowError::Storage(format!("tarea de base de datos abortada: {}", e)))?
  }
}

// Cerrar un `postgres::Client` dentro de un runtime de tokio entra en pánico;
// el último handle se suelta en un hilo aparte.
impl Drop for PostgresRunRepository {
  fn drop(&mut self) {
    if let Some(pool) = self.pool.take() {
      if tokio::runtime::Handle::try_current().is_ok() {
        std::thread::spawn(move || drop(pool));
      }
    }
  }
}

/// Crea el repositorio a partir de `RUNS_DATABASE_URL` (se carga `.env` si
/// existe).
pub async fn new_from_env() -> Result<PostgresRunRepository> {
  dotenvy::dotenv().ok();
  let url = std::env::var("RUNS_DATABASE_URL").map_err(|_| FlowError::Storage("RUNS_DATABASE_URL no definida".into()))?;
  PostgresRunRepository::connect(&url).await
}

#[async_trait]
impl RunRepository for PostgresRunRepository {
  async fn insert_run(&self, state: &RunState) -> Result<()> {
    let id = state.instance_id;
    let workflow = state.workflow.clone();
    let status = state.status.as_str();
    let version = state.version;
    let created = state.created_at.timestamp_millis();
    let updated = state.updated_at.timestamp_millis();
    let raw = encode(state)?;
    let inserted = self.with_client(move |c| {
                         c.execute("INSERT INTO workflow_runs (instance_id, workflow, status, version, created_at_ts, \
                                    updated_at_ts, state) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (instance_id) \
                                    DO NOTHING",
                                   &[&id.to_string(), &workflow, &status, &version, &created, &updated, &raw])
                          .map_err(db_err)
                       })
                       .await?;
    if inserted == 0 {
      return Err(FlowError::Conflict(format!("run {} ya existe", id)));
    }
    Ok(())
  }

  async fn load_run(&self, instance_id: &Uuid) -> Result<Option<RunState>> {
    let id = instance_id.to_string();
    let raw: Option<String> = self.with_client(move |c| {
                                    let row = c.query_opt("SELECT state FROM workflow_runs WHERE instance_id = $1", &[&id])
                                               .map_err(db_err)?;
                                    Ok(row.map(|r| r.get::<_, String>(0)))
                                  })
                                  .await?;
    raw.as_deref().map(decode).transpose()
  }

  async fn save_run(&self, state: &RunState, expected_version: i64) -> Result<PersistResult> {
    let id = state.instance_id;
    let status = state.status.as_str();
    let version = state.version;
    let updated = state.updated_at.timestamp_millis();
    let raw = encode(state)?;
    let (updated_rows, exists) =
      self.with_client(move |c| {
            let key = id.to_string();
            let n = c.execute("UPDATE workflow_runs SET status = $1, version = $2, updated_at_ts = $3, state = $4 \
                               WHERE instance_id = $5 AND version = $6",
                              &[&status, &version, &updated, &raw, &key, &expected_version])
                     .map_err(db_err)?;
            if n > 0 {
              return Ok((n, true));
            }
            let found = c.query_opt("SELECT 1 FROM workflow_runs WHERE instance_id = $1", &[&key])
                         .map_err(db_err)?
                         .is_some();
            Ok((n, found))
          })
          .await?;
    if !exists {
      return Err(FlowError::NotFound(id));
    }
    if updated_rows == 0 {
      log::debug!("conflicto de versión en {} (esperada {})", id, expected_version);
      return Ok(PersistResult::Conflict);
    }
    Ok(PersistResult::Ok { new_version: version })
  }

  async fn list_runs(&self, status: Option<RunStatus>, limit: usize) -> Result<Vec<RunState>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let raws: Vec<String> =
      self.with_client(move |c| {
            let rows = match status {
              Some(s) => c.query("SELECT state FROM workflow_runs WHERE status = $1 ORDER BY created_at_ts DESC LIMIT $2",
                                 &[&s.as_str(), &limit]),
              None => c.query("SELECT state FROM workflow_runs ORDER BY created_at_ts DESC LIMIT $1", &[&limit]),
            }.map_err(db_err)?;
            Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
          })
          .await?;
    raws.iter().map(|r| decode(r)).collect()
  }

  async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
    let cutoff = cutoff.timestamp_millis();
    let removed = self.with_client(move |c| {
                        c.execute("DELETE FROM workflow_runs WHERE status IN ($1, $2) AND updated_at_ts < $3",
                                  &[&TERMINAL_STATUSES[0], &TERMINAL_STATUSES[1], &cutoff])
                         .map_err(db_err)
                      })
                      .await?;
    if removed > 0 {
      log::info!("purgadas {} ejecuciones terminales", removed);
    }
    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use flow::domain::WorkflowRequest;

  #[test]
  fn state_survives_json_encoding() {
    let s = RunState::new(Uuid::new_v4(), "nl-sql", WorkflowRequest::natural_language("all users"));
    let back = decode(&encode(&s).unwrap()).unwrap();
    assert_eq!(back, s);
  }

  #[test]
  fn corrupt_state_is_a_storage_error() {
    assert!(matches!(decode("{"), Err(FlowError::Storage(_))));
  }

  #[test]
  fn run_table_migration_is_embedded() {
    let runner = embedded::migrations::runner();
    let names: Vec<_> = runner.get_migrations().iter().map(|m| (m.version(), m.name().to_string())).collect();
    assert_eq!(names, vec![(1, "workflow_runs".to_string())]);
  }
}
