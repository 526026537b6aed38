// Pool de conexiones PostgreSQL compartido por el ejecutor y la fuente de
// esquema.
//
// El driver `postgres` es síncrono: las conexiones se piden y se usan dentro
// del pool de hilos bloqueantes de tokio.
use crate::errors::{ProviderError, Result};
use crate::settings::DatabaseSettings;
use postgres::{Client, NoTls};
use r2d2_postgres::PostgresConnectionManager;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_POOL_SIZE: u32 = 4;
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

type Manager = PostgresConnectionManager<NoTls>;

/// Pool perezoso: no abre conexiones hasta la primera consulta.
#[derive(Clone)]
pub struct PgPool {
  inner: Option<r2d2::Pool<Manager>>,
  max_size: u32,
}

impl PgPool {
  pub fn new(settings: &DatabaseSettings) -> Self {
    Self::with_size(settings, DEFAULT_POOL_SIZE)
  }

  pub fn with_size(settings: &DatabaseSettings, max_size: u32) -> Self {
    let manager = PostgresConnectionManager::new(settings.pg_config(), NoTls);
    let pool = r2d2::Pool::builder().max_size(max_size)
                                    .min_idle(Some(0))
                                    .connection_timeout(CHECKOUT_TIMEOUT)
                                    .build_unchecked(manager);
    Self { inner: Some(pool),
           max_size }
  }

  /// Corre `f` con una conexión prestada en un hilo bloqueante.
  pub async fn run<T, F>(&self, f: F) -> Result<T>
    where T: Send + 'static,
          F: FnOnce(&mut Client) -> Result<T> + Send + 'static
  {
    let pool = self.inner
                   .clone()
                   .ok_or_else(|| ProviderError::Database("pool de conexiones cerrado".into()))?;
    tokio::task::spawn_blocking(move || {
      let mut conn = pool.get().map_err(|e| ProviderError::Database(e.to_string()))?;
      f(&mut *conn)
    }).await
      .map_err(|e| ProviderError::Database(format!("tarea de base de datos abortada: {}", e)))?
  }
}

impl fmt::Debug for PgPool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PgPool").field("max_size", &self.max_size).finish()
  }
}

// Cerrar un `postgres::Client` dentro de un runtime de tokio entra en pánico;
// el último handle se suelta en un hilo aparte.
impl Drop for PgPool {
  fn drop(&mut self) {
    if let Some(pool) = self.inner.take() {
      if tokio::runtime::Handle::try_current().is_ok() {
        std::thread::spawn(move || drop(pool));
      }
    }
  }
}
