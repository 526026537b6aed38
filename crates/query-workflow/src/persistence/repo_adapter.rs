use crate::errors::Result;
use flow::repository::RunRepository;
use flow::stubs::InMemoryRunRepository;
use query_persistence::PostgresRunRepository;
use std::sync::Arc;

/// Punto central que decide dónde se guarda el historial de ejecuciones.
///
/// Con URL de base de datos se usa `PostgresRunRepository` (durable); sin
/// ella, el repositorio en memoria, que pierde el historial al reiniciar.
pub struct RepoAdapter;

impl RepoAdapter {
    pub async fn open(runs_database_url: Option<&str>) -> Result<Arc<dyn RunRepository>> {
        match runs_database_url {
            Some(url) => {
                let repo = PostgresRunRepository::connect(url).await?;
                Ok(Arc::new(repo))
            }
            None => {
                log::warn!("RUNS_DATABASE_URL no definida: historial de ejecuciones en memoria");
                Ok(Arc::new(InMemoryRunRepository::new()))
            }
        }
    }
}
