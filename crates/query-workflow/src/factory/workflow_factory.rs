use crate::config::WorkflowConfig;
use crate::engine::WorkflowCoordinator;
use crate::errors::{Result, WorkflowError};
use crate::persistence::RepoAdapter;
use flow::repository::RunRepository;
use flow::stubs::InMemoryRunRepository;
use query_providers::stubs::{StubQueryGenerator, StubResultPublisher, StubSqlExecutor};
use query_providers::{AzureBlobPublisher, CompletionClient, CompletionQueryGenerator, PgPool, PostgresSchemaSource,
                      PostgresSqlExecutor, QueryGenerator};
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Fábrica del coordinador.
///
/// `from_config` conecta los proveedores reales; `offline` arma uno con los
/// stubs de `query-providers` y repositorio en memoria, útil para demos y
/// pruebas sin servicios externos.
pub struct WorkflowFactory;

impl WorkflowFactory {
  pub async fn from_config(cfg: &WorkflowConfig) -> Result<Arc<WorkflowCoordinator>> {
    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT)
                                         .build()
                                         .map_err(|e| WorkflowError::Configuration(format!("cliente HTTP: {}", e)))?;
    let repo = RepoAdapter::open(cfg.runs_database_url.as_deref()).await?;
    let pool = PgPool::new(&cfg.database);

    let generator: Option<Arc<dyn QueryGenerator>> = match &cfg.completion {
      Some(settings) => {
        let schema = PostgresSchemaSource::new(pool.clone(), cfg.prompt_table.clone())?;
        let client = CompletionClient::new(http.clone(), settings.clone());
        Some(Arc::new(CompletionQueryGenerator::new(Arc::new(schema), client)))
      }
      None => {
        log::warn!("OPENAI_ENDPOINT no definido: sólo se aceptan consultas SQL literales");
        None
      }
    };
    let executor = Arc::new(PostgresSqlExecutor::new(pool));
    let publisher = Arc::new(AzureBlobPublisher::new(http, cfg.storage.clone()));
    log::info!("coordinador listo: base {}:{}/{}, contenedor {}/{}",
               cfg.database.host,
               cfg.database.port,
               cfg.database.database,
               cfg.storage.account,
               cfg.storage.container);
    Ok(Arc::new(WorkflowCoordinator::new(repo, generator, executor, publisher)))
  }

  /// Coordinador sin servicios externos: el generador devuelve `sql`, el
  /// ejecutor una tabla fija de dos filas y el publicador una URL firmada
  /// sobre una cuenta ficticia.
  pub fn offline(sql: &str) -> Arc<WorkflowCoordinator> {
    let repo: Arc<dyn RunRepository> = Arc::new(InMemoryRunRepository::new());
    Arc::new(WorkflowCoordinator::new(repo,
                                      Some(Arc::new(StubQueryGenerator::returning(sql))),
                                      Arc::new(StubSqlExecutor::with_sample_rows()),
                                      Arc::new(StubResultPublisher::new())))
  }
}
