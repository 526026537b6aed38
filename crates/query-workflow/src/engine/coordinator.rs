// Archivo: coordinator.rs
// Propósito: secuenciar los pasos de cada ejecución sobre la máquina de
// estados de `flow`.
//
// Cada ejecución corre en su propia tarea de tokio y ejecuta sus pasos en
// orden. El coordinador es el único que registra eventos; los pasos sólo
// devuelven su salida o un `StepError`.
use crate::errors::{Result, WorkflowError};
use crate::flows::{ExecuteQueryStep, GenerateQueryStep, PublishResultsStep};
use crate::step::{StepContext, StepError, WorkflowStep};
use crate::workflow_type::WorkflowType;
use chrono::Utc;
use flow::domain::{ErrorKind, RunState, RunStatus, WorkflowRequest};
use flow::engine::{FlowEngine, RunEvent};
use flow::errors::FlowError;
use flow::repository::RunRepository;
use query_providers::{QueryGenerator, ResultPublisher, SqlExecutor};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Mensaje registrado cuando la solicitud no trae texto de consulta.
pub const MISSING_QUERY_MESSAGE: &str = "Please provide query text.";
const NL_DISABLED_MESSAGE: &str = "el workflow de lenguaje natural no está configurado";
/// Intentos para dejar `Failed` una ejecución cuyo avance no se pudo
/// persistir.
const ABANDON_ATTEMPTS: u32 = 3;
const ABANDON_BACKOFF: Duration = Duration::from_millis(200);

pub struct WorkflowCoordinator {
  engine: FlowEngine<dyn RunRepository>,
  generate: Option<GenerateQueryStep>,
  execute: ExecuteQueryStep,
  publish: PublishResultsStep,
}

impl WorkflowCoordinator {
  /// `generator` es opcional: sin él sólo se aceptan consultas SQL literales.
  pub fn new(repo: Arc<dyn RunRepository>,
             generator: Option<Arc<dyn QueryGenerator>>,
             executor: Arc<dyn SqlExecutor>,
             publisher: Arc<dyn ResultPublisher>)
             -> Self {
    Self { engine: FlowEngine::new(repo),
           generate: generator.map(GenerateQueryStep::new),
           execute: ExecuteQueryStep::new(executor),
           publish: PublishResultsStep::new(publisher) }
  }

  pub fn natural_language_enabled(&self) -> bool {
    self.generate.is_some()
  }

  /// Crea la ejecución `Pending` sin lanzar pasos. Una consulta ausente o
  /// vacía deja la ejecución `Failed` de inmediato, aunque el workflow de
  /// lenguaje natural no esté configurado.
  pub async fn submit(&self, workflow: WorkflowType, query: Option<String>) -> Result<RunState> {
    let request =
      workflow.request(query)
              .ok_or_else(|| WorkflowError::Validation(format!("workflow desconocido: {}", workflow)))?;
    if request.query_text().is_some() {
      if request.is_natural_language && !self.natural_language_enabled() {
        return Err(WorkflowError::Configuration(NL_DISABLED_MESSAGE.into()));
      }
      let state = self.engine.create_run(workflow.name(), request).await?;
      log::info!("run {} aceptado (workflow={})", state.instance_id, workflow);
      return Ok(state);
    }
    let state = self.engine.create_run(workflow.name(), request).await?;
    log::warn!("run {} rechazado: consulta vacía", state.instance_id);
    let failed = self.engine
                     .record(&state.instance_id,
                             RunEvent::Failed { kind: ErrorKind::Validation,
                                                message: MISSING_QUERY_MESSAGE.into() })
                     .await?;
    Ok(failed)
  }

  /// Variante de `submit` que elige el workflow según `isNaturalLanguage`.
  pub async fn submit_request(&self, request: WorkflowRequest) -> Result<RunState> {
    self.submit(WorkflowType::for_request(&request), request.query).await
  }

  /// Crea la ejecución y lanza sus pasos en segundo plano. Devuelve el id
  /// sin esperar; los fallos de los pasos sólo se ven en el estado.
  pub async fn start(self: &Arc<Self>, workflow: WorkflowType, query: Option<String>) -> Result<Uuid> {
    let state = self.submit(workflow, query).await?;
    let id = state.instance_id;
    if state.status == RunStatus::Pending {
      let this = Arc::clone(self);
      tokio::spawn(async move {
        if let Err(e) = this.run(id).await {
          this.abandon(id, e).await;
        }
      });
    }
    Ok(id)
  }

  pub async fn start_request(self: &Arc<Self>, request: WorkflowRequest) -> Result<Uuid> {
    self.start(WorkflowType::for_request(&request), request.query).await
  }

  /// Ejecuta todos los pasos de una ejecución `Pending` hasta un estado
  /// terminal. Un `Err` indica un fallo de persistencia, no de un paso.
  pub async fn run(&self, instance_id: Uuid) -> Result<RunState> {
    let id = instance_id;
    let started = self.engine.record(&id, RunEvent::Started).await?;
    let mut ctx = StepContext::from_state(&started);

    let mut state = if started.request.is_natural_language {
      match &self.generate {
        Some(step) => self.perform(&id, step, &mut ctx).await?,
        None => self.fail(&id, StepError::validation(NL_DISABLED_MESSAGE)).await?,
      }
    } else {
      match ctx.query_text().map(str::to_string) {
        Some(sql) => {
          ctx.sql_query = Some(sql.clone());
          self.engine.record(&id, RunEvent::QueryResolved { sql }).await?
        }
        None => self.fail(&id, StepError::validation(MISSING_QUERY_MESSAGE)).await?,
      }
    };

    let remaining: [&dyn WorkflowStep; 2] = [&self.execute, &self.publish];
    for step in remaining {
      if state.is_terminal() {
        break;
      }
      state = self.perform(&id, step, &mut ctx).await?;
    }
    log::info!("run {} terminó en {} (versión {})", id, state.status, state.version);
    Ok(state)
  }

  async fn perform(&self, id: &Uuid, step: &dyn WorkflowStep, ctx: &mut StepContext) -> Result<RunState> {
    log::info!("run {}: paso {}", id, step.name());
    match step.execute(ctx).await {
      Ok(output) => Ok(self.engine.record(id, output.into_event()).await?),
      Err(e) => self.fail(id, e).await,
    }
  }

  async fn fail(&self, id: &Uuid, error: StepError) -> Result<RunState> {
    log::warn!("run {} falló: {}", id, error);
    Ok(self.engine.record(id, error.into_event()).await?)
  }

  /// Deja `Failed` una ejecución cuyo avance no se pudo persistir, para
  /// que quien consulta vea un estado terminal. Reintenta unas pocas veces;
  /// si la ejecución ya es terminal no hace nada.
  async fn abandon(&self, id: Uuid, error: WorkflowError) {
    log::error!("run {} abortado: {}", id, error);
    let message = error.to_string();
    for attempt in 1..=ABANDON_ATTEMPTS {
      let event = RunEvent::Failed { kind: ErrorKind::UpstreamService,
                                     message: message.clone() };
      match self.engine.record(&id, event).await {
        Ok(_) | Err(FlowError::InvalidTransition { .. }) | Err(FlowError::NotFound(_)) => return,
        Err(e) => {
          log::warn!("run {}: no se pudo registrar el fallo (intento {}): {}", id, attempt, e);
          tokio::time::sleep(ABANDON_BACKOFF * attempt).await;
        }
      }
    }
    log::error!("run {} queda sin estado terminal tras {} intentos", id, ABANDON_ATTEMPTS);
  }

  /// Lectura pura; puede llamarse cualquier número de veces.
  pub async fn get_status(&self, instance_id: &Uuid) -> Result<RunState> {
    Ok(self.engine.snapshot(instance_id).await?)
  }

  pub async fn list_runs(&self, status: Option<RunStatus>, limit: usize) -> Result<Vec<RunState>> {
    Ok(self.engine.list_runs(status, limit).await?)
  }

  /// Consulta el estado cada `interval` hasta que sea terminal. Con
  /// `timeout` devuelve `WorkflowError::Other` al agotarse.
  pub async fn wait_for_terminal(&self,
                                 instance_id: &Uuid,
                                 interval: Duration,
                                 timeout: Option<Duration>)
                                 -> Result<RunState> {
    let began = Instant::now();
    loop {
      let state = self.get_status(instance_id).await?;
      if state.is_terminal() {
        return Ok(state);
      }
      if let Some(limit) = timeout {
        if began.elapsed() >= limit {
          return Err(WorkflowError::Other(format!("timeout esperando el run {} (estado {})",
                                                  instance_id, state.status)));
        }
      }
      tokio::time::sleep(interval).await;
    }
  }

  /// Borra las ejecuciones terminales más antiguas que `retention`.
  pub async fn purge_expired(&self, retention: chrono::Duration) -> Result<u64> {
    Ok(self.engine.purge_terminal_before(Utc::now() - retention).await?)
  }
}
