// Archivo: engine.rs
// Propósito: máquina de estados de una ejecución y el `FlowEngine` que la
// combina con el repositorio.
//
// Nota: las transiciones son funciones puras de (estado actual, evento); el
// engine sólo carga, aplica y persiste con control optimista. La ejecución de
// los pasos (side-effects) vive fuera de este crate.
use crate::domain::{ErrorKind, PersistResult, RunState, RunStatus, StepKind, WorkflowRequest};
use crate::errors::{FlowError, Result};
use crate::repository::RunRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Eventos que hacen avanzar una ejecución.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// `Pending -> Running`.
    Started,
    /// Se conoce el SQL a ejecutar (generado o literal).
    QueryResolved { sql: String },
    /// El SQL se ejecutó; el artefacto CSV queda en memoria del run.
    QueryExecuted { row_count: usize },
    /// El artefacto se publicó y se obtuvo la URL firmada.
    ResultsPublished { url: String },
    /// Fallo capturado en la frontera de un paso (o validación previa).
    Failed { kind: ErrorKind, message: String },
}

impl RunEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::Started => "Started",
            RunEvent::QueryResolved { .. } => "QueryResolved",
            RunEvent::QueryExecuted { .. } => "QueryExecuted",
            RunEvent::ResultsPublished { .. } => "ResultsPublished",
            RunEvent::Failed { .. } => "Failed",
        }
    }
}

/// Aplica `event` sobre `state` usando la hora actual.
pub fn apply(state: &RunState, event: RunEvent) -> Result<RunState> {
    apply_at(state, event, Utc::now())
}

/// Aplica `event` sobre `state` y devuelve el nuevo estado con `version`
/// incrementada. No modifica la entrada: un error deja el estado intacto.
///
/// Los estados terminales rechazan cualquier evento y `current_step` sólo
/// avanza hacia adelante.
pub fn apply_at(state: &RunState, event: RunEvent, now: DateTime<Utc>) -> Result<RunState> {
    let invalid = |event: &RunEvent| FlowError::InvalidTransition { event: event.name(),
                                                                    status: state.status,
                                                                    step: state.current_step };
    if state.is_terminal() {
        return Err(invalid(&event));
    }

    let mut next = state.clone();
    match &event {
        RunEvent::Started => {
            if state.status != RunStatus::Pending {
                return Err(invalid(&event));
            }
            next.status = RunStatus::Running;
        }
        RunEvent::QueryResolved { sql } => {
            let step_ok = match state.current_step {
                StepKind::GenerateQuery => state.request.is_natural_language,
                StepKind::ExecuteQuery => !state.request.is_natural_language,
                _ => false,
            };
            if state.status != RunStatus::Running || state.sql_query.is_some() || !step_ok {
                return Err(invalid(&event));
            }
            next.sql_query = Some(sql.clone());
            advance(&mut next, StepKind::ExecuteQuery);
        }
        RunEvent::QueryExecuted { .. } => {
            if state.status != RunStatus::Running
               || state.current_step != StepKind::ExecuteQuery
               || state.sql_query.is_none()
            {
                return Err(invalid(&event));
            }
            advance(&mut next, StepKind::Publish);
        }
        RunEvent::ResultsPublished { url } => {
            if state.status != RunStatus::Running || state.current_step != StepKind::Publish {
                return Err(invalid(&event));
            }
            next.results_file_url = Some(url.clone());
            next.status = RunStatus::Completed;
            advance(&mut next, StepKind::Done);
        }
        RunEvent::Failed { kind, message } => {
            next.status = RunStatus::Failed;
            next.error_kind = Some(*kind);
            next.error_message = Some(message.clone());
        }
    }

    next.version = state.version + 1;
    next.updated_at = now;
    Ok(next)
}

fn advance(state: &mut RunState, step: StepKind) {
    if step != state.current_step {
        state.current_step = step;
        state.step_history.push(step);
    }
}

/// Motor de ejecuciones: crea registros, aplica eventos y persiste.
///
/// Responsabilidades principales:
/// - Crear el `RunState` inicial y guardarlo
/// - Cargar → aplicar (`apply`) → guardar con `expected_version`
/// - Exponer lecturas (snapshot, listados) y la purga por retención
///
/// Un `PersistResult::Conflict` se traduce en `FlowError::Conflict`: cada
/// ejecución tiene un único escritor (su tarea), así que un conflicto indica
/// un error de programación o una escritura concurrente externa.
pub struct FlowEngine<R>
    where R: RunRepository + ?Sized
{
    repo: Arc<R>,
}

impl<R> FlowEngine<R> where R: RunRepository + ?Sized
{
    /// Crea una nueva instancia del motor sobre el repositorio inyectado.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Repositorio subyacente.
    pub fn repository(&self) -> Arc<R> {
        self.repo.clone()
    }

    /// Crea y persiste una ejecución `Pending`. Retorna el estado creado.
    pub async fn create_run(&self, workflow: &str, request: WorkflowRequest) -> Result<RunState> {
        let state = RunState::new(Uuid::new_v4(), workflow, request);
        self.repo.insert_run(&state).await?;
        log::debug!("run {} creado (workflow={})", state.instance_id, workflow);
        Ok(state)
    }

    /// Carga la ejecución, aplica el evento y persiste el resultado.
    pub async fn record(&self, instance_id: &Uuid, event: RunEvent) -> Result<RunState> {
        let current = self.snapshot(instance_id).await?;
        let event_name = event.name();
        let next = apply(&current, event)?;
        match self.repo.save_run(&next, current.version).await? {
            PersistResult::Ok { .. } => {
                log::debug!("run {}: {} -> {} / {}", instance_id, event_name, next.status, next.current_step);
                Ok(next)
            }
            PersistResult::Conflict => {
                Err(FlowError::Conflict(format!("run {} cambió durante {} (versión esperada {})",
                                                instance_id, event_name, current.version)))
            }
        }
    }

    /// Lectura pura del estado actual.
    pub async fn snapshot(&self, instance_id: &Uuid) -> Result<RunState> {
        self.repo
            .load_run(instance_id)
            .await?
            .ok_or(FlowError::NotFound(*instance_id))
    }

    /// Lista ejecuciones recientes, opcionalmente filtradas por estado.
    pub async fn list_runs(&self, status: Option<RunStatus>, limit: usize) -> Result<Vec<RunState>> {
        self.repo.list_runs(status, limit).await
    }

    /// Elimina ejecuciones terminales actualizadas antes de `cutoff`.
    pub async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.repo.purge_terminal_before(cutoff).await
    }
}
