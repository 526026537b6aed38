use crate::step::StepContext;
use async_trait::async_trait;
use flow::domain::{ErrorKind, StepKind};
use flow::engine::RunEvent;
use query_providers::ProviderError;
use std::fmt;

/// Resultado exitoso de un paso. Cada variante se traduce en exactamente un
/// evento de la máquina de estados.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutput {
    QueryResolved { sql: String },
    QueryExecuted { row_count: usize },
    ResultsPublished { url: String },
}

impl StepOutput {
    pub fn into_event(self) -> RunEvent {
        match self {
            StepOutput::QueryResolved { sql } => RunEvent::QueryResolved { sql },
            StepOutput::QueryExecuted { row_count } => RunEvent::QueryExecuted { row_count },
            StepOutput::ResultsPublished { url } => RunEvent::ResultsPublished { url },
        }
    }
}

/// Fallo capturado en la frontera del paso. El mensaje se registra tal cual
/// en el `RunState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Validation,
               message: message.into() }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::UpstreamService,
               message: message.into() }
    }

    pub fn into_event(self) -> RunEvent {
        RunEvent::Failed { kind: self.kind,
                           message: self.message }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl From<ProviderError> for StepError {
    fn from(e: ProviderError) -> Self {
        StepError::upstream(e.message())
    }
}

pub type StepResult = Result<StepOutput, StepError>;

/// Trait que representa un paso del flujo.
///
/// Un paso no toca el repositorio: recibe el contexto de la ejecución,
/// llama a su colaborador externo y devuelve la salida o el error. El
/// coordinador decide qué evento registrar.
#[async_trait]
pub trait WorkflowStep: Send + Sync {
    /// Paso de la máquina de estados que implementa.
    fn kind(&self) -> StepKind;

    /// Nombre o identificador del paso
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Ejecuta la logica del paso y devuelve el resultado
    async fn execute(&self, ctx: &mut StepContext) -> StepResult;
}
