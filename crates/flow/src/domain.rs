// Archivo: domain.rs
// Propósito: tipos del modelo de ejecuciones: la solicitud inmutable
// (`WorkflowRequest`), el registro por instancia (`RunState`) y los enums de
// estado y paso. Los nombres serializados usan camelCase porque viajan tal
// cual hacia los clientes que consultan el estado.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Solicitud enviada por el cliente. Inmutable una vez aceptada.
///
/// `query` es opcional a nivel de tipo para poder distinguir "campo ausente"
/// de "texto vacío"; ambos casos terminan la ejecución como `Failed` por
/// validación antes de que corra ningún paso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub is_natural_language: bool,
}

impl WorkflowRequest {
    /// Solicitud con SQL literal.
    pub fn literal(sql: impl Into<String>) -> Self {
        Self { query: Some(sql.into()),
               is_natural_language: false }
    }

    /// Solicitud en lenguaje natural.
    pub fn natural_language(text: impl Into<String>) -> Self {
        Self { query: Some(text.into()),
               is_natural_language: true }
    }

    /// Texto de la consulta si existe y no está en blanco.
    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }
}

/// Estado global de una ejecución.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// `Completed` y `Failed` no admiten más transiciones.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "Pending",
            RunStatus::Running => "Running",
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("estado desconocido: {}", other)),
        }
    }
}

/// Paso actual de la ejecución. El orden de las variantes es el orden en que
/// avanzan los pasos; `Ord` se usa para comprobar que el avance es monótono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StepKind {
    GenerateQuery,
    ExecuteQuery,
    Publish,
    Done,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::GenerateQuery => "GenerateQuery",
            StepKind::ExecuteQuery => "ExecuteQuery",
            StepKind::Publish => "Publish",
            StepKind::Done => "Done",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GenerateQuery" => Ok(StepKind::GenerateQuery),
            "ExecuteQuery" => Ok(StepKind::ExecuteQuery),
            "Publish" => Ok(StepKind::Publish),
            "Done" => Ok(StepKind::Done),
            other => Err(format!("paso desconocido: {}", other)),
        }
    }
}

/// Clasificación del fallo registrado en una ejecución.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Entrada inválida (consulta ausente o vacía).
    Validation,
    /// Fallo de la base de datos, del servicio de completions o del
    /// almacenamiento de objetos.
    UpstreamService,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation",
            ErrorKind::UpstreamService => "UpstreamService",
        }
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Validation" => Ok(ErrorKind::Validation),
            "UpstreamService" => Ok(ErrorKind::UpstreamService),
            other => Err(format!("tipo de error desconocido: {}", other)),
        }
    }
}

/// Registro por instancia mantenido por el coordinador.
///
/// Invariantes (garantizadas por `engine::apply`):
/// - `sql_query` se fija antes que `results_file_url`.
/// - `results_file_url` existe sí y sólo sí `status == Completed`.
/// - `error_message` existe sí y sólo sí `status == Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub instance_id: Uuid,
    /// Nombre del workflow que originó la ejecución (por ejemplo `nl-sql`).
    pub workflow: String,
    pub request: WorkflowRequest,
    pub status: RunStatus,
    pub current_step: StepKind,
    /// Todos los valores que tomó `current_step`, en orden.
    pub step_history: Vec<StepKind>,
    pub sql_query: Option<String>,
    pub results_file_url: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    /// Versión para control optimista; se incrementa con cada transición.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Crea el estado inicial `Pending`. El primer paso depende del tipo de
    /// solicitud: las consultas literales empiezan directamente en
    /// `ExecuteQuery`.
    pub fn new(instance_id: Uuid, workflow: impl Into<String>, request: WorkflowRequest) -> Self {
        let first_step = if request.is_natural_language {
            StepKind::GenerateQuery
        } else {
            StepKind::ExecuteQuery
        };
        let now = Utc::now();
        Self { instance_id,
               workflow: workflow.into(),
               request,
               status: RunStatus::Pending,
               current_step: first_step,
               step_history: vec![first_step],
               sql_query: None,
               results_file_url: None,
               error_kind: None,
               error_message: None,
               version: 0,
               created_at: now,
               updated_at: now }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Resultado de persistir con control optimista.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistResult {
    Ok { new_version: i64 },
    Conflict,
}
