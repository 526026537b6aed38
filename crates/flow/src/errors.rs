// Archivo: errors.rs
// Propósito: definir los errores del modelo de ejecuciones (runs) y el alias
// Result<T> usado por las APIs del crate.
use crate::domain::{RunStatus, StepKind};
use thiserror::Error;
use uuid::Uuid;

/// Errores comunes del dominio de ejecuciones.
///
/// - `NotFound`: ejecución no encontrada.
/// - `Conflict`: conflicto de concurrencia o versión.
/// - `InvalidTransition`: el evento no aplica al estado actual.
/// - `Storage`: error al acceder al almacenamiento externo.
/// - `Other`: cualquier otro error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Ejecución no encontrada.
    #[error("No encontrado: run {0}")]
    NotFound(Uuid),
    /// Conflicto optimista (version/expected mismatch).
    #[error("Conflicto: {0}")]
    Conflict(String),
    /// El evento no es válido para el estado/paso actual de la ejecución.
    #[error("Transición inválida: {event} en estado {status:?} (paso {step:?})")]
    InvalidTransition {
        event: &'static str,
        status: RunStatus,
        step: StepKind,
    },
    /// Error genérico de almacenamiento (BD, etc.).
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    /// Otro tipo de error.
    #[error("Otro: {0}")]
    Other(String),
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;
