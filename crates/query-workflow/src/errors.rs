use thiserror::Error;

// Errores comunes del coordinador de workflows.
//
// Los fallos de un paso NO llegan aquí: se registran en el `RunState` como
// `Failed`. Este enum cubre lo que sí se devuelve al llamador: persistencia,
// configuración y validación de la solicitud.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Errores originados por la capa de persistencia/flow crate.
  #[error("Error de flujo: {0}")]
  Flow(#[from] flow::errors::FlowError),

  /// Errores de los valores de dominio (CSV, prompt).
  #[error("Error de dominio: {0}")]
  Domain(#[from] query_domain::DomainError),

  /// Errores de un colaborador externo fuera de un paso (por ejemplo al
  /// construirlo).
  #[error("Error de proveedor: {0}")]
  Provider(#[from] query_providers::ProviderError),

  /// Variables de entorno ausentes o inválidas.
  #[error("Error de configuración: {0}")]
  Configuration(String),

  /// Solicitud inválida (workflow desconocido, parámetros fuera de rango).
  #[error("Error de validacion: {0}")]
  Validation(String),

  /// Error generico: captura otros tipos de errores no tipados.
  #[error("Otro error: {0}")]
  Other(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
