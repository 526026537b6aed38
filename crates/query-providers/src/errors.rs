use thiserror::Error;

/// Errores de los colaboradores externos. El mensaje del driver o del
/// servicio se conserva tal cual dentro de cada variante.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
  /// Parámetros de conexión ausentes o inválidos.
  #[error("Configuración inválida: {0}")]
  Configuration(String),
  /// Fallo de conexión o de ejecución en la base de datos.
  #[error("Error de base de datos: {0}")]
  Database(String),
  /// Fallo del servicio de completions (red, HTTP o respuesta inesperada).
  #[error("Error del servicio de completions: {0}")]
  Completion(String),
  /// Fallo del almacenamiento de objetos (subida, credenciales o firma).
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
}

impl ProviderError {
  /// Mensaje del driver o del servicio, sin el prefijo de la variante.
  pub fn message(&self) -> &str {
    match self {
      ProviderError::Configuration(m)
      | ProviderError::Database(m)
      | ProviderError::Completion(m)
      | ProviderError::Storage(m) => m,
    }
  }
}

impl From<postgres::Error> for ProviderError {
  fn from(e: postgres::Error) -> Self {
    Self::Database(e.to_string())
  }
}

impl From<query_domain::DomainError> for ProviderError {
  fn from(e: query_domain::DomainError) -> Self {
    Self::Database(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
