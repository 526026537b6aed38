// error.rs
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
}

impl From<csv::Error> for DomainError {
  fn from(e: csv::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}
