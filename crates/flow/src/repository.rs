// Archivo: repository.rs
// Propósito: definir el trait `RunRepository`, el contrato que deben
// implementar las persistencias de ejecuciones (Postgres, in-memory, etc.).
use crate::domain::{PersistResult, RunState, RunStatus};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Contrato mínimo del repositorio de ejecuciones.
///
/// Cada `RunState` se guarda completo: no hay replay de eventos, el registro
/// almacenado es siempre el último estado aplicado.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Inserta una ejecución nueva. Falla con `Conflict` si el id ya existe.
    async fn insert_run(&self, state: &RunState) -> Result<()>;

    /// Carga el último estado de una ejecución, si existe.
    async fn load_run(&self, instance_id: &Uuid) -> Result<Option<RunState>>;

    /// Reemplaza el estado guardado si su versión coincide con
    /// `expected_version` (locking optimista). `NotFound` si no existe.
    async fn save_run(&self, state: &RunState, expected_version: i64) -> Result<PersistResult>;

    /// Ejecuciones más recientes primero (por `created_at`), filtradas por
    /// estado cuando se indica.
    async fn list_runs(&self, status: Option<RunStatus>, limit: usize) -> Result<Vec<RunState>>;

    /// Borra ejecuciones terminales cuya última actualización es anterior a
    /// `cutoff`. Devuelve cuántas se eliminaron.
    async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
