// Archivo: stubs.rs
// Propósito: implementación en memoria del repositorio para pruebas y para
// ejecutar el servidor sin base de datos de ejecuciones.
//
// No es durable: al reiniciar el proceso se pierde el historial.
use crate::domain::{PersistResult, RunState, RunStatus};
use crate::errors::{FlowError, Result};
use crate::repository::RunRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Repositorio en memoria indexado por `instance_id`.
///
/// Usa un mapa concurrente: las ejecuciones no comparten estado entre sí y
/// cada escritura sólo bloquea el shard de su propia clave.
#[derive(Debug, Default)]
pub struct InMemoryRunRepository {
    runs: DashMap<Uuid, RunState>,
}

impl InMemoryRunRepository {
    /// Crea una nueva instancia del repositorio en memoria.
    pub fn new() -> Self {
        Self { runs: DashMap::new() }
    }

    /// Número de ejecuciones almacenadas.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn insert_run(&self, state: &RunState) -> Result<()> {
        match self.runs.entry(state.instance_id) {
            Entry::Occupied(_) => Err(FlowError::Conflict(format!("run {} ya existe", state.instance_id))),
            Entry::Vacant(slot) => {
                slot.insert(state.clone());
                Ok(())
            }
        }
    }

    async fn load_run(&self, instance_id: &Uuid) -> Result<Option<RunState>> {
        Ok(self.runs.get(instance_id).map(|r| r.value().clone()))
    }

    /// Reemplaza el estado sólo si la versión almacenada es la esperada.
    async fn save_run(&self, state: &RunState, expected_version: i64) -> Result<PersistResult> {
        let mut stored = self.runs
                             .get_mut(&state.instance_id)
                             .ok_or(FlowError::NotFound(state.instance_id))?;
        if stored.version != expected_version {
            return Ok(PersistResult::Conflict);
        }
        *stored = state.clone();
        Ok(PersistResult::Ok { new_version: state.version })
    }

    async fn list_runs(&self, status: Option<RunStatus>, limit: usize) -> Result<Vec<RunState>> {
        let mut out: Vec<RunState> = self.runs
                                         .iter()
                                         .filter(|r| status.map_or(true, |s| r.status == s))
                                         .map(|r| r.value().clone())
                                         .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        // contar dentro de retain: otras tareas pueden insertar en paralelo
        let mut removed = 0u64;
        self.runs.retain(|_, r| {
                     let expired = r.is_terminal() && r.updated_at < cutoff;
                     if expired {
                         removed += 1;
                     }
                     !expired
                 });
        Ok(removed)
    }
}
