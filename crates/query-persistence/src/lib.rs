//! Persistencia durable del historial de ejecuciones.
//!
//! Expone `PostgresRunRepository`, que implementa `flow::RunRepository` sobre
//! la tabla `workflow_runs`. Las migraciones (refinery) están embebidas y se
//! aplican al conectar; `new_from_env` lee `RUNS_DATABASE_URL`.

mod run_persistence;

pub use run_persistence::{new_from_env, PostgresRunRepository};
