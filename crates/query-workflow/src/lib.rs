//! query-workflow: coordinador del flujo de consultas
//!
//! Une la máquina de estados de `flow` con los colaboradores de
//! `query-providers`. Cada ejecución recorre, en su propia tarea:
//!
//! 1. `GenerateQuery` (sólo `nl-sql`): lenguaje natural → SQL.
//! 2. `ExecuteQuery`: SQL → CSV en memoria.
//! 3. `Publish`: CSV → blob + URL firmada.
//!
//! Los fallos de cada paso quedan registrados en el `RunState`; nunca se
//! propagan a quien inició la ejecución.

pub mod config;
pub mod engine;
pub mod errors;
pub mod factory;
pub mod flows;
pub mod persistence;
pub mod step;
pub mod workflow_type;

pub use config::WorkflowConfig;
pub use engine::WorkflowCoordinator;
pub use errors::WorkflowError;
pub use factory::WorkflowFactory;
pub use step::WorkflowStep;
pub use workflow_type::WorkflowType;
