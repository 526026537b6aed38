//! Crate `flow`: modelo de ejecuciones y su máquina de estados
//!
//! Este crate define los tipos de una ejecución (`WorkflowRequest`,
//! `RunState`, `RunStatus`, `StepKind`), las transiciones puras entre estados
//! (`engine::apply`), el contrato de persistencia `RunRepository` y una
//! implementación en memoria útil para pruebas (`InMemoryRunRepository`).
//! `FlowEngine` une ambas piezas: carga, aplica el evento y persiste.
//!
//! Diseño resumido:
//! - Transiciones puras: `apply(estado, evento)` no hace I/O y se prueba sin
//!   repositorio.
//! - Locking optimista: cada transición incrementa `version` y se persiste
//!   con `expected_version` (`PersistResult::Conflict`).
//! - Estados terminales (`Completed`, `Failed`) inmutables.
//!
//! Ejemplo rápido:
//! ```rust
//! use flow::stubs::InMemoryRunRepository;
//! use flow::FlowEngine;
//! use std::sync::Arc;
//! let repo = Arc::new(InMemoryRunRepository::new());
//! let engine = FlowEngine::new(repo);
//! ```
pub mod domain;
pub mod engine;
pub mod errors;
pub mod repository;
pub mod stubs;

pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use repository::*;
pub use stubs::*;
