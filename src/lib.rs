//! query-flow: servicio HTTP y cliente de línea de comandos para el flujo
//! lenguaje natural / SQL → CSV → URL firmada.

pub mod api;
pub mod client;
pub mod logging;

pub use api::{router, StatusDocument, SubmitResponse};
pub use client::{ClientError, RunOutput, StatusClient};
