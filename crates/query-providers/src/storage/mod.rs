//! Publicación de artefactos en Azure Blob Storage.
//!
//! - `auth`: obtención del token bearer (client credentials o token fijo).
//! - `sas`: clave de delegación de usuario y firma SAS de sólo lectura.
//! - `publisher`: trait `ResultPublisher` y su implementación sobre HTTP.

pub mod auth;
pub mod publisher;
pub mod sas;

pub use auth::TokenProvider;
pub use publisher::{AzureBlobPublisher, ResultPublisher};
pub use sas::{delegation_key_window, sign_read_url, SasWindow, UserDelegationKey};

/// Versión del servicio usada en cabeceras y en el parámetro `sv` del SAS.
pub const STORAGE_API_VERSION: &str = "2021-08-06";
