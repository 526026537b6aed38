// Archivo: logging.rs
// Propósito: suscriptor de tracing para los binarios.
use tracing_subscriber::EnvFilter;

/// Nivel usado cuando `RUST_LOG` no está definida.
pub const DEFAULT_FILTER: &str = "info";

/// Instala el suscriptor `fmt` con filtro por `RUST_LOG`. Los registros de
/// la fachada `log` (crates internos) se reenvían al mismo suscriptor.
/// Llamarla más de una vez no tiene efecto.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
