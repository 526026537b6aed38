// Archivo: config.rs
// Propósito: leer y validar una sola vez la configuración del proceso a
// partir del entorno (y de `.env` si existe).
use crate::errors::{Result, WorkflowError};
use chrono::Duration;
use query_providers::{CompletionSettings, DatabaseSettings, PostgresSchemaSource, StorageCredential, StorageSettings};

pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_RETENTION_HOURS: i64 = 72;
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Configuración completa del servicio.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
  pub database: DatabaseSettings,
  /// Tabla con las líneas de descripción del esquema para el prompt.
  pub prompt_table: String,
  /// `None` deshabilita el workflow de lenguaje natural.
  pub completion: Option<CompletionSettings>,
  pub storage: StorageSettings,
  /// Base de datos del historial de ejecuciones; `None` usa memoria.
  pub runs_database_url: Option<String>,
  /// Antigüedad a partir de la cual se purgan las ejecuciones terminales.
  pub run_retention: Duration,
  pub bind_addr: String,
}

impl WorkflowConfig {
  /// Carga `.env` y lee las variables del proceso.
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Construye la configuración con una función de búsqueda arbitraria.
  /// Las cadenas vacías cuentan como ausentes.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where F: Fn(&str) -> Option<String>
  {
    const DEFAULT_AUTHORITY: &str = StorageCredential::DEFAULT_AUTHORITY;
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let require = |key: &str| get(key).ok_or_else(|| WorkflowError::Configuration(format!("falta la variable {}", key)));

    let port = match get("PG_PORT") {
      Some(p) => p.parse::<u16>()
                  .map_err(|_| WorkflowError::Configuration(format!("PG_PORT no es un puerto válido: '{}'", p)))?,
      None => DEFAULT_PG_PORT,
    };
    let database = DatabaseSettings { host: require("PG_HOST")?,
                                      port,
                                      database: require("PG_DATABASE")?,
                                      user: require("PG_USER")?,
                                      password: lookup("PG_PASSWORD").unwrap_or_default() };

    let completion = match get("OPENAI_ENDPOINT") {
      Some(endpoint) => {
        let mut c = CompletionSettings::new(endpoint, require("OPENAI_API_KEY")?, require("OPENAI_DEPLOYMENT")?);
        if let Some(v) = get("OPENAI_API_VERSION") {
          c.api_version = v;
        }
        Some(c)
      }
      None => None,
    };

    let credential = match get("STORAGE_BEARER_TOKEN") {
      Some(token) => StorageCredential::BearerToken(token),
      None => StorageCredential::ClientSecret { tenant_id: require("AZURE_TENANT_ID")?,
                                                client_id: require("AZURE_CLIENT_ID")?,
                                                client_secret: require("AZURE_CLIENT_SECRET")?,
                                                authority_host: get("AZURE_AUTHORITY_HOST").unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()) },
    };
    let storage = StorageSettings { account: require("STORAGE_ACCOUNT_NAME")?,
                                    container: require("STORAGE_CONTAINER_NAME")?,
                                    blob_endpoint: get("STORAGE_BLOB_ENDPOINT"),
                                    credential };

    let retention_hours = match get("RUN_RETENTION_HOURS") {
      Some(h) => h.parse::<i64>()
                  .ok()
                  .filter(|h| *h > 0)
                  .ok_or_else(|| WorkflowError::Configuration(format!("RUN_RETENTION_HOURS inválido: '{}'", h)))?,
      None => DEFAULT_RETENTION_HOURS,
    };

    let cfg = Self { database,
                     prompt_table: get("PROMPT_SCHEMA_TABLE").unwrap_or_else(|| PostgresSchemaSource::DEFAULT_TABLE.to_string()),
                     completion,
                     storage,
                     runs_database_url: get("RUNS_DATABASE_URL"),
                     run_retention: Duration::hours(retention_hours),
                     bind_addr: get("QUERY_FLOW_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()) };
    cfg.validate()?;
    Ok(cfg)
  }

  /// Validación cruzada de los ajustes de cada proveedor.
  pub fn validate(&self) -> Result<()> {
    let invalid = |e: query_providers::ProviderError| WorkflowError::Configuration(e.message().to_string());
    self.database.validate().map_err(invalid)?;
    self.storage.validate().map_err(invalid)?;
    if let Some(c) = &self.completion {
      c.validate().map_err(invalid)?;
    }
    Ok(())
  }

  pub fn natural_language_enabled(&self) -> bool {
    self.completion.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn base() -> HashMap<&'static str, &'static str> {
    HashMap::from([("PG_HOST", "db.local"),
                   ("PG_DATABASE", "sales"),
                   ("PG_USER", "reader"),
                   ("PG_PASSWORD", "pw"),
                   ("STORAGE_ACCOUNT_NAME", "acct"),
                   ("STORAGE_CONTAINER_NAME", "results"),
                   ("STORAGE_BEARER_TOKEN", "tok")])
  }

  fn load(vars: &HashMap<&'static str, &'static str>) -> Result<WorkflowConfig> {
    WorkflowConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
  }

  #[test]
  fn minimal_configuration_uses_defaults() {
    let cfg = load(&base()).unwrap();
    assert_eq!(cfg.database.port, 5432);
    assert_eq!(cfg.prompt_table, "config.prompt");
    assert!(!cfg.natural_language_enabled());
    assert_eq!(cfg.run_retention, Duration::hours(72));
    assert!(cfg.runs_database_url.is_none());
  }

  #[test]
  fn non_numeric_port_is_rejected() {
    let mut vars = base();
    vars.insert("PG_PORT", "five");
    assert!(matches!(load(&vars), Err(WorkflowError::Configuration(_))));
  }

  #[test]
  fn missing_required_key_is_named() {
    let mut vars = base();
    vars.remove("PG_HOST");
    let err = load(&vars).unwrap_err();
    assert!(err.to_string().contains("PG_HOST"));
  }

  #[test]
  fn completion_needs_key_and_deployment() {
    let mut vars = base();
    vars.insert("OPENAI_ENDPOINT", "https://x.openai.azure.com");
    assert!(load(&vars).is_err());
    vars.insert("OPENAI_API_KEY", "k");
    vars.insert("OPENAI_DEPLOYMENT", "sql");
    let cfg = load(&vars).unwrap();
    assert!(cfg.natural_language_enabled());
  }

  #[test]
  fn client_secret_is_required_without_bearer_token() {
    let mut vars = base();
    vars.remove("STORAGE_BEARER_TOKEN");
    assert!(load(&vars).is_err());
    vars.insert("AZURE_TENANT_ID", "t");
    vars.insert("AZURE_CLIENT_ID", "c");
    vars.insert("AZURE_CLIENT_SECRET", "s");
    assert!(matches!(load(&vars).unwrap().storage.credential, StorageCredential::ClientSecret { .. }));
  }
}
