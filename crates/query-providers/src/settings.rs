// Parámetros de conexión de cada colaborador externo. Se construyen una sola
// vez a partir de la configuración validada y se pasan al crear cada
// proveedor.
use crate::errors::{ProviderError, Result};
use std::fmt;

/// Conexión a la base de datos PostgreSQL consultada por los pasos.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
  pub host: String,
  pub port: u16,
  pub database: String,
  pub user: String,
  pub password: String,
}

impl DatabaseSettings {
  /// Configuración del driver equivalente a estos parámetros.
  pub fn pg_config(&self) -> postgres::Config {
    let mut cfg = postgres::Config::new();
    cfg.host(&self.host)
       .port(self.port)
       .dbname(&self.database)
       .user(&self.user)
       .password(&self.password)
       .application_name("query-flow");
    cfg
  }

  pub fn validate(&self) -> Result<()> {
    if self.host.trim().is_empty() || self.database.trim().is_empty() || self.user.trim().is_empty() {
      return Err(ProviderError::Configuration("host, base de datos y usuario son obligatorios".into()));
    }
    Ok(())
  }
}

// El password nunca aparece en logs.
impl fmt::Debug for DatabaseSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DatabaseSettings")
     .field("host", &self.host)
     .field("port", &self.port)
     .field("database", &self.database)
     .field("user", &self.user)
     .field("password", &"***")
     .finish()
  }
}

/// Servicio de completions (Azure OpenAI, API `completions`).
#[derive(Clone, PartialEq)]
pub struct CompletionSettings {
  /// Endpoint base, por ejemplo `https://mi-recurso.openai.azure.com`.
  pub endpoint: String,
  pub api_key: String,
  pub deployment: String,
  pub api_version: String,
  pub max_tokens: u32,
  pub temperature: f32,
}

impl CompletionSettings {
  pub const DEFAULT_API_VERSION: &'static str = "2022-12-01";
  pub const DEFAULT_MAX_TOKENS: u32 = 150;

  pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, deployment: impl Into<String>) -> Self {
    Self { endpoint: endpoint.into(),
           api_key: api_key.into(),
           deployment: deployment.into(),
           api_version: Self::DEFAULT_API_VERSION.to_string(),
           max_tokens: Self::DEFAULT_MAX_TOKENS,
           temperature: 0.0 }
  }

  /// URL completa de la operación de completions del deployment.
  pub fn completions_url(&self) -> String {
    format!("{}/openai/deployments/{}/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version)
  }

  pub fn validate(&self) -> Result<()> {
    if !self.endpoint.starts_with("http") {
      return Err(ProviderError::Configuration(format!("endpoint de completions inválido: '{}'", self.endpoint)));
    }
    if self.api_key.is_empty() || self.deployment.is_empty() {
      return Err(ProviderError::Configuration("api key y deployment de completions son obligatorios".into()));
    }
    Ok(())
  }
}

impl fmt::Debug for CompletionSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompletionSettings")
     .field("endpoint", &self.endpoint)
     .field("api_key", &"***")
     .field("deployment", &self.deployment)
     .field("api_version", &self.api_version)
     .field("max_tokens", &self.max_tokens)
     .field("temperature", &self.temperature)
     .finish()
  }
}

/// Origen del token bearer usado contra Blob Storage.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageCredential {
  /// Client credentials de Azure AD (service principal).
  ClientSecret {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
  },
  /// Token emitido externamente (por ejemplo por `az account get-access-token`).
  BearerToken(String),
}

impl StorageCredential {
  pub const DEFAULT_AUTHORITY: &'static str = "https://login.microsoftonline.com";
}

impl fmt::Debug for StorageCredential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StorageCredential::ClientSecret { tenant_id, client_id, authority_host, .. } => {
        f.debug_struct("ClientSecret")
         .field("tenant_id", tenant_id)
         .field("client_id", client_id)
         .field("client_secret", &"***")
         .field("authority_host", authority_host)
         .finish()
      }
      StorageCredential::BearerToken(_) => f.write_str("BearerToken(***)"),
    }
  }
}

/// Cuenta y contenedor donde se publican los CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
  pub account: String,
  pub container: String,
  /// Endpoint alternativo del servicio blob (emuladores, nubes soberanas).
  pub blob_endpoint: Option<String>,
  pub credential: StorageCredential,
}

impl StorageSettings {
  /// URL base de la cuenta, sin barra final.
  pub fn account_url(&self) -> String {
    match &self.blob_endpoint {
      Some(ep) => ep.trim_end_matches('/').to_string(),
      None => format!("https://{}.blob.core.windows.net", self.account),
    }
  }

  pub fn blob_url(&self, blob_name: &str) -> String {
    format!("{}/{}/{}", self.account_url(), self.container, blob_name)
  }

  pub fn validate(&self) -> Result<()> {
    if self.account.trim().is_empty() || self.container.trim().is_empty() {
      return Err(ProviderError::Configuration("cuenta y contenedor de almacenamiento son obligatorios".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn db() -> DatabaseSettings {
    DatabaseSettings { host: "localhost".into(),
                       port: 5432,
                       database: "sales".into(),
                       user: "reader".into(),
                       password: "s3cret".into() }
  }

  #[test]
  fn debug_hides_secrets() {
    let out = format!("{:?}", db());
    assert!(!out.contains("s3cret"));
    let c = CompletionSettings::new("https://x.openai.azure.com", "key-123", "sql");
    assert!(!format!("{:?}", c).contains("key-123"));
  }

  #[test]
  fn completions_url_is_built_from_parts() {
    let c = CompletionSettings::new("https://x.openai.azure.com/", "k", "sql-davinci");
    assert_eq!(c.completions_url(),
               "https://x.openai.azure.com/openai/deployments/sql-davinci/completions?api-version=2022-12-01");
  }

  #[test]
  fn blob_url_defaults_to_public_endpoint() {
    let s = StorageSettings { account: "acct".into(),
                              container: "results".into(),
                              blob_endpoint: None,
                              credential: StorageCredential::BearerToken("t".into()) };
    assert_eq!(s.blob_url("file_1.csv"), "https://acct.blob.core.windows.net/results/file_1.csv");
  }

  #[test]
  fn empty_database_host_is_invalid() {
    let mut s = db();
    s.host = " ".into();
    assert!(s.validate().is_err());
  }
}
