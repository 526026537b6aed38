// Token bearer para Blob Storage.
use crate::errors::{ProviderError, Result};
use crate::settings::StorageCredential;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Mutex;

const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";
// Margen antes de la expiración en el que el token se renueva.
const REFRESH_MARGIN_SECS: i64 = 120;

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
  #[serde(default)]
  expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
  value: String,
  expires_at: DateTime<Utc>,
}

/// Entrega tokens bearer para el scope de Storage. Con client credentials el
/// token se pide al authority y se reutiliza hasta poco antes de expirar.
#[derive(Debug)]
pub struct TokenProvider {
  http: reqwest::Client,
  credential: StorageCredential,
  cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
  pub fn new(http: reqwest::Client, credential: StorageCredential) -> Self {
    Self { http,
           credential,
           cache: Mutex::new(None) }
  }

  pub async fn token(&self) -> Result<String> {
    let (tenant_id, client_id, client_secret, authority_host) = match &self.credential {
      StorageCredential::BearerToken(t) => return Ok(t.clone()),
      StorageCredential::ClientSecret { tenant_id,
                                        client_id,
                                        client_secret,
                                        authority_host, } => (tenant_id, client_id, client_secret, authority_host),
    };

    if let Some(hit) = self.cached(Utc::now()) {
      return Ok(hit);
    }

    let url = format!("{}/{}/oauth2/v2.0/token", authority_host.trim_end_matches('/'), tenant_id);
    log::debug!("solicitando token de almacenamiento para el cliente {}", client_id);
    let resp = self.http
                   .post(&url)
                   .form(&[("grant_type", "client_credentials"),
                           ("client_id", client_id.as_str()),
                           ("client_secret", client_secret.as_str()),
                           ("scope", STORAGE_SCOPE)])
                   .send()
                   .await
                   .map_err(|e| ProviderError::Storage(format!("no se pudo obtener el token: {}", e)))?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(ProviderError::Storage(format!("el authority respondió HTTP {}: {}", status, body)));
    }
    let parsed: TokenResponse = resp.json()
                                    .await
                                    .map_err(|e| ProviderError::Storage(format!("respuesta de token inválida: {}", e)))?;
    let lifetime = parsed.expires_in.unwrap_or(3600);
    self.store(CachedToken { value: parsed.access_token.clone(),
                             expires_at: Utc::now() + Duration::seconds(lifetime) });
    Ok(parsed.access_token)
  }

  fn cached(&self, now: DateTime<Utc>) -> Option<String> {
    let guard = self.cache.lock().ok()?;
    guard.as_ref()
         .filter(|t| t.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now)
         .map(|t| t.value.clone())
  }

  fn store(&self, token: CachedToken) {
    if let Ok(mut guard) = self.cache.lock() {
      *guard = Some(token);
    }
  }
}
