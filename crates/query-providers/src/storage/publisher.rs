// Subida del CSV y generación de la URL firmada.
use super::auth::TokenProvider;
use super::sas::{format_time, key_info_xml, sign_read_url, SasWindow, UserDelegationKey};
use super::STORAGE_API_VERSION;
use crate::errors::{ProviderError, Result};
use crate::settings::StorageSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use query_domain::{artifact_file_name, ResultArtifact};
use uuid::Uuid;

/// Publica un artefacto y devuelve una URL de lectura con caducidad.
#[async_trait]
pub trait ResultPublisher: Send + Sync {
  async fn publish(&self, artifact: &ResultArtifact) -> Result<String>;
}

pub struct AzureBlobPublisher {
  http: reqwest::Client,
  settings: StorageSettings,
  tokens: TokenProvider,
}

impl AzureBlobPublisher {
  pub fn new(http: reqwest::Client, settings: StorageSettings) -> Self {
    let tokens = TokenProvider::new(http.clone(), settings.credential.clone());
    Self { http, settings, tokens }
  }

  /// Petición autenticada con las cabeceras comunes del servicio.
  fn authorized(&self, method: reqwest::Method, url: &str, token: &str, now: DateTime<Utc>) -> reqwest::RequestBuilder {
    self.http
        .request(method, url)
        .bearer_auth(token)
        .header("x-ms-version", STORAGE_API_VERSION)
        .header("x-ms-date", ms_date(now))
  }

  fn upload_request(&self, token: &str, blob_name: &str, artifact: &ResultArtifact, now: DateTime<Utc>) -> reqwest::RequestBuilder {
    self.authorized(reqwest::Method::PUT, &self.settings.blob_url(blob_name), token, now)
        .header("x-ms-blob-type", "BlockBlob")
        .header("x-ms-meta-sha256", artifact.sha256())
        .header(reqwest::header::CONTENT_TYPE, "text/csv")
        .body(artifact.csv().to_string())
  }

  fn delegation_key_request(&self, token: &str, now: DateTime<Utc>) -> reqwest::RequestBuilder {
    let url = format!("{}/?restype=service&comp=userdelegationkey", self.settings.account_url());
    self.authorized(reqwest::Method::POST, &url, token, now)
        .header(reqwest::header::CONTENT_TYPE, "application/xml")
        .body(key_info_xml(now))
  }

  async fn upload(&self, token: &str, blob_name: &str, artifact: &ResultArtifact) -> Result<()> {
    let resp = self.upload_request(token, blob_name, artifact, Utc::now())
                   .send()
                   .await
                   .map_err(|e| ProviderError::Storage(format!("fallo al subir {}: {}", blob_name, e)))?;
    expect_success(resp, "subida del blob").await?;
    Ok(())
  }

  async fn delegation_key(&self, token: &str) -> Result<UserDelegationKey> {
    let resp = self.delegation_key_request(token, Utc::now())
                   .send()
                   .await
                   .map_err(|e| ProviderError::Storage(format!("fallo al pedir la clave de delegación: {}", e)))?;
    let body = expect_success(resp, "clave de delegación").await?;
    UserDelegationKey::from_xml(&body)
  }
}

/// Fecha RFC 1123 en GMT, como la exige `x-ms-date`.
fn ms_date(now: DateTime<Utc>) -> String {
  now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

async fn expect_success(resp: reqwest::Response, what: &str) -> Result<String> {
  let status = resp.status();
  let body = resp.text().await.unwrap_or_default();
  if !status.is_success() {
    return Err(ProviderError::Storage(format!("{}: HTTP {}: {}", what, status, body)));
  }
  Ok(body)
}

#[async_trait]
impl ResultPublisher for AzureBlobPublisher {
  async fn publish(&self, artifact: &ResultArtifact) -> Result<String> {
    let blob_name = artifact_file_name(Uuid::new_v4());
    let token = self.tokens.token().await?;
    self.upload(&token, &blob_name, artifact).await?;
    log::info!("blob {} subido ({} filas, {} bytes)", blob_name, artifact.row_count(), artifact.len());

    let key = self.delegation_key(&token).await?;
    let window = SasWindow::read_window(Utc::now());
    log::debug!("URL firmada para {} válida hasta {}", blob_name, format_time(window.expiry));
    sign_read_url(&self.settings.blob_url(&blob_name),
                  &self.settings.account,
                  &self.settings.container,
                  &blob_name,
                  &key,
                  &window)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::settings::StorageCredential;
  use chrono::TimeZone;
  use query_domain::ResultTable;

  fn publisher() -> AzureBlobPublisher {
    let settings = StorageSettings { account: "acct".into(),
                                     container: "results".into(),
                                     blob_endpoint: None,
                                     credential: StorageCredential::BearerToken("tok".into()) };
    AzureBlobPublisher::new(reqwest::Client::new(), settings)
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
  }

  fn header<'a>(req: &'a reqwest::Request, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
  }

  #[test]
  fn delegation_key_request_is_dated_and_versioned() {
    let req = publisher().delegation_key_request("tok", now()).build().unwrap();
    assert_eq!(*req.method(), reqwest::Method::POST);
    assert_eq!(req.url().as_str(),
               "https://acct.blob.core.windows.net/?restype=service&comp=userdelegationkey");
    assert_eq!(header(&req, "x-ms-date"), Some("Wed, 01 May 2024 10:00:00 GMT"));
    assert_eq!(header(&req, "x-ms-version"), Some(STORAGE_API_VERSION));
    assert_eq!(header(&req, "authorization"), Some("Bearer tok"));
  }

  #[test]
  fn upload_request_is_a_dated_block_blob() {
    let mut table = ResultTable::new(vec!["id".into()]);
    table.push_row(vec![Some("1".into())]).unwrap();
    let artifact = table.to_csv().unwrap();
    let req = publisher().upload_request("tok", "file_x.csv", &artifact, now()).build().unwrap();
    assert_eq!(*req.method(), reqwest::Method::PUT);
    assert_eq!(req.url().as_str(), "https://acct.blob.core.windows.net/results/file_x.csv");
    assert_eq!(header(&req, "x-ms-date"), Some("Wed, 01 May 2024 10:00:00 GMT"));
    assert_eq!(header(&req, "x-ms-blob-type"), Some("BlockBlob"));
    assert_eq!(header(&req, "content-type"), Some("text/csv"));
  }
}
