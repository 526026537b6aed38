// Archivo: stubs.rs
// Propósito: colaboradores deterministas para pruebas y demos sin red.
//
// Cada stub cuenta sus llamadas y recuerda la última entrada recibida, de
// modo que las pruebas puedan verificar qué pasos se ejecutaron.
use crate::errors::{ProviderError, Result};
use crate::executor::SqlExecutor;
use crate::generator::QueryGenerator;
use crate::storage::sas::{sign_read_url, SasWindow, UserDelegationKey};
use crate::storage::ResultPublisher;
use async_trait::async_trait;
use chrono::Utc;
use query_domain::{artifact_file_name, ResultArtifact, ResultTable};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct CallLog {
  calls: AtomicUsize,
  last: Mutex<Option<String>>,
}

impl CallLog {
  fn record(&self, input: &str) {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut last) = self.last.lock() {
      *last = Some(input.to_string());
    }
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn last(&self) -> Option<String> {
    self.last.lock().ok().and_then(|l| l.clone())
  }
}

/// Generador con respuesta fija.
#[derive(Debug)]
pub struct StubQueryGenerator {
  outcome: std::result::Result<String, ProviderError>,
  log: CallLog,
}

impl StubQueryGenerator {
  pub fn returning(sql: impl Into<String>) -> Self {
    Self { outcome: Ok(sql.into()),
           log: CallLog::default() }
  }

  pub fn failing(error: ProviderError) -> Self {
    Self { outcome: Err(error),
           log: CallLog::default() }
  }

  pub fn calls(&self) -> usize {
    self.log.calls()
  }

  pub fn last_text(&self) -> Option<String> {
    self.log.last()
  }
}

#[async_trait]
impl QueryGenerator for StubQueryGenerator {
  async fn generate(&self, text_query: &str) -> Result<String> {
    self.log.record(text_query);
    self.outcome.clone()
  }
}

/// Ejecutor que serializa siempre la misma tabla.
#[derive(Debug)]
pub struct StubSqlExecutor {
  outcome: std::result::Result<ResultTable, ProviderError>,
  log: CallLog,
}

impl StubSqlExecutor {
  pub fn returning(table: ResultTable) -> Self {
    Self { outcome: Ok(table),
           log: CallLog::default() }
  }

  /// Tabla `id,name` con dos filas.
  pub fn with_sample_rows() -> Self {
    let mut table = ResultTable::new(vec!["id".into(), "name".into()]);
    for (id, name) in [("1", "a"), ("2", "b, c")] {
      // widths match the two columns above
      let _ = table.push_row(vec![Some(id.to_string()), Some(name.to_string())]);
    }
    Self::returning(table)
  }

  pub fn failing(error: ProviderError) -> Self {
    Self { outcome: Err(error),
           log: CallLog::default() }
  }

  pub fn calls(&self) -> usize {
    self.log.calls()
  }

  pub fn last_sql(&self) -> Option<String> {
    self.log.last()
  }
}

#[async_trait]
impl SqlExecutor for StubSqlExecutor {
  async fn execute(&self, sql: &str) -> Result<ResultArtifact> {
    self.log.record(sql);
    let table = self.outcome.clone()?;
    Ok(table.to_csv()?)
  }
}

const STUB_KEY_XML: &str = "<UserDelegationKey><SignedOid>00000000-0000-0000-0000-000000000001</SignedOid>\
<SignedTid>00000000-0000-0000-0000-000000000002</SignedTid><SignedStart>2000-01-01T00:00:00Z</SignedStart>\
<SignedExpiry>2100-01-01T00:00:00Z</SignedExpiry><SignedService>b</SignedService>\
<SignedVersion>2021-08-06</SignedVersion><Value>c3R1Yi1kZWxlZ2F0aW9uLWtleQ==</Value></UserDelegationKey>";

/// Publicador que no sube nada pero devuelve una URL firmada con la misma
/// forma que la real, sobre una cuenta ficticia.
#[derive(Debug)]
pub struct StubResultPublisher {
  failure: Option<ProviderError>,
  log: CallLog,
  account: String,
  container: String,
}

impl StubResultPublisher {
  pub fn new() -> Self {
    Self { failure: None,
           log: CallLog::default(),
           account: "devstoreaccount".into(),
           container: "results".into() }
  }

  pub fn failing(error: ProviderError) -> Self {
    Self { failure: Some(error),
           ..Self::new() }
  }

  pub fn calls(&self) -> usize {
    self.log.calls()
  }

  /// CSV del último artefacto recibido.
  pub fn last_csv(&self) -> Option<String> {
    self.log.last()
  }
}

impl Default for StubResultPublisher {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl ResultPublisher for StubResultPublisher {
  async fn publish(&self, artifact: &ResultArtifact) -> Result<String> {
    self.log.record(artifact.csv());
    if let Some(e) = &self.failure {
      return Err(e.clone());
    }
    let key = UserDelegationKey::from_xml(STUB_KEY_XML)?;
    let blob = artifact_file_name(Uuid::new_v4());
    let url = format!("https://{}.blob.core.windows.net/{}/{}", self.account, self.container, blob);
    sign_read_url(&url, &self.account, &self.container, &blob, &key, &SasWindow::read_window(Utc::now()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn executor_stub_serialises_sample_rows() {
    let exec = StubSqlExecutor::with_sample_rows();
    let artifact = exec.execute("select 1;").await.unwrap();
    assert_eq!(artifact.csv(), "id,name\n1,a\n2,\"b, c\"\n");
    assert_eq!(exec.calls(), 1);
    assert_eq!(exec.last_sql().as_deref(), Some("select 1;"));
  }

  #[tokio::test]
  async fn publisher_stub_returns_signed_url() {
    let publisher = StubResultPublisher::new();
    let url = publisher.publish(&ResultArtifact::new("id\n".into(), 0)).await.unwrap();
    assert!(url.starts_with("https://devstoreaccount.blob.core.windows.net/results/file_"));
    assert!(url.contains("sp=r") && url.contains("&sig="));
  }

  #[tokio::test]
  async fn failing_generator_still_counts_the_call() {
    let generator = StubQueryGenerator::failing(ProviderError::Completion("boom".into()));
    assert!(generator.generate("all users").await.is_err());
    assert_eq!(generator.calls(), 1);
  }
}
