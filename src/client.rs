// Archivo: client.rs
// Propósito: cliente HTTP que inicia ejecuciones y consulta su estado hasta
// que terminan, igual que lo haría el panel web.
use crate::api::{StatusDocument, SubmitResponse};
use flow::domain::RunStatus;
use query_workflow::WorkflowType;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Error HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Respuesta inesperada {status}: {body}")]
    Status { status: u16, body: String },
    #[error("La ejecución falló: {0}")]
    WorkflowFailed(String),
    #[error("Tiempo de espera agotado tras {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Salida de una ejecución completada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    pub sql_query: String,
    pub results_file_url: String,
}

#[derive(Debug, Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl StatusClient {
    /// `base_url` sin barra final, por ejemplo `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http,
               base_url,
               poll_interval: DEFAULT_POLL_INTERVAL,
               timeout: None }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Inicia una ejecución del workflow indicado.
    pub async fn submit(&self, workflow: WorkflowType, query: &str) -> Result<SubmitResponse> {
        let url = format!("{}/runs/{}", self.base_url, workflow.name());
        log::debug!("POST {}", url);
        let resp = self.http
                       .post(&url)
                       .json(&serde_json::json!({ "query": query }))
                       .send()
                       .await?;
        let resp = check(resp).await?;
        Ok(resp.json::<SubmitResponse>().await?)
    }

    /// Lectura del documento de estado en `status_url`.
    pub async fn get_status(&self, status_url: &str) -> Result<StatusDocument> {
        let resp = self.http.get(status_url).send().await?;
        let resp = check(resp).await?;
        Ok(resp.json::<StatusDocument>().await?)
    }

    /// Consulta cada `poll_interval` hasta que la ejecución sea terminal.
    pub async fn wait_for_completion(&self, status_url: &str) -> Result<RunOutput> {
        let began = Instant::now();
        loop {
            let doc = self.get_status(status_url).await?;
            log::debug!("run {} en {} ({})", doc.instance_id, doc.runtime_status, doc.custom_status.current_step);
            match doc.runtime_status {
                RunStatus::Completed => return completed_output(doc.output),
                RunStatus::Failed => return Err(ClientError::WorkflowFailed(failure_message(doc.output))),
                RunStatus::Pending | RunStatus::Running => {}
            }
            if let Some(limit) = self.timeout {
                if began.elapsed() >= limit {
                    return Err(ClientError::Timeout(limit));
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Status { status: status.as_u16(),
                              body })
}

fn completed_output(output: JsonValue) -> Result<RunOutput> {
    serde_json::from_value(output.clone()).map_err(|_| ClientError::Status { status: 200,
                                                                             body: output.to_string() })
}

fn failure_message(output: JsonValue) -> String {
    match output {
        JsonValue::String(m) => m,
        other => other.to_string(),
    }
}
