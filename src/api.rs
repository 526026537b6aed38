// Archivo: api.rs
// Propósito: API HTTP para iniciar ejecuciones y consultar su estado.
//
// Rutas:
// - POST /runs              cuerpo {query, isNaturalLanguage?}
// - POST /runs/{workflow}   `nl-sql` | `exec-sql`, cuerpo {query}
// - GET  /runs/{instanceId} documento de estado
// - GET  /runs?status=&limit=
// - GET  /health
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use flow::domain::{ErrorKind, RunState, RunStatus, StepKind, WorkflowRequest};
use flow::errors::FlowError;
use query_workflow::{WorkflowCoordinator, WorkflowError, WorkflowType};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    coordinator: Arc<WorkflowCoordinator>,
}

pub fn router(coordinator: Arc<WorkflowCoordinator>) -> Router {
    Router::new().route("/health", get(health))
                 .route("/runs", post(submit_default).get(list_runs))
                 .route("/runs/:key", post(submit_named).get(get_status))
                 .with_state(AppState { coordinator })
}

/// Respuesta de aceptación (202).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub instance_id: Uuid,
    pub status_url: String,
    pub status_query_get_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStatus {
    pub current_step: StepKind,
    pub sql_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// Documento de estado de una ejecución, tal como lo consume el cliente.
///
/// `output` es `{sqlQuery, resultsFileUrl}` en `Completed`, el mensaje de
/// error en `Failed` y `null` en otro caso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub instance_id: Uuid,
    pub name: String,
    pub runtime_status: RunStatus,
    pub custom_status: CustomStatus,
    pub output: JsonValue,
    pub created_time: DateTime<Utc>,
    pub last_updated_time: DateTime<Utc>,
}

impl From<&RunState> for StatusDocument {
    fn from(s: &RunState) -> Self {
        let output = match s.status {
            RunStatus::Completed => serde_json::json!({ "sqlQuery": s.sql_query, "resultsFileUrl": s.results_file_url }),
            RunStatus::Failed => JsonValue::String(s.error_message.clone().unwrap_or_default()),
            _ => JsonValue::Null,
        };
        Self { instance_id: s.instance_id,
               name: s.workflow.clone(),
               runtime_status: s.status,
               custom_status: CustomStatus { current_step: s.current_step,
                                             sql_query: s.sql_query.clone(),
                                             error_kind: s.error_kind },
               output,
               created_time: s.created_at,
               last_updated_time: s.updated_at }
    }
}

#[derive(Debug, Deserialize)]
struct NamedBody {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    status: Option<String>,
    limit: Option<usize>,
}

/// Errores de la API con su código HTTP.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::Flow(FlowError::NotFound(id)) => ApiError::NotFound(format!("run {} no existe", id)),
            WorkflowError::Validation(m) => ApiError::BadRequest(m),
            WorkflowError::Configuration(m) => ApiError::Unavailable(m),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Internal(m) => {
                tracing::error!("error interno: {}", m);
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("cuerpo JSON inválido: {}", rejection.body_text()))
}

async fn health() -> &'static str {
    "ok"
}

async fn submit_default(State(app): State<AppState>,
                        headers: HeaderMap,
                        body: Result<Json<WorkflowRequest>, JsonRejection>)
                        -> Result<Response, ApiError> {
    let Json(request) = body.map_err(bad_body)?;
    let id = app.coordinator.start_request(request).await?;
    Ok(accepted(&headers, id))
}

async fn submit_named(State(app): State<AppState>,
                      Path(workflow): Path<String>,
                      headers: HeaderMap,
                      body: Result<Json<NamedBody>, JsonRejection>)
                      -> Result<Response, ApiError> {
    let workflow_type = workflow.parse::<WorkflowType>().unwrap_or_default();
    if workflow_type == WorkflowType::Unknown {
        return Err(ApiError::NotFound(format!("workflow desconocido: {}", workflow)));
    }
    let Json(body) = body.map_err(bad_body)?;
    let id = app.coordinator.start(workflow_type, body.query).await?;
    Ok(accepted(&headers, id))
}

async fn get_status(State(app): State<AppState>, Path(key): Path<String>) -> Result<Json<StatusDocument>, ApiError> {
    let id = Uuid::parse_str(&key).map_err(|_| ApiError::NotFound(format!("run {} no existe", key)))?;
    let state = app.coordinator.get_status(&id).await?;
    Ok(Json(StatusDocument::from(&state)))
}

async fn list_runs(State(app): State<AppState>,
                   Query(params): Query<ListParams>)
                   -> Result<Json<Vec<StatusDocument>>, ApiError> {
    let status = match params.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(s.parse::<RunStatus>().map_err(ApiError::BadRequest)?),
        None => None,
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let runs = app.coordinator.list_runs(status, limit).await?;
    Ok(Json(runs.iter().map(StatusDocument::from).collect()))
}

/// 202 con `Location` apuntando al documento de estado.
fn accepted(headers: &HeaderMap, id: Uuid) -> Response {
    let status_url = status_url(headers, id);
    let body = SubmitResponse { instance_id: id,
                                status_url: status_url.clone(),
                                status_query_get_uri: status_url.clone() };
    (StatusCode::ACCEPTED, [(header::LOCATION, status_url)], Json(body)).into_response()
}

fn status_url(headers: &HeaderMap, id: Uuid) -> String {
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());
    let scheme = headers.get("x-forwarded-proto")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("http");
    match host {
        Some(h) => format!("{}://{}/runs/{}", scheme, h, id),
        None => format!("/runs/{}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow::engine::{apply, RunEvent};

    #[test]
    fn output_follows_status() {
        let s = RunState::new(Uuid::new_v4(), "exec-sql", WorkflowRequest::literal("SELECT 1"));
        assert_eq!(StatusDocument::from(&s).output, JsonValue::Null);

        let failed = apply(&s, RunEvent::Failed { kind: ErrorKind::Validation,
                                                  message: "Please provide query text.".into() }).unwrap();
        let doc = StatusDocument::from(&failed);
        assert_eq!(doc.output, JsonValue::String("Please provide query text.".into()));
        assert_eq!(doc.custom_status.error_kind, Some(ErrorKind::Validation));
    }

    #[test]
    fn status_document_uses_camel_case() {
        let s = RunState::new(Uuid::new_v4(), "nl-sql", WorkflowRequest::natural_language("x"));
        let v = serde_json::to_value(StatusDocument::from(&s)).unwrap();
        assert_eq!(v["runtimeStatus"], "Pending");
        assert_eq!(v["customStatus"]["currentStep"], "GenerateQuery");
        assert!(v.get("lastUpdatedTime").is_some());
    }

    #[test]
    fn status_url_prefers_host_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        assert_eq!(status_url(&headers, id), format!("/runs/{}", id));
        headers.insert(header::HOST, "localhost:8080".parse().unwrap());
        assert_eq!(status_url(&headers, id), format!("http://localhost:8080/runs/{}", id));
    }
}
