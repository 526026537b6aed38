use flow::domain::{RunState, WorkflowRequest};
use query_domain::ResultArtifact;
use uuid::Uuid;

/// Contexto de una ejecución compartido por sus pasos.
///
/// Vive sólo en la tarea de la ejecución: el artefacto CSV pasa del paso de
/// ejecución al de publicación por aquí y nunca se persiste.
#[derive(Debug, Clone)]
pub struct StepContext {
  pub instance_id: Uuid,
  pub request: WorkflowRequest,
  /// SQL resuelto (generado o literal).
  pub sql_query: Option<String>,
  artifact: Option<ResultArtifact>,
}

impl StepContext {
  pub fn new(instance_id: Uuid, request: WorkflowRequest) -> Self {
    Self { instance_id,
           request,
           sql_query: None,
           artifact: None }
  }

  /// Contexto inicial a partir del estado persistido.
  pub fn from_state(state: &RunState) -> Self {
    let mut ctx = Self::new(state.instance_id, state.request.clone());
    ctx.sql_query = state.sql_query.clone();
    ctx
  }

  /// Texto de la consulta (no vacío) enviado por el cliente.
  pub fn query_text(&self) -> Option<&str> {
    self.request.query_text()
  }

  pub fn set_artifact(&mut self, artifact: ResultArtifact) {
    self.artifact = Some(artifact);
  }

  pub fn artifact(&self) -> Option<&ResultArtifact> {
    self.artifact.as_ref()
  }

  /// Entrega el artefacto una sola vez.
  pub fn take_artifact(&mut self) -> Option<ResultArtifact> {
    self.artifact.take()
  }
}
