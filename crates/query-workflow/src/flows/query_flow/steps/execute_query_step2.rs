use crate::step::{StepContext, StepError, StepOutput, StepResult, WorkflowStep};
use async_trait::async_trait;
use flow::domain::StepKind;
use query_providers::SqlExecutor;
use std::sync::Arc;

/// Paso 2: ejecuta el SQL resuelto y deja el CSV en el contexto.
pub struct ExecuteQueryStep {
  executor: Arc<dyn SqlExecutor>,
}

impl ExecuteQueryStep {
  pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
    Self { executor }
  }
}

#[async_trait]
impl WorkflowStep for ExecuteQueryStep {
  fn kind(&self) -> StepKind {
    StepKind::ExecuteQuery
  }

  async fn execute(&self, ctx: &mut StepContext) -> StepResult {
    let sql = ctx.sql_query
                 .clone()
                 .ok_or_else(|| StepError::validation("no hay SQL resuelto para ejecutar"))?;
    let artifact = self.executor.execute(&sql).await?;
    let row_count = artifact.row_count();
    log::debug!("run {}: {} filas ({} bytes)", ctx.instance_id, row_count, artifact.len());
    ctx.set_artifact(artifact);
    Ok(StepOutput::QueryExecuted { row_count })
  }
}
