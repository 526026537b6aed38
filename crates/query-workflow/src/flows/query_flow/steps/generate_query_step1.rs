use crate::step::{StepContext, StepError, StepOutput, StepResult, WorkflowStep};
use async_trait::async_trait;
use flow::domain::StepKind;
use query_providers::QueryGenerator;
use std::sync::Arc;

/// Paso 1: traduce la consulta en lenguaje natural a SQL.
pub struct GenerateQueryStep {
  generator: Arc<dyn QueryGenerator>,
}

impl GenerateQueryStep {
  pub fn new(generator: Arc<dyn QueryGenerator>) -> Self {
    Self { generator }
  }
}

#[async_trait]
impl WorkflowStep for GenerateQueryStep {
  fn kind(&self) -> StepKind {
    StepKind::GenerateQuery
  }

  async fn execute(&self, ctx: &mut StepContext) -> StepResult {
    let text = ctx.query_text()
                  .ok_or_else(|| StepError::validation("Please provide query text."))?
                  .to_string();
    let sql = self.generator.generate(&text).await?;
    ctx.sql_query = Some(sql.clone());
    Ok(StepOutput::QueryResolved { sql })
  }
}
