use crate::step::{StepContext, StepError, StepOutput, StepResult, WorkflowStep};
use async_trait::async_trait;
use flow::domain::StepKind;
use query_providers::ResultPublisher;
use std::sync::Arc;

/// Paso 3: sube el CSV y devuelve la URL firmada.
pub struct PublishResultsStep {
  publisher: Arc<dyn ResultPublisher>,
}

impl PublishResultsStep {
  pub fn new(publisher: Arc<dyn ResultPublisher>) -> Self {
    Self { publisher }
  }
}

#[async_trait]
impl WorkflowStep for PublishResultsStep {
  fn kind(&self) -> StepKind {
    StepKind::Publish
  }

  async fn execute(&self, ctx: &mut StepContext) -> StepResult {
    let artifact = ctx.take_artifact()
                      .ok_or_else(|| StepError::validation("no hay resultados para publicar"))?;
    let url = self.publisher.publish(&artifact).await?;
    Ok(StepOutput::ResultsPublished { url })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use flow::domain::{ErrorKind, WorkflowRequest};
  use query_domain::ResultArtifact;
  use query_providers::stubs::StubResultPublisher;
  use uuid::Uuid;

  #[tokio::test]
  async fn artifact_is_consumed_once() {
    let publisher = Arc::new(StubResultPublisher::new());
    let step = PublishResultsStep::new(publisher.clone());
    let mut ctx = StepContext::new(Uuid::new_v4(), WorkflowRequest::literal("select 1"));
    ctx.set_artifact(ResultArtifact::new("n\n1\n".into(), 1));

    assert!(matches!(step.execute(&mut ctx).await, Ok(StepOutput::ResultsPublished { .. })));
    assert_eq!(publisher.last_csv().as_deref(), Some("n\n1\n"));

    let err = step.execute(&mut ctx).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(publisher.calls(), 1);
  }
}
