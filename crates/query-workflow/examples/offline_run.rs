// Ejecuta el flujo completo sin servicios externos usando los stubs.
use query_workflow::{WorkflowFactory, WorkflowType};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = WorkflowFactory::offline("select id, name from users;");
    let id = coordinator.start(WorkflowType::NaturalLanguage, Some("all user names".into()))
                        .await?;
    println!("run iniciado id={}", id);
    let done = coordinator.wait_for_terminal(&id, Duration::from_millis(50), Some(Duration::from_secs(5)))
                          .await?;
    println!("estado={} pasos={:?}", done.status, done.step_history);
    println!("sql={:?}", done.sql_query);
    println!("url={:?}", done.results_file_url);
    Ok(())
}
