use flow::domain::WorkflowRequest;
use flow::engine::RunEvent;
use flow::errors::FlowError;
use flow::stubs::InMemoryRunRepository;
use flow::FlowEngine;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), FlowError> {
    // Repo en memoria y engine
    let repo = Arc::new(InMemoryRunRepository::new());
    let engine = FlowEngine::new(repo.clone());

    let run = engine.create_run("exec-sql", WorkflowRequest::literal("SELECT 1")).await?;
    println!("created run {} status={} step={}", run.instance_id, run.status, run.current_step);

    // Recorrer los eventos de una ejecución literal exitosa
    let events = vec![RunEvent::Started,
                      RunEvent::QueryResolved { sql: "SELECT 1".into() },
                      RunEvent::QueryExecuted { row_count: 1 },
                      RunEvent::ResultsPublished { url: "https://acct.blob.core.windows.net/r/file.csv?sig=x".into() }];
    for ev in events {
        let state = engine.record(&run.instance_id, ev).await?;
        println!("v{} status={} step={}", state.version, state.status, state.current_step);
    }

    // Un estado terminal rechaza cualquier evento
    let err = engine.record(&run.instance_id, RunEvent::Started).await.unwrap_err();
    println!("rejected: {}", err);
    println!("runs stored: {}", repo.len());
    Ok(())
}
