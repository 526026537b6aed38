// Pruebas contra una base real. Se omiten si `RUNS_DATABASE_URL` no está
// definida.
use chrono::{Duration, Utc};
use flow::domain::{ErrorKind, PersistResult, RunState, RunStatus, WorkflowRequest};
use flow::engine::{apply, RunEvent};
use flow::{FlowError, RunRepository};
use query_persistence::{new_from_env, PostgresRunRepository};
use uuid::Uuid;

async fn setup_repo() -> Option<PostgresRunRepository> {
  dotenvy::dotenv().ok();
  if std::env::var("RUNS_DATABASE_URL").is_err() {
    eprintln!("RUNS_DATABASE_URL no definida; se omite la prueba");
    return None;
  }
  Some(new_from_env().await.expect("new_from_env"))
}

#[tokio::test]
async fn persists_full_run_lifecycle() {
  let Some(repo) = setup_repo().await else { return };
  let s0 = RunState::new(Uuid::new_v4(), "exec-sql", WorkflowRequest::literal("SELECT 1"));
  repo.insert_run(&s0).await.unwrap();
  assert!(matches!(repo.insert_run(&s0).await, Err(FlowError::Conflict(_))));

  let s1 = apply(&s0, RunEvent::Started).unwrap();
  assert_eq!(repo.save_run(&s1, 0).await.unwrap(), PersistResult::Ok { new_version: 1 });
  // stale writer
  assert_eq!(repo.save_run(&s1, 0).await.unwrap(), PersistResult::Conflict);

  let s2 = apply(&s1, RunEvent::Failed { kind: ErrorKind::UpstreamService,
                                         message: "connection refused".into() }).unwrap();
  repo.save_run(&s2, 1).await.unwrap();
  let loaded = repo.load_run(&s0.instance_id).await.unwrap().unwrap();
  assert_eq!(loaded.status, RunStatus::Failed);
  assert_eq!(loaded.error_message.as_deref(), Some("connection refused"));
}

#[tokio::test]
async fn unknown_run_is_not_found() {
  let Some(repo) = setup_repo().await else { return };
  let s0 = RunState::new(Uuid::new_v4(), "exec-sql", WorkflowRequest::literal("SELECT 1"));
  assert!(repo.load_run(&s0.instance_id).await.unwrap().is_none());
  assert_eq!(repo.save_run(&s0, 0).await.unwrap_err(), FlowError::NotFound(s0.instance_id));
}

#[tokio::test]
async fn lists_and_purges_terminal_runs() {
  let Some(repo) = setup_repo().await else { return };
  let running = apply(&RunState::new(Uuid::new_v4(), "exec-sql", WorkflowRequest::literal("SELECT 1")),
                      RunEvent::Started).unwrap();
  repo.insert_run(&running).await.unwrap();
  let failed = apply(&RunState::new(Uuid::new_v4(), "exec-sql", WorkflowRequest::literal("")),
                     RunEvent::Failed { kind: ErrorKind::Validation,
                                        message: "query is required".into() }).unwrap();
  repo.insert_run(&failed).await.unwrap();

  let only_failed = repo.list_runs(Some(RunStatus::Failed), 100).await.unwrap();
  assert!(only_failed.iter().all(|r| r.status == RunStatus::Failed));
  assert!(only_failed.iter().any(|r| r.instance_id == failed.instance_id));
  assert_eq!(repo.list_runs(None, 1).await.unwrap().len(), 1);

  let removed = repo.purge_terminal_before(Utc::now() + Duration::minutes(1)).await.unwrap();
  assert!(removed >= 1);
  assert!(repo.load_run(&failed.instance_id).await.unwrap().is_none());
  assert!(repo.load_run(&running.instance_id).await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reconnecting_keeps_schema_and_pool_serves_parallel_writers() {
  let Some(repo) = setup_repo().await else { return };
  // migraciones ya aplicadas: conectar otra vez no falla
  let again = new_from_env().await.expect("segunda conexión");

  let mut tasks = Vec::new();
  for i in 0..16 {
    let repo = if i % 2 == 0 { repo.clone() } else { again.clone() };
    tasks.push(tokio::spawn(async move {
                 let s = RunState::new(Uuid::new_v4(), "exec-sql", WorkflowRequest::literal("SELECT 1"));
                 repo.insert_run(&s).await.unwrap();
                 let started = apply(&s, RunEvent::Started).unwrap();
                 repo.save_run(&started, 0).await.unwrap()
               }));
  }
  for t in tasks {
    assert_eq!(t.await.unwrap(), PersistResult::Ok { new_version: 1 });
  }
}
