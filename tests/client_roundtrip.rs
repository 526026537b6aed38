// El StatusClient contra un servidor real en un puerto efímero.
use query_flow::{router, ClientError, StatusClient};
use query_workflow::{WorkflowFactory, WorkflowType};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

async fn spawn_server() -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let app = router(WorkflowFactory::offline("select id, name from users;"));
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  format!("http://{}", addr)
}

fn client(base: &str) -> StatusClient {
  StatusClient::new(base).poll_interval(Duration::from_millis(20))
                         .timeout(Some(Duration::from_secs(5)))
}

#[tokio::test]
async fn submit_and_wait_returns_output() {
  let base = spawn_server().await;
  let c = client(&base);
  let accepted = assert_ok!(c.submit(WorkflowType::NaturalLanguage, "all user names").await);
  assert!(accepted.status_url.starts_with(&base));

  let out = assert_ok!(c.wait_for_completion(&accepted.status_url).await);
  assert_eq!(out.sql_query, "select id, name from users;");
  assert!(out.results_file_url.contains("sp=r"));
}

#[tokio::test]
async fn failed_run_surfaces_message() {
  let base = spawn_server().await;
  let c = client(&base);
  let accepted = assert_ok!(c.submit(WorkflowType::LiteralSql, "").await);
  let err = assert_err!(c.wait_for_completion(&accepted.status_url).await);
  match err {
    ClientError::WorkflowFailed(m) => assert_eq!(m, "Please provide query text."),
    other => panic!("error inesperado: {other}"),
  }
}

#[tokio::test]
async fn unknown_status_url_is_a_status_error() {
  let base = spawn_server().await;
  let err = assert_err!(client(&base).get_status(&format!("{}/runs/{}", base, uuid::Uuid::new_v4())).await);
  assert!(matches!(err, ClientError::Status { status: 404, .. }));
}
