// Ejecutor y fuente de esquema contra una base real. Se omiten si `PG_HOST`
// no está definida.
use query_providers::settings::DatabaseSettings;
use query_providers::{PgPool, PostgresSchemaSource, PostgresSqlExecutor, SchemaSource, SqlExecutor};
use tokio_test::assert_ok;

fn settings() -> Option<DatabaseSettings> {
  let Ok(host) = std::env::var("PG_HOST") else {
    eprintln!("PG_HOST no definida; se omite la prueba");
    return None;
  };
  let port = std::env::var("PG_PORT").ok()
                                     .and_then(|p| p.parse().ok())
                                     .unwrap_or(5432);
  Some(DatabaseSettings { host,
                          port,
                          database: std::env::var("PG_DATABASE").unwrap_or_else(|_| "postgres".into()),
                          user: std::env::var("PG_USER").unwrap_or_else(|_| "postgres".into()),
                          password: std::env::var("PG_PASSWORD").unwrap_or_default() })
}

// una sola conexión: las tablas temporales viven en la sesión
fn single_connection_pool() -> Option<PgPool> {
  settings().map(|s| PgPool::with_size(&s, 1))
}

#[tokio::test]
async fn last_result_set_wins() {
  let Some(pool) = single_connection_pool() else { return };
  let executor = PostgresSqlExecutor::new(pool);
  let artifact = assert_ok!(executor.execute("SELECT 1 AS a; SELECT 'x' AS b, 'y' AS c").await);
  assert_eq!(artifact.csv(), "b,c\nx,y\n");
  assert_eq!(artifact.row_count(), 1);
}

#[tokio::test]
async fn null_is_an_empty_field_and_commas_are_quoted() {
  let Some(pool) = single_connection_pool() else { return };
  let executor = PostgresSqlExecutor::new(pool);
  let artifact = assert_ok!(executor.execute("SELECT NULL::text AS n, 'a,b' AS s, 42 AS i").await);
  assert_eq!(artifact.csv(), "n,s,i\n,\"a,b\",42\n");
}

#[tokio::test]
async fn statement_without_rows_is_empty() {
  let Some(pool) = single_connection_pool() else { return };
  let executor = PostgresSqlExecutor::new(pool);
  let artifact = assert_ok!(executor.execute("CREATE TEMP TABLE t_empty (id int)").await);
  assert!(artifact.is_empty());
  assert_eq!(artifact.row_count(), 0);

  // columnas conocidas aunque no haya filas
  let artifact = assert_ok!(executor.execute("SELECT id FROM t_empty").await);
  assert_eq!(artifact.csv(), "id\n");
}

#[tokio::test]
async fn invalid_sql_is_a_database_error() {
  let Some(pool) = single_connection_pool() else { return };
  let executor = PostgresSqlExecutor::new(pool);
  let err = executor.execute("SELEC 1").await.unwrap_err();
  assert!(matches!(err, query_providers::ProviderError::Database(_)), "{err}");
}

#[tokio::test]
async fn schema_lines_only_include_marked_rows() {
  let Some(pool) = single_connection_pool() else { return };
  assert_ok!(pool.run(|client| {
                   client.batch_execute("CREATE TEMP TABLE prompt_lines (line text, include boolean);
                                         INSERT INTO prompt_lines VALUES
                                           ('# users(id, name)', true),
                                           ('# secrets(token)', false),
                                           (NULL, true);")?;
                   Ok(())
                 })
                 .await);
  let source = PostgresSchemaSource::new(pool, "prompt_lines").unwrap();
  let mut lines = assert_ok!(source.schema_lines().await);
  lines.sort();
  assert_eq!(lines, vec!["".to_string(), "# users(id, name)".to_string()]);
}
