use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use query_flow::{logging, router, StatusClient};
use query_workflow::{WorkflowConfig, WorkflowCoordinator, WorkflowFactory, WorkflowType};
use std::sync::Arc;
use std::time::Duration;

/// Cada cuánto se purgan las ejecuciones terminales vencidas.
const PURGE_EVERY: Duration = Duration::from_secs(15 * 60);

#[derive(Parser)]
#[command(name = "main-core", about = "Consultas en lenguaje natural o SQL publicadas como CSV")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Levanta la API HTTP.
    Serve {
        /// Dirección de escucha; por defecto `QUERY_FLOW_BIND` o 0.0.0.0:8080.
        #[arg(long)]
        bind: Option<String>,
        /// Usa colaboradores simulados y repositorio en memoria.
        #[arg(long)]
        offline: bool,
    },
    /// Inicia una ejecución en un servidor y, con --wait, espera el resultado.
    Submit {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        base_url: String,
        /// `nl-sql` o `exec-sql`.
        #[arg(long, default_value = "exec-sql")]
        workflow: String,
        #[arg(long)]
        query: String,
        #[arg(long)]
        wait: bool,
        /// Límite de espera en segundos.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Muestra el documento de estado de una ejecución.
    Status { status_url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { bind, offline } => serve(bind, offline).await,
        Command::Submit { base_url,
                          workflow,
                          query,
                          wait,
                          timeout_secs, } => {
            let workflow_type = workflow.parse::<WorkflowType>().unwrap_or_default();
            if workflow_type == WorkflowType::Unknown {
                bail!("workflow desconocido: {} (use nl-sql o exec-sql)", workflow);
            }
            let client = StatusClient::new(base_url).timeout(timeout_secs.map(Duration::from_secs));
            let accepted = client.submit(workflow_type, &query).await?;
            println!("instanceId: {}", accepted.instance_id);
            println!("statusUrl:  {}", accepted.status_url);
            if wait {
                let output = client.wait_for_completion(&accepted.status_url).await?;
                println!("sqlQuery:       {}", output.sql_query);
                println!("resultsFileUrl: {}", output.results_file_url);
            }
            Ok(())
        }
        Command::Status { status_url } => {
            let doc = StatusClient::new("").get_status(&status_url).await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
    }
}

async fn serve(bind: Option<String>, offline: bool) -> anyhow::Result<()> {
    let (coordinator, bind_addr) = if offline {
        tracing::warn!("modo offline: los resultados son simulados");
        (WorkflowFactory::offline("select 1 as id, 'a' as name;"), query_workflow::config::DEFAULT_BIND.to_string())
    } else {
        let cfg = WorkflowConfig::from_env().context("configuración inválida")?;
        let coordinator = WorkflowFactory::from_config(&cfg).await?;
        spawn_purge(coordinator.clone(), cfg.run_retention);
        (coordinator, cfg.bind_addr)
    };
    let bind_addr = bind.unwrap_or(bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await
                                                            .with_context(|| format!("no se pudo escuchar en {}", bind_addr))?;
    tracing::info!("API escuchando en {}", bind_addr);
    axum::serve(listener, router(coordinator)).await?;
    Ok(())
}

/// Tarea periódica de retención.
fn spawn_purge(coordinator: Arc<WorkflowCoordinator>, retention: chrono::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_EVERY);
        loop {
            ticker.tick().await;
            if let Err(e) = coordinator.purge_expired(retention).await {
                tracing::warn!("purga de ejecuciones fallida: {}", e);
            }
        }
    });
}
