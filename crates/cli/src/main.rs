//! `runner` CLI entry-point.
//!
//! Available sub-commands:
//! - `start`    — execute a DAG definition file against a database.
//! - `serve`    — start the HTTP API server.
//! - `validate` — structurally validate a DAG JSON file.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use adapters::JsonHttpClient;
use db::PgStore;
use engine::Executor;

#[derive(Parser)]
#[command(name = "runner", about = "DAG workflow execution engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a DAG file and print its output.
    Start {
        /// DAG json file to execute.
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
        /// Postgres connection string.
        #[arg(short = 'p', long = "postgres", env = "DATABASE_URL")]
        postgres: String,
        /// Input json matching the DAG's input schema.
        #[arg(short = 'i', long = "input")]
        input: String,
    },
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "PORT", default_value = "8080")]
        port: u16,
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a DAG definition JSON file.
    Validate {
        /// Path to the DAG JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Start {
            file,
            postgres,
            input,
        } => {
            let input: serde_json::Value = serde_json::from_str(&input)
                .unwrap_or_else(|e| fail(&format!("cannot parse input as JSON: {e}")));

            let content = std::fs::read_to_string(&file)
                .unwrap_or_else(|e| fail(&format!("cannot read file {}: {e}", file.display())));
            let dag: engine::Dag = serde_json::from_str(&content)
                .unwrap_or_else(|e| fail(&format!("invalid DAG JSON: {e}")));

            let store = PgStore::connect(&postgres)
                .await
                .unwrap_or_else(|e| fail(&format!("failed to connect to database: {e}")));
            let http = JsonHttpClient::new()
                .unwrap_or_else(|e| fail(&format!("failed to create http client: {e}")));

            let executor = Executor::new(Arc::new(store), Arc::new(http));
            match executor.execute(&dag, input).await {
                Ok(output) => {
                    println!("{}", serde_json::to_string(&output).unwrap());
                }
                Err(e) => fail(&format!("execution failed: {e}")),
            }
        }

        Command::Serve { port, database_url } => {
            let pool = db::pool::create_pool(&database_url)
                .await
                .unwrap_or_else(|e| fail(&format!("failed to connect to database: {e}")));
            db::pool::run_migrations(&pool)
                .await
                .unwrap_or_else(|e| fail(&format!("migration failed: {e}")));

            let store = Arc::new(PgStore::new(pool.clone()));
            let http = Arc::new(
                JsonHttpClient::new()
                    .unwrap_or_else(|e| fail(&format!("failed to create http client: {e}"))),
            );
            let state = api::AppState {
                pool,
                store: store.clone(),
                executor: Arc::new(Executor::new(store, http)),
            };

            let bind = format!("0.0.0.0:{port}");
            info!("starting API server on {bind}");
            if let Err(e) = api::serve(&bind, state).await {
                fail(&format!("server failed: {e}"));
            }
        }

        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| fail(&format!("cannot read file {}: {e}", path.display())));
            let dag: engine::Dag = serde_json::from_str(&content)
                .unwrap_or_else(|e| fail(&format!("invalid DAG JSON: {e}")));

            match engine::plan(&dag) {
                Ok(plan) => {
                    println!(
                        "dag is valid: {} steps, roots {:?}, output step '{}'",
                        dag.steps.len(),
                        plan.roots,
                        plan.output
                    );
                }
                Err(e) => fail(&format!("validation failed: {e}")),
            }
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}
