//! `api` crate — HTTP REST API layer
//!
//! Exposes:
//!   POST   /v1/flows/execute
//!   POST   /v1/dags
//!   GET    /v1/dags
//!   GET    /v1/dags/:id
//!   PUT    /v1/dags/:id
//!   DELETE /v1/dags/:id
//!   POST   /v1/dags/:id/execute
//!   GET    /v1/tables
//!   GET    /v1/tables/:name

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use adapters::RelationalStore;
use db::DbPool;
use engine::Executor;

#[derive(Clone)]
pub struct AppState {
    /// Pool backing the DAG definition repository.
    pub pool: DbPool,
    /// The store workflow steps execute against; also serves introspection.
    pub store: Arc<dyn RelationalStore>,
    pub executor: Arc<Executor>,
}

pub async fn serve(bind: &str, state: AppState) -> Result<(), std::io::Error> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let v1 = Router::new()
        .route("/flows/execute", post(handlers::flows::execute))
        .route(
            "/dags",
            get(handlers::dags::list).post(handlers::dags::create),
        )
        .route(
            "/dags/:id",
            get(handlers::dags::get)
                .put(handlers::dags::update)
                .delete(handlers::dags::delete),
        )
        .route("/dags/:id/execute", post(handlers::flows::execute_by_id))
        .route("/tables", get(handlers::tables::list))
        .route("/tables/:name", get(handlers::tables::columns));

    let app = Router::new()
        .nest("/v1", v1)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
