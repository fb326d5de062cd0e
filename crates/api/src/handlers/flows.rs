use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use db::dags as dag_repo;
use engine::Dag;

use super::{engine_status, AppState};

#[derive(serde::Deserialize)]
pub struct ExecuteFlowDto {
    pub dag: Dag,
    #[serde(default)]
    pub input: Value,
}

/// Execute an ad-hoc DAG submitted in the request body.
pub async fn execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteFlowDto>,
) -> Result<Json<Value>, (StatusCode, String)> {
    state
        .executor
        .execute(&payload.dag, payload.input)
        .await
        .map(Json)
        .map_err(|e| (engine_status(&e), e.to_string()))
}

/// Execute a stored DAG; the body is the run input.
pub async fn execute_by_id(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let row = match dag_repo::get_dag(&state.pool, &id).await {
        Ok(row) => row,
        Err(db::DbError::NotFound) => {
            return Err((StatusCode::NOT_FOUND, format!("unknown dag '{id}'")))
        }
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };

    let dag: Dag = serde_json::from_value(row.definition).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("stored definition is not a valid dag: {e}"),
        )
    })?;

    state
        .executor
        .execute(&dag, input)
        .await
        .map(Json)
        .map_err(|e| (engine_status(&e), e.to_string()))
}
