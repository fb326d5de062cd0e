use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, String)> {
    match state.store.table_names().await {
        Ok(tables) => Ok(Json(json!({ "data": tables }))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn columns(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match state.store.columns(&name).await {
        Ok(columns) => Ok(Json(json!({ "data": columns }))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
