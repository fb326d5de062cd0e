use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use db::dags as dag_repo;
use engine::Dag;

use super::AppState;

/// Parse and structurally validate a DAG body before it is persisted.
fn checked_definition(body: &Value) -> Result<(), (StatusCode, String)> {
    let dag: Dag = serde_json::from_value(body.clone())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("malformed dag: {e}")))?;
    engine::plan(&dag)
        .map(|_| ())
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    checked_definition(&body)?;

    match dag_repo::save_dag(&state.pool, &body).await {
        Ok(row) => Ok((StatusCode::CREATED, Json(row.definition))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, (StatusCode, String)> {
    match dag_repo::list_dags(&state.pool).await {
        Ok(rows) => Ok(Json(rows.into_iter().map(|r| r.definition).collect())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn get(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match dag_repo::get_dag(&state.pool, &id).await {
        Ok(row) => Ok(Json(row.definition)),
        Err(db::DbError::NotFound) => Err((StatusCode::NOT_FOUND, format!("unknown dag '{id}'"))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn update(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    checked_definition(&body)?;

    match dag_repo::update_dag(&state.pool, &id, &body).await {
        Ok(()) => Ok(Json(serde_json::json!({ "id": id }))),
        Err(db::DbError::NotFound) => Err((StatusCode::NOT_FOUND, format!("unknown dag '{id}'"))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

pub async fn delete(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    match dag_repo::delete_dag(&state.pool, &id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(db::DbError::NotFound) => Err((StatusCode::NOT_FOUND, format!("unknown dag '{id}'"))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
