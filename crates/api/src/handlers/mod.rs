pub mod dags;
pub mod flows;
pub mod tables;

use axum::http::StatusCode;

use engine::EngineError;

pub(crate) use crate::AppState;

/// Structural problems are the caller's fault; everything else is a
/// run-time failure.
pub(crate) fn engine_status(err: &EngineError) -> StatusCode {
    if err.is_structural() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
