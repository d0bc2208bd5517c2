use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;
use crate::visitors::CounterError;

/// GET /api/visitors
pub async fn handle_get_visitors(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "count": state.visitors.current().await }))
}

/// POST /api/visitors
pub async fn handle_record_visit(State(state): State<AppState>) -> Result<Json<Value>, CounterError> {
    let count = state.visitors.increment().await?;
    Ok(Json(json!({ "count": count })))
}
