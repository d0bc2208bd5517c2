use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/status
pub async fn status_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Non-secret identity-provider settings the frontend needs to start a login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub auth0_domain: Option<String>,
    pub auth0_client_id: Option<String>,
    pub auth0_audience: Option<String>,
}

/// GET /api/config
pub async fn config_handler(State(state): State<AppState>) -> Json<PublicConfig> {
    let auth = &state.config.auth;
    Json(PublicConfig {
        auth0_domain: auth.domain.clone(),
        auth0_client_id: auth.client_id.clone(),
        auth0_audience: auth.audience.clone(),
    })
}
