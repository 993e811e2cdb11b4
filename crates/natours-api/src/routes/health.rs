use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "env": state.config.env.to_string(),
    }))
}
