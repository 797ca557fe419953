use axum::{response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthStatus {
    status: String,
    message: String,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthStatus {
        status: "ok".into(),
        message: "API is healthy and model is loaded.".into(),
    })
}
