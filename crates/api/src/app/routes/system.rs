use std::sync::Arc;

use axum::{Json, extract::Extension};

use hrpay_auth::AuthService;

use crate::app::dto::HealthResponse;

pub async fn health(Extension(service): Extension<Arc<AuthService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        auth_mode: service.mode().to_string(),
    })
}
