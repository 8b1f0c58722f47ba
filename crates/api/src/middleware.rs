use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use hrpay_auth::AuthService;

use crate::app::errors::json_error;
use crate::context::CredentialContext;

#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
}

/// Verify the bearer credential and attach a [`CredentialContext`].
///
/// Every rejection reason answers the same 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return unauthorized();
    };

    let credential = match state.service.verify(token) {
        Ok(credential) => credential,
        Err(err) => {
            tracing::debug!(error = %err, "bearer credential rejected");
            return unauthorized();
        }
    };

    req.extensions_mut().insert(CredentialContext::from(credential));
    next.run(req).await
}

fn unauthorized() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required")
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
