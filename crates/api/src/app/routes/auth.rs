use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;

use hrpay_auth::{AuthService, LoginInput};

use crate::app::dto::{CheckResponse, MeResponse};
use crate::app::errors;
use crate::authz;
use crate::context::CredentialContext;

/// POST /auth/login
pub async fn login(
    Extension(service): Extension<Arc<AuthService>>,
    Json(input): Json<LoginInput>,
) -> Response {
    // Dropping the handler (client went away) cancels the permission lookup.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    match service.login(&input, &cancel).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => errors::auth_error_to_response(err),
    }
}

/// GET /auth/me
pub async fn me(Extension(credential): Extension<CredentialContext>) -> Json<MeResponse> {
    Json(MeResponse {
        subject: credential.subject().to_string(),
        tenant_id: credential.tenant_id(),
        permissions: credential.permission_claims().to_vec(),
        expires_at: credential.expires_at(),
    })
}

/// GET /auth/check/:permission
///
/// Evaluates a permission string for the caller; malformed strings answer
/// `false` like any other deny.
pub async fn check(
    Extension(credential): Extension<CredentialContext>,
    Path(permission): Path<String>,
) -> Json<CheckResponse> {
    Json(CheckResponse {
        allowed: authz::check(&credential, &permission).is_allowed(),
    })
}
