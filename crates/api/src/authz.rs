//! Per-route permission guard.
//!
//! Routes declare the permission string they need right where they are
//! registered:
//!
//! ```ignore
//! get(handler).route_layer(from_fn_with_state(
//!     RequiredPermission("SEG.SEG_USUARIOS.C"),
//!     require_permission,
//! ))
//! ```
//!
//! The string is materialized and evaluated on each request; nothing is
//! registered up front.

use axum::{
    extract::State,
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use hrpay_auth::{Decision, enforce};

use crate::app::errors::json_error;
use crate::context::CredentialContext;

/// Permission string declared by a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredPermission(pub &'static str);

/// Decide a declared permission against the request's credential.
pub fn check(credential: &CredentialContext, declared: &str) -> Decision {
    enforce(declared, credential.permissions())
}

/// Deny with a generic 403 unless the credential grants the declared permission.
pub async fn require_permission(
    State(RequiredPermission(declared)): State<RequiredPermission>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(credential) = req.extensions().get::<CredentialContext>() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required");
    };

    match check(credential, declared) {
        Decision::Allow => next.run(req).await,
        Decision::Deny => forbidden(),
    }
}

pub fn forbidden() -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden")
}
