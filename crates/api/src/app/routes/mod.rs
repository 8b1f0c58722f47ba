use axum::{Router, routing::get};

pub mod admin;
pub mod auth;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/check/:permission", get(auth::check))
        .nest("/admin", admin::router())
}
