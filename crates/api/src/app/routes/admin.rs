//! User administration endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::sync::CancellationToken;

use hrpay_auth::{AuthService, UserKey, flatten_grants};

use crate::app::dto::UserPermissionsResponse;
use crate::app::errors;
use crate::authz::{RequiredPermission, require_permission};

pub fn router() -> Router {
    Router::new().route(
        "/users/:user_key/permissions",
        get(user_permissions).route_layer(from_fn_with_state(
            RequiredPermission("SEG.SEG_USUARIOS.C"),
            require_permission,
        )),
    )
}

/// GET /admin/users/:user_key/permissions
///
/// Current effective permissions of a user, read from the store (not from
/// any issued credential).
pub async fn user_permissions(
    Extension(service): Extension<Arc<AuthService>>,
    Path(user_key): Path<String>,
) -> Response {
    let user = match UserKey::new(&user_key) {
        Ok(user) => user,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_user_key", e.to_string()),
    };

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    match service.permissions_of(&user, &cancel).await {
        Ok(aggregation) => Json(UserPermissionsResponse {
            user_key: user.to_string(),
            claims: flatten_grants(&aggregation.grants),
            groups: aggregation.groups,
            grants: aggregation.grants,
        })
        .into_response(),
        Err(err) => errors::auth_error_to_response(err),
    }
}
