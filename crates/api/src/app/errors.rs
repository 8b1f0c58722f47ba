use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use hrpay_auth::AuthError;

/// Map an engine error to its HTTP response.
///
/// Credential failures share one body so callers cannot tell an unknown user
/// from a wrong password or a disabled account.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials | AuthError::AccountInactive => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid credentials")
        }
        AuthError::TokenInvalid(_) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required")
        }
        AuthError::StoreUnavailable(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_unavailable",
            "permission store unavailable",
        ),
        AuthError::Cancelled => json_error(StatusCode::SERVICE_UNAVAILABLE, "cancelled", "request cancelled"),
        AuthError::Encoding(msg) | AuthError::Config(msg) => {
            tracing::error!(error = %msg, "login failed on server side");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_status() {
        let invalid = auth_error_to_response(AuthError::InvalidCredentials);
        let inactive = auth_error_to_response(AuthError::AccountInactive);
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(inactive.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn store_failures_are_distinguishable() {
        let res = auth_error_to_response(AuthError::StoreUnavailable("db".into()));
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let res = auth_error_to_response(AuthError::Config("no tenant".into()));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
