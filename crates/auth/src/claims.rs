use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hrpay_core::TenantId;

/// Signed payload of an issued credential.
///
/// Standard `iss`/`aud`/`iat`/`nbf`/`exp` fields plus the subject, tenant and
/// the repeated `permission` claim holding flattened permission strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    pub iss: String,
    pub aud: String,

    /// Canonical user key of the subject.
    pub sub: String,

    pub tenant: TenantId,

    /// Issued-at, seconds since the Unix epoch (UTC).
    pub iat: i64,

    /// Not-before, seconds since the Unix epoch (UTC).
    pub nbf: i64,

    /// Expiry, seconds since the Unix epoch (UTC).
    pub exp: i64,

    #[serde(rename = "permission", default)]
    pub permissions: Vec<String>,
}

/// Why a presented credential was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFailure {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token audience does not match")]
    WrongAudience,

    #[error("token issuer does not match")]
    WrongIssuer,

    #[error("token is malformed")]
    Malformed,
}

impl TokenFailure {
    /// Stable reason code for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenFailure::Expired => "expired",
            TokenFailure::NotYetValid => "not_yet_valid",
            TokenFailure::BadSignature => "bad_signature",
            TokenFailure::WrongAudience => "wrong_audience",
            TokenFailure::WrongIssuer => "wrong_issuer",
            TokenFailure::Malformed => "malformed",
        }
    }
}

/// Deterministically validate the time window of decoded claims.
///
/// Zero clock-skew tolerance: a token is expired from the exact second named
/// by `exp`, and not valid before the second named by `nbf`.
pub fn validate_claims(claims: &CredentialClaims, now: DateTime<Utc>) -> Result<(), TokenFailure> {
    if claims.exp <= claims.iat || claims.nbf > claims.exp {
        return Err(TokenFailure::Malformed);
    }
    let now = now.timestamp();
    if now < claims.nbf {
        return Err(TokenFailure::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenFailure::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_at(now: DateTime<Utc>, ttl: Duration) -> CredentialClaims {
        CredentialClaims {
            iss: "hrpay".into(),
            aud: "hrpay-api".into(),
            sub: "admin".into(),
            tenant: TenantId::new(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            permissions: vec!["RH.FOLHA.IAEC".into()],
        }
    }

    #[test]
    fn valid_inside_window() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::minutes(10));
        assert_eq!(validate_claims(&claims, now), Ok(()));
        assert_eq!(validate_claims(&claims, now + Duration::minutes(9)), Ok(()));
    }

    #[test]
    fn expired_one_second_past_exp_without_grace() {
        let issued = Utc::now() - Duration::minutes(10);
        let claims = claims_at(issued, Duration::minutes(10) - Duration::seconds(1));
        assert_eq!(validate_claims(&claims, Utc::now()), Err(TokenFailure::Expired));
    }

    #[test]
    fn not_yet_valid_before_nbf() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::seconds(1), Duration::minutes(10));
        assert_eq!(validate_claims(&claims, now), Err(TokenFailure::NotYetValid));
    }

    #[test]
    fn inverted_window_is_malformed() {
        let now = Utc::now();
        let mut claims = claims_at(now, Duration::minutes(10));
        claims.exp = claims.iat;
        assert_eq!(validate_claims(&claims, now), Err(TokenFailure::Malformed));
    }

    #[test]
    fn permissions_serialize_under_permission_name() {
        let claims = claims_at(Utc::now(), Duration::minutes(1));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["permission"][0], "RH.FOLHA.IAEC");
        assert!(json.get("permissions").is_none());
    }

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(TokenFailure::Expired.reason(), "expired");
        assert_eq!(TokenFailure::BadSignature.reason(), "bad_signature");
        assert_eq!(TokenFailure::WrongAudience.reason(), "wrong_audience");
        assert_eq!(TokenFailure::Malformed.reason(), "malformed");
    }
}
