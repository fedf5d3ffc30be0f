//! Bearer token authentication for privileged routes.
//!
//! Tokens are HS256 JWTs signed with the configured secret. No claim is
//! required; `exp` and `nbf` are enforced when present.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Validate a raw token against the secret.
pub fn verify_token(token: &str, key: &DecodingKey) -> Result<Value, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_nbf = true;
    validation.validate_aud = false;

    let empty_claims: &[&str] = &[];
    validation.set_required_spec_claims(empty_claims);

    decode::<Value>(token, key, &validation).map(|data| data.claims)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reject requests without a valid bearer token.
pub async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(&req) else {
        warn!(path = %req.uri().path(), "missing bearer token");
        return Err(ApiError::Unauthorized("missing bearer token"));
    };

    match verify_token(token, &state.decoding_key) {
        Ok(claims) => {
            debug!(sub = ?claims.get("sub"), "bearer token accepted");
            Ok(next.run(req).await)
        }
        Err(e) => {
            warn!(error = %e, path = %req.uri().path(), "bearer token rejected");
            Err(ApiError::Unauthorized("invalid bearer token"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn sign(claims: &Value, secret: &[u8]) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn test_token_without_claims_is_accepted() {
        let token = sign(&json!({"sub": "ops"}), b"secret");
        let claims = verify_token(&token, &DecodingKey::from_secret(b"secret")).unwrap();
        assert_eq!(claims["sub"], "ops");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign(&json!({"sub": "ops"}), b"secret");
        assert!(verify_token(&token, &DecodingKey::from_secret(b"other")).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = sign(&json!({"sub": "ops", "exp": 1_000_000}), b"secret");
        assert!(verify_token(&token, &DecodingKey::from_secret(b"secret")).is_err());
    }

    #[test]
    fn test_bearer_prefix_is_required() {
        let req = Request::builder()
            .header(AUTHORIZATION, "Token abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), None);

        let req = Request::builder()
            .header(AUTHORIZATION, "Bearer abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), Some("abc"));
    }
}
