//! Public check endpoint.
//!
//! Third-party software presents a key and the domain it runs on. The
//! handler answers with the stored permit when the key exists, belongs to
//! that domain and is currently valid.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use permit_core::{check_domain_bounds, check_key_bounds, ensure_domain, Permit, StorageAddress};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Body of a check request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub key: String,
    pub domain: String,
    /// Attributes the caller believes it holds. Logged, never compared.
    #[serde(default)]
    pub attributes: BTreeMap<String, i64>,
}

/// `Expires` header value, IMF-fixdate.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub async fn check_permit(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let req: CheckRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "could not decode check request");
        ApiError::Decode(e.to_string())
    })?;

    let address = StorageAddress::derive(&req.key);
    let permit = verify(&state, &req).await.inspect_err(|e| {
        // Storage failures are logged with their cause where they are mapped.
        if !matches!(e, ApiError::Internal(_)) {
            warn!(%address, domain = %req.domain, error = %e, "permit check rejected");
        }
    })?;

    for (name, value) in &req.attributes {
        debug!(%address, attribute = %name, value, "requested attribute");
    }
    info!(
        %address,
        domain = %req.domain,
        expires = ?permit.expires,
        "permit check passed"
    );

    Ok(match permit.expires {
        Some(expires) => ([(header::EXPIRES, http_date(expires))], Json(permit)).into_response(),
        None => Json(permit).into_response(),
    })
}

async fn verify(state: &AppState, req: &CheckRequest) -> Result<Permit> {
    check_key_bounds(&req.key)?;
    check_domain_bounds(&req.domain)?;
    ensure_domain(&req.domain)?;

    let permit = state.keeper.get(&req.key).await.map_err(|e| {
        if e.is_not_found() {
            ApiError::NotFound
        } else {
            error!(address = %StorageAddress::derive(&req.key), error = %e, "could not fetch permit");
            ApiError::Internal("could not fetch permit")
        }
    })?;

    if permit.domain != req.domain {
        return Err(ApiError::Unauthorized("domain mismatch"));
    }
    if !permit.is_valid() {
        return Err(ApiError::Unauthorized("permit not valid"));
    }

    Ok(permit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_http_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(http_date(at), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn test_request_attributes_are_optional() {
        let req: CheckRequest =
            serde_json::from_str(r#"{"key":"abcd","domain":"example.com"}"#).unwrap();
        assert!(req.attributes.is_empty());
    }
}
