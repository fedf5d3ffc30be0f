//! Authenticated create endpoint.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use permit_core::{issue, IssueRequest, Permit, PermitKind};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Body of a create request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub domain: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, i64>,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub entity: String,
    #[serde(default, rename = "type")]
    pub kind: PermitKind,
}

impl From<CreateRequest> for IssueRequest {
    fn from(req: CreateRequest) -> Self {
        IssueRequest {
            domain: req.domain,
            attributes: req.attributes,
            contact: req.contact,
            entity: req.entity,
            kind: req.kind,
            key: None,
        }
    }
}

pub async fn create_permit(State(state): State<AppState>, body: Bytes) -> Result<Json<Permit>> {
    let req: CreateRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "could not decode create request");
        ApiError::Decode(e.to_string())
    })?;

    let domain = req.domain.clone();
    let kind = req.kind;
    let issued = issue(req.into(), Utc::now()).inspect_err(|e| {
        warn!(domain = %domain, error = %e, "create rejected");
    })?;

    if !issued.dropped_attributes.is_empty() {
        warn!(
            domain = %domain,
            dropped = ?issued.dropped_attributes,
            "ignoring unknown attributes"
        );
    }

    let permit = issued.permit;
    if let Err(e) = state.keeper.create(&permit).await {
        // A generated key colliding is not retried; it points at a broken RNG or store.
        error!(domain = %domain, address = %permit.address(), error = %e, "could not store permit");
        return Err(ApiError::Internal("could not store permit"));
    }

    info!(
        address = %permit.address(),
        domain = %permit.domain,
        kind = ?kind,
        expires = ?permit.expires,
        "permit created"
    );
    Ok(Json(permit))
}
