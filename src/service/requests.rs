//! Borrow-request workflow: submit, approve or reject exactly once,
//! then fulfillment via [`super::assignments::check_out_by_request`].

use serde_json::json;

use crate::audit::{AuditAction, AuditSink};
use crate::authz::{self, Principal};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{AssetStatus, NewRequest, Request, RequestStatus, RoleName};

use super::{asset_label_names, fetch_asset, fetch_request};

/// Submits a request for an asset on the principal's own behalf.
pub fn submit(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
    justification: &str,
) -> Result<Request> {
    if justification.trim().is_empty() {
        return Err(Error::validation("justification is required"));
    }
    let asset = fetch_asset(store, asset_id)?;
    let names = asset_label_names(store, asset.id)?;
    authz::require_role(principal, RoleName::RequestAsset, &names)?;

    let request = store.create_request(&NewRequest {
        user_id: principal.user.id,
        asset_id: asset.id,
        justification: justification.to_string(),
    })?;
    audit.record(
        AuditAction::Insert,
        "requests",
        principal.email(),
        &json!({ "id": request.id, "asset_id": asset.id }).to_string(),
    );
    Ok(request)
}

/// Approves a pending request and reserves its asset. The pending check
/// runs before the authorization check, so a request already decided
/// conflicts even for a caller who could not have decided it.
pub fn approve(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    request_id: i64,
) -> Result<Request> {
    let request = fetch_request(store, request_id)?;
    if request.status != RequestStatus::Pending {
        return Err(Error::conflict("request is not pending"));
    }
    let names = asset_label_names(store, request.asset_id)?;
    authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;

    if !store.transition_request_status(
        request.id,
        RequestStatus::Pending,
        RequestStatus::Approved,
        Some(principal.user.id),
    )? {
        return Err(Error::conflict("request is not pending"));
    }
    audit.record(
        AuditAction::Update,
        "requests",
        principal.email(),
        &json!({ "id": request.id, "status": RequestStatus::Approved.as_str() }).to_string(),
    );
    store.set_asset_status(request.asset_id, AssetStatus::Reserved)?;
    audit.record(
        AuditAction::Update,
        "assets",
        principal.email(),
        &json!({ "id": request.asset_id, "status": AssetStatus::Reserved.as_str() }).to_string(),
    );
    fetch_request(store, request.id)
}

/// Rejects a pending request. The asset is untouched.
pub fn reject(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    request_id: i64,
) -> Result<Request> {
    let request = fetch_request(store, request_id)?;
    if request.status != RequestStatus::Pending {
        return Err(Error::conflict("request is not pending"));
    }
    let names = asset_label_names(store, request.asset_id)?;
    authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;

    if !store.transition_request_status(
        request.id,
        RequestStatus::Pending,
        RequestStatus::Rejected,
        Some(principal.user.id),
    )? {
        return Err(Error::conflict("request is not pending"));
    }
    audit.record(
        AuditAction::Update,
        "requests",
        principal.email(),
        &json!({ "id": request.id, "status": RequestStatus::Rejected.as_str() }).to_string(),
    );
    fetch_request(store, request.id)
}

/// Requests whose asset falls inside the principal's `CheckInOutAsset`
/// visibility. Requests carry no labels; the filter runs over the
/// referenced asset's labels.
pub fn list_approvable(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
) -> Result<Vec<Request>> {
    let vis = authz::visibility(store, principal, RoleName::CheckInOutAsset)?;
    let requests = store.list_requests(vis.scope())?;
    audit.record(
        AuditAction::Select,
        "requests",
        principal.email(),
        &json!({ "count": requests.len() }).to_string(),
    );
    Ok(requests)
}

/// The principal's own requests, whatever their status.
pub fn my_requests(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
) -> Result<Vec<Request>> {
    let requests = store.requests_by_user(principal.user.id)?;
    audit.record(
        AuditAction::Select,
        "requests",
        principal.email(),
        &json!({ "count": requests.len() }).to_string(),
    );
    Ok(requests)
}

/// Fetches one request: the requester always, anyone else under
/// `CheckInOutAsset` over the asset's labels.
pub fn get_request(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    request_id: i64,
) -> Result<Request> {
    let request = fetch_request(store, request_id)?;
    if request.user_id != principal.user.id {
        let names = asset_label_names(store, request.asset_id)?;
        authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;
    }
    audit.record(
        AuditAction::Select,
        "requests",
        principal.email(),
        &json!({ "id": request.id }).to_string(),
    );
    Ok(request)
}
