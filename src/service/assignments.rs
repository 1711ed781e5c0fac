//! Checkout lifecycle. Every transition is an atomic compare-and-set on
//! the asset's status column; a CAS that finds the asset in any other
//! state surfaces as `Conflict` and leaves no side effects behind.

use chrono::Utc;
use serde_json::json;

use crate::audit::{AuditAction, AuditSink};
use crate::authz::{self, Principal};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Assignment, AssetStatus, NewAssignment, RequestStatus, RoleName};

use super::{asset_label_names, fetch_asset, fetch_assignment, fetch_request, fetch_user};

fn due_date_from_today(due_in_days: i64) -> chrono::NaiveDate {
    Utc::now().date_naive() + chrono::Days::new(due_in_days as u64)
}

/// Checks an asset out to a user: Available → InUse plus a new active
/// assignment due `due_in_days` from today.
pub fn check_out(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
    user_id: i64,
    due_in_days: i64,
) -> Result<Assignment> {
    if due_in_days < 1 {
        return Err(Error::validation("due_in_days must be at least 1"));
    }
    let asset = fetch_asset(store, asset_id)?;
    let user = fetch_user(store, user_id)?;
    let names = asset_label_names(store, asset.id)?;
    authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;

    if !store.transition_asset_status(asset.id, AssetStatus::Available, AssetStatus::InUse)? {
        return Err(Error::conflict("asset is not available"));
    }

    audit.record(
        AuditAction::Update,
        "assets",
        principal.email(),
        &json!({ "id": asset.id, "status": AssetStatus::InUse.as_str() }).to_string(),
    );

    let assignment = store.create_assignment(&NewAssignment {
        asset_id: asset.id,
        user_id: user.id,
        assigned_by_id: principal.user.id,
        due_date: due_date_from_today(due_in_days),
        request_id: None,
    })?;
    audit.record(
        AuditAction::Insert,
        "assignments",
        principal.email(),
        &json!({ "id": assignment.id, "asset_id": asset.id, "user_id": user.id }).to_string(),
    );
    Ok(assignment)
}

/// Fulfills an approved request: asset Reserved → InUse and request
/// Approved → Fulfilled, the assignment going to the requester. If the
/// request transition loses after the asset transition won, the asset
/// is put back to Reserved before conflicting.
pub fn check_out_by_request(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    request_id: i64,
    due_in_days: i64,
) -> Result<Assignment> {
    if due_in_days < 1 {
        return Err(Error::validation("due_in_days must be at least 1"));
    }
    let request = fetch_request(store, request_id)?;
    if request.status != RequestStatus::Approved {
        return Err(Error::conflict("request is not approved"));
    }
    let asset = fetch_asset(store, request.asset_id)?;
    let names = asset_label_names(store, asset.id)?;
    authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;

    if !store.transition_asset_status(asset.id, AssetStatus::Reserved, AssetStatus::InUse)? {
        return Err(Error::conflict("asset is not reserved"));
    }
    if !store.transition_request_status(
        request.id,
        RequestStatus::Approved,
        RequestStatus::Fulfilled,
        None,
    )? {
        store.transition_asset_status(asset.id, AssetStatus::InUse, AssetStatus::Reserved)?;
        return Err(Error::conflict("request is not approved"));
    }
    audit.record(
        AuditAction::Update,
        "assets",
        principal.email(),
        &json!({ "id": asset.id, "status": AssetStatus::InUse.as_str() }).to_string(),
    );
    audit.record(
        AuditAction::Update,
        "requests",
        principal.email(),
        &json!({ "id": request.id, "status": RequestStatus::Fulfilled.as_str() }).to_string(),
    );

    let assignment = store.create_assignment(&NewAssignment {
        asset_id: asset.id,
        user_id: request.user_id,
        assigned_by_id: principal.user.id,
        due_date: due_date_from_today(due_in_days),
        request_id: Some(request.id),
    })?;
    audit.record(
        AuditAction::Insert,
        "assignments",
        principal.email(),
        &json!({ "id": assignment.id, "asset_id": asset.id, "request_id": request.id })
            .to_string(),
    );
    Ok(assignment)
}

fn check_in(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    assignment: &Assignment,
) -> Result<()> {
    if assignment.returned_at.is_some() {
        return Err(Error::conflict("assignment already returned"));
    }
    let names = asset_label_names(store, assignment.asset_id)?;
    authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;

    if !store.transition_asset_status(
        assignment.asset_id,
        AssetStatus::InUse,
        AssetStatus::Available,
    )? {
        return Err(Error::conflict("asset is not in use"));
    }
    audit.record(
        AuditAction::Update,
        "assets",
        principal.email(),
        &json!({ "id": assignment.asset_id, "status": AssetStatus::Available.as_str() })
            .to_string(),
    );
    store.mark_assignment_returned(assignment.id, Utc::now())?;
    audit.record(
        AuditAction::Update,
        "assignments",
        principal.email(),
        &json!({ "id": assignment.id, "asset_id": assignment.asset_id }).to_string(),
    );
    Ok(())
}

/// Returns an asset by its id, closing whichever assignment is active.
pub fn check_in_by_asset(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
) -> Result<()> {
    let asset = fetch_asset(store, asset_id)?;
    let assignment = store
        .active_assignment_for_asset(asset.id)?
        .ok_or_else(|| Error::conflict("asset has no active assignment"))?;
    check_in(store, audit, principal, &assignment)
}

/// Returns an asset by the assignment id.
pub fn check_in_by_assignment(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    assignment_id: i64,
) -> Result<()> {
    let assignment = fetch_assignment(store, assignment_id)?;
    check_in(store, audit, principal, &assignment)
}

/// Assignments where the principal is assignee or assigner.
pub fn my_assignments(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
) -> Result<Vec<Assignment>> {
    let assignments = store.assignments_for_user(principal.user.id)?;
    audit.record(
        AuditAction::Select,
        "assignments",
        principal.email(),
        &json!({ "count": assignments.len() }).to_string(),
    );
    Ok(assignments)
}

/// Active assignments involving the principal due within the window.
pub fn overdue(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    due_in_days: i64,
) -> Result<Vec<Assignment>> {
    if due_in_days < 0 {
        return Err(Error::validation("due_in_days must not be negative"));
    }
    let assignments = store.assignments_due_within(principal.user.id, due_in_days)?;
    audit.record(
        AuditAction::Select,
        "assignments",
        principal.email(),
        &json!({ "due_in_days": due_in_days, "count": assignments.len() }).to_string(),
    );
    Ok(assignments)
}

/// Moves an active assignment's due date to `due_in_days` from today.
/// Zero is allowed: a return can be asked for today.
pub fn request_return(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    assignment_id: i64,
    due_in_days: i64,
) -> Result<Assignment> {
    if due_in_days < 0 {
        return Err(Error::validation("due_in_days must not be negative"));
    }
    let mut assignment = fetch_assignment(store, assignment_id)?;
    if assignment.returned_at.is_some() {
        return Err(Error::conflict("assignment already returned"));
    }
    let names = asset_label_names(store, assignment.asset_id)?;
    authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;

    let due_date = due_date_from_today(due_in_days);
    store.set_assignment_due_date(assignment.id, due_date)?;
    assignment.due_date = due_date;
    audit.record(
        AuditAction::Update,
        "assignments",
        principal.email(),
        &json!({ "id": assignment.id, "due_date": due_date.to_string() }).to_string(),
    );
    Ok(assignment)
}

/// Fetches one assignment, visible only to its assignee or assigner.
pub fn get_assignment(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    assignment_id: i64,
) -> Result<Assignment> {
    let assignment = fetch_assignment(store, assignment_id)?;
    if assignment.user_id != principal.user.id && assignment.assigned_by_id != principal.user.id {
        return Err(Error::forbidden("not a party to this assignment"));
    }
    audit.record(
        AuditAction::Select,
        "assignments",
        principal.email(),
        &json!({ "id": assignment.id }).to_string(),
    );
    Ok(assignment)
}
