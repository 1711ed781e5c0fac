//! Label management and label-to-entity mappings.
//!
//! Creating and deleting labels is an unscoped administrative action:
//! label names are themselves the currency of scoping, so the gate is a
//! wildcard grant for either `CreateEditUser` or `CreateEditAsset`.

use serde_json::json;

use crate::audit::{AuditAction, AuditSink};
use crate::authz::{self, Principal};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Label, RoleName};

use super::{fetch_asset, fetch_label, fetch_user, user_label_names};

fn require_label_admin(principal: &Principal) -> Result<()> {
    if principal.has_wildcard(RoleName::CreateEditUser)
        || principal.has_wildcard(RoleName::CreateEditAsset)
    {
        Ok(())
    } else {
        Err(Error::forbidden("not authorized to manage labels"))
    }
}

/// Creates a label, idempotently: an existing label with the same name
/// is returned as-is rather than conflicting.
pub fn create_label(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    name: &str,
) -> Result<Label> {
    require_label_admin(principal)?;
    if name.trim().is_empty() {
        return Err(Error::validation("label name is required"));
    }
    if let Some(existing) = store.get_label_by_name(name)? {
        return Ok(existing);
    }
    let label = store.create_label(name)?;
    audit.record(
        AuditAction::Insert,
        "labels",
        principal.email(),
        &json!({ "id": label.id, "name": label.name }).to_string(),
    );
    Ok(label)
}

/// Deletes a label. `Conflict` while any asset or user still carries it.
pub fn delete_label(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    label_id: i64,
) -> Result<()> {
    require_label_admin(principal)?;
    let label = fetch_label(store, label_id)?;
    if store.label_has_relationships(label.id)? {
        return Err(Error::conflict("label is still assigned"));
    }
    store.delete_label(label.id)?;
    audit.record(
        AuditAction::Delete,
        "labels",
        principal.email(),
        &json!({ "id": label.id, "name": label.name }).to_string(),
    );
    Ok(())
}

pub fn list_labels(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
) -> Result<Vec<Label>> {
    let labels = store.list_labels()?;
    audit.record(
        AuditAction::Select,
        "labels",
        principal.email(),
        &json!({ "count": labels.len() }).to_string(),
    );
    Ok(labels)
}

pub fn get_label(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    label_id: i64,
) -> Result<Label> {
    let label = fetch_label(store, label_id)?;
    audit.record(
        AuditAction::Select,
        "labels",
        principal.email(),
        &json!({ "id": label.id }).to_string(),
    );
    Ok(label)
}

/// Attaches a label to a user. The caller must hold `CreateEditUser`
/// over the user's current labels plus the one being added.
pub fn assign_user_label(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
    label_id: i64,
) -> Result<()> {
    let user = fetch_user(store, user_id)?;
    let label = fetch_label(store, label_id)?;

    let mut names = user_label_names(store, user.id)?;
    names.push(label.name.clone());
    authz::require_role(principal, RoleName::CreateEditUser, &names)?;

    store.add_user_label(user.id, label.id)?;
    audit.record(
        AuditAction::Insert,
        "user_labels",
        principal.email(),
        &json!({ "user_id": user.id, "label_id": label.id }).to_string(),
    );
    Ok(())
}

pub fn unassign_user_label(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
    label_id: i64,
) -> Result<()> {
    let user = fetch_user(store, user_id)?;
    let label = fetch_label(store, label_id)?;

    let names = user_label_names(store, user.id)?;
    authz::require_role(principal, RoleName::CreateEditUser, &names)?;

    if !store.remove_user_label(user.id, label.id)? {
        return Err(Error::NotFound("label assignment"));
    }
    audit.record(
        AuditAction::Delete,
        "user_labels",
        principal.email(),
        &json!({ "user_id": user.id, "label_id": label.id }).to_string(),
    );
    Ok(())
}

/// Attaches a label to an asset. Same shape as the user variant, gated
/// on `CreateEditAsset`.
pub fn assign_asset_label(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
    label_id: i64,
) -> Result<()> {
    let asset = fetch_asset(store, asset_id)?;
    let label = fetch_label(store, label_id)?;

    let mut names = super::asset_label_names(store, asset.id)?;
    names.push(label.name.clone());
    authz::require_role(principal, RoleName::CreateEditAsset, &names)?;

    store.add_asset_label(asset.id, label.id)?;
    audit.record(
        AuditAction::Insert,
        "asset_labels",
        principal.email(),
        &json!({ "asset_id": asset.id, "label_id": label.id }).to_string(),
    );
    Ok(())
}

pub fn unassign_asset_label(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
    label_id: i64,
) -> Result<()> {
    let asset = fetch_asset(store, asset_id)?;
    let label = fetch_label(store, label_id)?;

    let names = super::asset_label_names(store, asset.id)?;
    authz::require_role(principal, RoleName::CreateEditAsset, &names)?;

    if !store.remove_asset_label(asset.id, label.id)? {
        return Err(Error::NotFound("label assignment"));
    }
    audit.record(
        AuditAction::Delete,
        "asset_labels",
        principal.email(),
        &json!({ "asset_id": asset.id, "label_id": label.id }).to_string(),
    );
    Ok(())
}
