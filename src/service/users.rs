//! User management. Users are soft-deleted only; listings hide deleted
//! rows while id lookups still resolve them.

use serde_json::json;

use crate::audit::{AuditAction, AuditSink};
use crate::authz::{self, Principal};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{NewUser, RoleName, User};

use super::{fetch_user, user_label_names};

/// Lists users the principal's `ReadUser` grants reach.
pub fn list_users(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
) -> Result<Vec<User>> {
    let vis = authz::visibility(store, principal, RoleName::ReadUser)?;
    let users = store.list_users(vis.scope(), false)?;
    audit.record(
        AuditAction::Select,
        "users",
        principal.email(),
        &json!({ "count": users.len() }).to_string(),
    );
    Ok(users)
}

/// Fetches one user: self always, anyone else under `ReadUser` over
/// their labels.
pub fn get_user(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
) -> Result<User> {
    let user = fetch_user(store, user_id)?;
    if principal.user.id != user.id {
        let names = user_label_names(store, user.id)?;
        authz::require_role(principal, RoleName::ReadUser, &names)?;
    }
    audit.record(
        AuditAction::Select,
        "users",
        principal.email(),
        &json!({ "id": user.id }).to_string(),
    );
    Ok(user)
}

/// Creates a user with at least one label. All label names must resolve
/// to existing labels, and the caller's `CreateEditUser` grants must
/// cover every one of them.
pub fn create_user(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    new: &NewUser,
    label_names: &[String],
) -> Result<User> {
    if label_names.is_empty() {
        return Err(Error::validation("at least one label is required"));
    }
    authz::require_role(principal, RoleName::CreateEditUser, label_names)?;

    let label_ids = store.label_ids_by_names(label_names)?;
    if label_ids.len() != label_names.len() {
        return Err(Error::NotFound("label"));
    }
    if store.get_user_by_email(&new.email)?.is_some() {
        return Err(Error::conflict("email already in use"));
    }
    if store.get_user_by_name(&new.name)?.is_some() {
        return Err(Error::conflict("name already in use"));
    }

    let user = store.create_user(new)?;
    for label_id in &label_ids {
        store.add_user_label(user.id, *label_id)?;
    }
    audit.record(
        AuditAction::Insert,
        "users",
        principal.email(),
        &json!({ "id": user.id, "email": user.email, "labels": label_names }).to_string(),
    );
    Ok(user)
}

fn set_disabled(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
    disabled: bool,
) -> Result<User> {
    let mut user = fetch_user(store, user_id)?;
    let names = user_label_names(store, user.id)?;
    authz::require_role(principal, RoleName::DisableUser, &names)?;

    user.disabled = disabled;
    store.update_user(&user)?;
    audit.record(
        AuditAction::Update,
        "users",
        principal.email(),
        &json!({ "id": user.id, "disabled": disabled }).to_string(),
    );
    Ok(user)
}

pub fn disable_user(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
) -> Result<User> {
    set_disabled(store, audit, principal, user_id, true)
}

pub fn enable_user(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
) -> Result<User> {
    set_disabled(store, audit, principal, user_id, false)
}

/// Soft-deletes a user. Self-deletion is refused outright.
pub fn delete_user(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
) -> Result<()> {
    if principal.user.id == user_id {
        return Err(Error::forbidden("cannot delete yourself"));
    }
    let mut user = fetch_user(store, user_id)?;
    let names = user_label_names(store, user.id)?;
    authz::require_role(principal, RoleName::DeleteUser, &names)?;

    user.deleted = true;
    store.update_user(&user)?;
    audit.record(
        AuditAction::Delete,
        "users",
        principal.email(),
        &json!({ "id": user.id }).to_string(),
    );
    Ok(())
}
