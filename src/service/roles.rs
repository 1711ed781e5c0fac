//! Role grant management.
//!
//! Granting and revoking both require the caller to hold
//! `CreateEditUser` and the role being granted, each checked over the
//! target user's labels plus the scope string itself. A wildcard scope
//! therefore demands a wildcard grant from the caller, since `*` only
//! ever matches a wildcard scope set.

use serde_json::json;

use crate::audit::{AuditAction, AuditSink};
use crate::authz::{self, Principal};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Role, RoleName, Scope};

use super::{fetch_user, user_label_names};

/// The fixed set of grantable roles.
pub fn all_roles() -> &'static [RoleName] {
    &RoleName::ALL
}

fn grant_check_labels(store: &dyn Store, user_id: i64, scope: &Scope) -> Result<Vec<String>> {
    let mut names = user_label_names(store, user_id)?;
    names.push(scope.as_str().to_string());
    Ok(names)
}

/// Grants `role` under `scope` to a user. A label scope must name an
/// existing label. Duplicate grants are permitted and create separate
/// rows.
pub fn grant_role(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
    role: RoleName,
    scope: &Scope,
) -> Result<Role> {
    let user = fetch_user(store, user_id)?;
    if let Scope::Label(name) = scope {
        store
            .get_label_by_name(name)?
            .ok_or(Error::NotFound("label"))?;
    }

    let labels = grant_check_labels(store, user.id, scope)?;
    authz::require_role(principal, RoleName::CreateEditUser, &labels)?;
    authz::require_role(principal, role, &labels)?;

    let grant = store.create_role(user.id, role, scope)?;
    audit.record(
        AuditAction::Insert,
        "roles",
        principal.email(),
        &json!({ "user_id": user.id, "role": role.as_str(), "scope": scope.as_str() })
            .to_string(),
    );
    Ok(grant)
}

/// Revokes one grant row, returning it. `NotFound` when the user holds
/// no such grant.
pub fn revoke_role(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
    role: RoleName,
    scope: &Scope,
) -> Result<Role> {
    let user = fetch_user(store, user_id)?;

    let labels = grant_check_labels(store, user.id, scope)?;
    authz::require_role(principal, RoleName::CreateEditUser, &labels)?;
    authz::require_role(principal, role, &labels)?;

    let grant = store
        .get_role(user.id, role, scope)?
        .ok_or(Error::NotFound("role grant"))?;
    store.delete_role(grant.id)?;
    audit.record(
        AuditAction::Delete,
        "roles",
        principal.email(),
        &json!({ "user_id": user.id, "role": role.as_str(), "scope": scope.as_str() })
            .to_string(),
    );
    Ok(grant)
}

/// Lists a user's grants. Visible to the user themselves, or to holders
/// of `ReadUser` over the user's labels.
pub fn roles_for_user(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    user_id: i64,
) -> Result<Vec<Role>> {
    let user = fetch_user(store, user_id)?;
    if principal.user.id != user.id {
        let names = user_label_names(store, user.id)?;
        authz::require_role(principal, RoleName::ReadUser, &names)?;
    }

    let roles = store.roles_for_user(user.id)?;
    audit.record(
        AuditAction::Select,
        "roles",
        principal.email(),
        &json!({ "user_id": user.id }).to_string(),
    );
    Ok(roles)
}
