//! Label-scoped role authorization.
//!
//! Every decision starts from a [`Principal`]: a user plus the role
//! grants loaded for them. A grant pairs a role with a scope (one label
//! name or the `*` wildcard), and holding a role under several scopes
//! accumulates a scope set. The two primitives are [`Principal::has_role`]
//! for point checks against named labels, and [`visibility`] for turning
//! a read role into a listing filter.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Label, Role, RoleName, Scope, User};

/// An authenticated caller with their grants and labels loaded.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub roles: Vec<Role>,
    pub labels: Vec<Label>,
}

impl Principal {
    /// Loads a user with their role grants and labels in one pass.
    pub fn load(store: &dyn Store, user_id: i64) -> Result<Principal> {
        let user = store
            .get_user(user_id)?
            .ok_or(Error::NotFound("user"))?;
        let roles = store.roles_for_user(user.id)?;
        let labels = store.user_labels(user.id)?;
        Ok(Principal { user, roles, labels })
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    /// The scope set accumulated for one role across all grants.
    fn scopes_for(&self, role: RoleName) -> HashSet<&str> {
        self.roles
            .iter()
            .filter(|g| g.role == role)
            .map(|g| g.scope.as_str())
            .collect()
    }

    /// Whether this principal may act in `role` on an entity carrying
    /// `labels`. A wildcard grant covers everything; otherwise every
    /// named label must be inside the scope set. An empty label list
    /// passes vacuously, whatever the grants say.
    pub fn has_role(&self, role: RoleName, labels: &[String]) -> bool {
        let scopes = self.scopes_for(role);
        scopes.contains(Scope::WILDCARD)
            || labels.iter().all(|label| scopes.contains(label.as_str()))
    }

    /// Whether this principal holds `role` under the wildcard scope.
    /// Unscoped administrative actions (label management, user creation)
    /// check this rather than [`Principal::has_role`].
    pub fn has_wildcard(&self, role: RoleName) -> bool {
        self.roles
            .iter()
            .any(|g| g.role == role && g.scope.is_wildcard())
    }
}

/// How far a principal's read role reaches when listing entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// A wildcard grant: no filtering at all.
    Unrestricted,
    /// Label-scoped grants, resolved to label ids for the store's
    /// visibility predicate.
    Scoped(Vec<i64>),
}

impl Visibility {
    /// The form listing methods on [`Store`] take.
    pub fn scope(&self) -> Option<&[i64]> {
        match self {
            Visibility::Unrestricted => None,
            Visibility::Scoped(ids) => Some(ids),
        }
    }
}

/// Resolves a principal's visibility for `role`.
///
/// Wildcard grants see everything. A principal with no grant for the
/// role at all gets `Err(Forbidden)` rather than an empty filter: the
/// empty scope set would still show unlabeled entities, and someone
/// holding zero grants should not see even those. Scope names that
/// match no existing label are silently dropped.
pub fn visibility(
    store: &dyn Store,
    principal: &Principal,
    role: RoleName,
) -> Result<Visibility> {
    let scopes = store.scopes_for_role(principal.user.id, role)?;
    if scopes.iter().any(|s| s == Scope::WILDCARD) {
        return Ok(Visibility::Unrestricted);
    }
    if scopes.is_empty() {
        return Err(Error::forbidden(format!("not authorized for {role}")));
    }
    let ids = store.label_ids_by_names(&scopes)?;
    Ok(Visibility::Scoped(ids))
}

/// Point check as an error: `Forbidden` unless the principal may act in
/// `role` on an entity carrying `labels`.
pub fn require_role(principal: &Principal, role: RoleName, labels: &[String]) -> Result<()> {
    if principal.has_role(role, labels) {
        Ok(())
    } else {
        Err(Error::forbidden(format!("not authorized for {role}")))
    }
}

/// Wildcard-only check for unscoped administrative actions.
pub fn require_wildcard(principal: &Principal, role: RoleName) -> Result<()> {
    if principal.has_wildcard(role) {
        Ok(())
    } else {
        Err(Error::forbidden(format!("not authorized for {role}")))
    }
}

/// The label names attached to an entity, in the form point checks take.
pub fn label_names(labels: &[Label]) -> Vec<String> {
    labels.iter().map(|l| l.name.clone()).collect()
}
