mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Listing methods that accept a `scope` apply the label-visibility
/// predicate: with `Some(label_ids)`, an entity is returned only when
/// every label attached to it is inside the given set (entities with no
/// labels pass vacuously); `None` means unrestricted. Deciding whether a
/// caller gets `None`, a set, or no query at all is the authorization
/// engine's job, not the store's.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Label operations
    fn create_label(&self, name: &str) -> Result<Label>;
    fn get_label(&self, id: i64) -> Result<Option<Label>>;
    fn get_label_by_name(&self, name: &str) -> Result<Option<Label>>;
    fn list_labels(&self) -> Result<Vec<Label>>;
    fn delete_label(&self, id: i64) -> Result<bool>;
    /// Resolves label names to ids. Unknown names are silently absent
    /// from the result; callers that need all-or-nothing must compare
    /// lengths themselves.
    fn label_ids_by_names(&self, names: &[String]) -> Result<Vec<i64>>;
    /// True when the label is attached to at least one asset or user.
    fn label_has_relationships(&self, label_id: i64) -> Result<bool>;

    // Label mapping operations
    fn add_asset_label(&self, asset_id: i64, label_id: i64) -> Result<()>;
    fn remove_asset_label(&self, asset_id: i64, label_id: i64) -> Result<bool>;
    fn has_asset_label(&self, asset_id: i64, label_id: i64) -> Result<bool>;
    fn asset_labels(&self, asset_id: i64) -> Result<Vec<Label>>;
    fn add_user_label(&self, user_id: i64, label_id: i64) -> Result<()>;
    fn remove_user_label(&self, user_id: i64, label_id: i64) -> Result<bool>;
    fn has_user_label(&self, user_id: i64, label_id: i64) -> Result<bool>;
    fn user_labels(&self, user_id: i64) -> Result<Vec<Label>>;

    // User operations
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn list_users(&self, scope: Option<&[i64]>, include_deleted: bool) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;

    // Role grant operations. Duplicate grants of the same triple are
    // allowed and create separate rows.
    fn create_role(&self, user_id: i64, role: RoleName, scope: &Scope) -> Result<Role>;
    fn get_role(&self, user_id: i64, role: RoleName, scope: &Scope) -> Result<Option<Role>>;
    fn delete_role(&self, id: i64) -> Result<bool>;
    fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>>;
    fn scopes_for_role(&self, user_id: i64, role: RoleName) -> Result<Vec<String>>;

    // Asset operations
    fn create_asset(&self, asset: &NewAsset) -> Result<Asset>;
    fn get_asset(&self, id: i64) -> Result<Option<Asset>>;
    fn get_asset_by_tag(&self, tag: &str) -> Result<Option<Asset>>;
    fn list_assets(&self, scope: Option<&[i64]>, include_deleted: bool) -> Result<Vec<Asset>>;
    fn list_assets_by_status(
        &self,
        status: AssetStatus,
        scope: Option<&[i64]>,
    ) -> Result<Vec<Asset>>;
    fn update_asset(&self, asset: &Asset) -> Result<()>;
    /// Compare-and-set on the status column. Returns false when the
    /// asset is missing or no longer in `from`; lifecycle transitions
    /// rely on this as their atomic read-modify-write step.
    fn transition_asset_status(&self, id: i64, from: AssetStatus, to: AssetStatus)
    -> Result<bool>;
    /// Unconditional status write, used where a transition has no
    /// status precondition on the asset side (request approval).
    fn set_asset_status(&self, id: i64, status: AssetStatus) -> Result<()>;
    /// Maintenance → Available plus the `last_maintenance` stamp, in one
    /// statement.
    fn complete_maintenance(&self, id: i64, finished_at: DateTime<Utc>) -> Result<bool>;

    // Asset link operations
    fn create_link(&self, asset_id: i64, linked_id: i64, relation: LinkRelation)
    -> Result<AssetLink>;
    fn get_link(&self, asset_id: i64, linked_id: i64) -> Result<Option<AssetLink>>;
    fn delete_link(&self, id: i64) -> Result<bool>;
    fn links_from_asset(&self, asset_id: i64) -> Result<Vec<AssetLink>>;
    fn links_to_asset(&self, asset_id: i64) -> Result<Vec<AssetLink>>;

    // Assignment operations
    fn create_assignment(&self, assignment: &NewAssignment) -> Result<Assignment>;
    fn get_assignment(&self, id: i64) -> Result<Option<Assignment>>;
    fn active_assignment_for_asset(&self, asset_id: i64) -> Result<Option<Assignment>>;
    /// Assignments where the user is assignee or assigner, returned and
    /// active alike.
    fn assignments_for_user(&self, user_id: i64) -> Result<Vec<Assignment>>;
    /// Active assignments involving the user with a due date inside the
    /// next `due_in_days` days.
    fn assignments_due_within(&self, user_id: i64, due_in_days: i64) -> Result<Vec<Assignment>>;
    /// Stamps `returned_at` on a still-active assignment. Returns false
    /// if the assignment is missing or already returned.
    fn mark_assignment_returned(&self, id: i64, returned_at: DateTime<Utc>) -> Result<bool>;
    fn set_assignment_due_date(&self, id: i64, due_date: NaiveDate) -> Result<()>;

    // Request operations
    fn create_request(&self, request: &NewRequest) -> Result<Request>;
    fn get_request(&self, id: i64) -> Result<Option<Request>>;
    /// Scoped by the labels of the *referenced asset*; requests carry no
    /// labels of their own.
    fn list_requests(&self, scope: Option<&[i64]>) -> Result<Vec<Request>>;
    fn requests_by_user(&self, user_id: i64) -> Result<Vec<Request>>;
    /// Compare-and-set on the request status. `approved_by`, when given,
    /// records the acting approver; `None` leaves the column untouched.
    fn transition_request_status(
        &self,
        id: i64,
        from: RequestStatus,
        to: RequestStatus,
        approved_by: Option<i64>,
    ) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
