use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AssetStatus, LinkRelation, RequestStatus, RoleName, Scope};

/// A named tag attached to assets and users. Names are opaque to the
/// engine; conventions like `department:HR` live entirely in the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub password_salt: String,
    pub disabled: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub must_reset_password: bool,
}

/// Insert payload for a user. The credential pair is produced by the
/// authentication layer; this crate stores it untouched.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub password_salt: String,
}

/// One (role, scope) grant held by a user. A user may hold the same role
/// under several scopes; the grants are disjoint, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub user_id: i64,
    pub role: RoleName,
    pub scope: Scope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub tag: String,
    pub name: String,
    pub description: String,
    pub status: AssetStatus,
    pub purchase_date: NaiveDate,
    pub purchase_cost: f64,
    pub created_at: DateTime<Utc>,
    pub last_maintenance: DateTime<Utc>,
    pub maintenance_rate_days: i64,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAsset {
    pub tag: String,
    pub name: String,
    pub description: String,
    pub purchase_date: NaiveDate,
    pub purchase_cost: f64,
    pub maintenance_rate_days: i64,
}

/// Partial update for an asset; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetUpdate {
    pub tag: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<f64>,
    pub maintenance_rate_days: Option<i64>,
}

/// A directed edge between two assets. The inverse view (`linked_to`) is
/// derived by querying the edge from the other side, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLink {
    pub id: i64,
    pub asset_id: i64,
    pub linked_id: i64,
    pub relation: LinkRelation,
}

/// An asset with its labels and link edges loaded in one query pass.
#[derive(Debug, Clone, Serialize)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub asset: Asset,
    pub labels: Vec<Label>,
    pub linked_assets: Vec<AssetLink>,
    pub linked_to: Vec<AssetLink>,
}

/// A checkout record. `returned_at == None` marks the assignment active;
/// at most one active assignment exists per asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub asset_id: i64,
    pub user_id: i64,
    pub assigned_by_id: i64,
    pub assigned_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAssignment {
    pub asset_id: i64,
    pub user_id: i64,
    pub assigned_by_id: i64,
    pub due_date: NaiveDate,
    pub request_id: Option<i64>,
}

/// A user's request to borrow an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: i64,
    pub user_id: i64,
    pub asset_id: i64,
    pub status: RequestStatus,
    pub justification: String,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRequest {
    pub user_id: i64,
    pub asset_id: i64,
    pub justification: String,
}
