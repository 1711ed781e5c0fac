mod models;
mod role;
mod status;

pub use models::*;
pub use role::{RoleName, Scope};
pub use status::{AssetStatus, LinkRelation, RequestStatus};
