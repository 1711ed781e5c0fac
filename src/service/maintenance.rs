//! Maintenance transitions and the due-for-maintenance report.

use chrono::Utc;
use serde_json::json;

use crate::audit::{AuditAction, AuditSink};
use crate::authz::{self, Principal};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Asset, AssetStatus, RoleName};

use super::{asset_label_names, fetch_asset};

/// Available → Maintenance.
pub fn begin_maintenance(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
) -> Result<()> {
    let asset = fetch_asset(store, asset_id)?;
    let names = asset_label_names(store, asset.id)?;
    authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;

    if !store.transition_asset_status(
        asset.id,
        AssetStatus::Available,
        AssetStatus::Maintenance,
    )? {
        return Err(Error::conflict("asset is not available"));
    }
    audit.record(
        AuditAction::Update,
        "assets",
        principal.email(),
        &json!({ "id": asset.id, "status": AssetStatus::Maintenance.as_str() }).to_string(),
    );
    Ok(())
}

/// Maintenance → Available, stamping `last_maintenance` in the same
/// statement.
pub fn complete_maintenance(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
) -> Result<()> {
    let asset = fetch_asset(store, asset_id)?;
    let names = asset_label_names(store, asset.id)?;
    authz::require_role(principal, RoleName::CheckInOutAsset, &names)?;

    if !store.complete_maintenance(asset.id, Utc::now())? {
        return Err(Error::conflict("asset is not in maintenance"));
    }
    audit.record(
        AuditAction::Update,
        "assets",
        principal.email(),
        &json!({ "id": asset.id, "status": AssetStatus::Available.as_str() }).to_string(),
    );
    Ok(())
}

/// Assets the principal can read whose maintenance interval has lapsed:
/// now past `last_maintenance + maintenance_rate_days`.
pub fn due_for_maintenance(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
) -> Result<Vec<Asset>> {
    let vis = authz::visibility(store, principal, RoleName::ReadAsset)?;
    let now = Utc::now();
    let assets: Vec<Asset> = store
        .list_assets(vis.scope(), false)?
        .into_iter()
        .filter(|a| now > a.last_maintenance + chrono::Duration::days(a.maintenance_rate_days))
        .collect();
    audit.record(
        AuditAction::Select,
        "assets",
        principal.email(),
        &json!({ "due_for_maintenance": assets.len() }).to_string(),
    );
    Ok(assets)
}
