//! Asset CRUD and links. Status transitions live in
//! [`super::assignments`] and [`super::maintenance`].

use serde_json::json;

use crate::audit::{AuditAction, AuditSink};
use crate::authz::{self, Principal, label_names};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Asset, AssetDetail, AssetLink, AssetStatus, AssetUpdate, LinkRelation, NewAsset, RoleName};

use super::{asset_label_names, fetch_asset};

pub fn list_assets(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
) -> Result<Vec<Asset>> {
    let vis = authz::visibility(store, principal, RoleName::ReadAsset)?;
    let assets = store.list_assets(vis.scope(), false)?;
    audit.record(
        AuditAction::Select,
        "assets",
        principal.email(),
        &json!({ "count": assets.len() }).to_string(),
    );
    Ok(assets)
}

pub fn list_assets_by_status(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    status: AssetStatus,
) -> Result<Vec<Asset>> {
    let vis = authz::visibility(store, principal, RoleName::ReadAsset)?;
    let assets = store.list_assets_by_status(status, vis.scope())?;
    audit.record(
        AuditAction::Select,
        "assets",
        principal.email(),
        &json!({ "status": status.as_str(), "count": assets.len() }).to_string(),
    );
    Ok(assets)
}

/// Fetches one asset with its labels and both link directions loaded
/// explicitly in the same pass.
pub fn get_asset(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
) -> Result<AssetDetail> {
    let asset = fetch_asset(store, asset_id)?;
    let labels = store.asset_labels(asset.id)?;
    authz::require_role(principal, RoleName::ReadAsset, &label_names(&labels))?;

    let linked_assets = store.links_from_asset(asset.id)?;
    let linked_to = store.links_to_asset(asset.id)?;
    audit.record(
        AuditAction::Select,
        "assets",
        principal.email(),
        &json!({ "id": asset.id }).to_string(),
    );
    Ok(AssetDetail {
        asset,
        labels,
        linked_assets,
        linked_to,
    })
}

/// Creates an asset with at least one label, all of which must resolve
/// and be covered by the caller's `CreateEditAsset` grants.
pub fn create_asset(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    new: &NewAsset,
    labels: &[String],
) -> Result<Asset> {
    if labels.is_empty() {
        return Err(Error::validation("at least one label is required"));
    }
    authz::require_role(principal, RoleName::CreateEditAsset, labels)?;

    let label_ids = store.label_ids_by_names(labels)?;
    if label_ids.len() != labels.len() {
        return Err(Error::NotFound("label"));
    }
    if store.get_asset_by_tag(&new.tag)?.is_some() {
        return Err(Error::conflict("asset tag already in use"));
    }

    let asset = store.create_asset(new)?;
    for label_id in &label_ids {
        store.add_asset_label(asset.id, *label_id)?;
    }
    audit.record(
        AuditAction::Insert,
        "assets",
        principal.email(),
        &json!({ "id": asset.id, "tag": asset.tag, "labels": labels }).to_string(),
    );
    Ok(asset)
}

/// Partial update; `None` fields stay as they are.
pub fn update_asset(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
    update: &AssetUpdate,
) -> Result<Asset> {
    let mut asset = fetch_asset(store, asset_id)?;
    let names = asset_label_names(store, asset.id)?;
    authz::require_role(principal, RoleName::CreateEditAsset, &names)?;

    if let Some(tag) = &update.tag {
        if *tag != asset.tag && store.get_asset_by_tag(tag)?.is_some() {
            return Err(Error::conflict("asset tag already in use"));
        }
        asset.tag = tag.clone();
    }
    if let Some(name) = &update.name {
        asset.name = name.clone();
    }
    if let Some(description) = &update.description {
        asset.description = description.clone();
    }
    if let Some(purchase_date) = update.purchase_date {
        asset.purchase_date = purchase_date;
    }
    if let Some(purchase_cost) = update.purchase_cost {
        asset.purchase_cost = purchase_cost;
    }
    if let Some(rate) = update.maintenance_rate_days {
        asset.maintenance_rate_days = rate;
    }

    store.update_asset(&asset)?;
    audit.record(
        AuditAction::Update,
        "assets",
        principal.email(),
        &json!({ "id": asset.id }).to_string(),
    );
    Ok(asset)
}

/// Soft-deletes an asset.
pub fn retire_asset(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
) -> Result<()> {
    let mut asset = fetch_asset(store, asset_id)?;
    let names = asset_label_names(store, asset.id)?;
    authz::require_role(principal, RoleName::RetireAsset, &names)?;

    if asset.deleted {
        return Err(Error::conflict("asset already retired"));
    }
    asset.deleted = true;
    store.update_asset(&asset)?;
    audit.record(
        AuditAction::Delete,
        "assets",
        principal.email(),
        &json!({ "id": asset.id }).to_string(),
    );
    Ok(())
}

/// Creates a directed link between two assets. The caller's `LinkAsset`
/// grants must cover the labels of both ends.
pub fn link_assets(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
    linked_id: i64,
    relation: LinkRelation,
) -> Result<AssetLink> {
    if asset_id == linked_id {
        return Err(Error::validation("cannot link an asset to itself"));
    }
    let asset = fetch_asset(store, asset_id)?;
    let linked = fetch_asset(store, linked_id)?;

    let mut names = asset_label_names(store, asset.id)?;
    names.extend(asset_label_names(store, linked.id)?);
    authz::require_role(principal, RoleName::LinkAsset, &names)?;

    if store.get_link(asset.id, linked.id)?.is_some() {
        return Err(Error::conflict("assets already linked"));
    }
    let link = store.create_link(asset.id, linked.id, relation)?;
    audit.record(
        AuditAction::Insert,
        "asset_links",
        principal.email(),
        &json!({ "asset_id": asset.id, "linked_id": linked.id, "relation": relation.as_str() })
            .to_string(),
    );
    Ok(link)
}

pub fn unlink_assets(
    store: &dyn Store,
    audit: &dyn AuditSink,
    principal: &Principal,
    asset_id: i64,
    linked_id: i64,
) -> Result<()> {
    let asset = fetch_asset(store, asset_id)?;
    let linked = fetch_asset(store, linked_id)?;

    let mut names = asset_label_names(store, asset.id)?;
    names.extend(asset_label_names(store, linked.id)?);
    authz::require_role(principal, RoleName::LinkAsset, &names)?;

    let link = store
        .get_link(asset.id, linked.id)?
        .ok_or(Error::NotFound("asset link"))?;
    store.delete_link(link.id)?;
    audit.record(
        AuditAction::Delete,
        "asset_links",
        principal.email(),
        &json!({ "asset_id": asset.id, "linked_id": linked.id }).to_string(),
    );
    Ok(())
}
