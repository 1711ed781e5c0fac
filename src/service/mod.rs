//! Per-resource operations. Each function takes the store, an audit
//! sink, and the acting [`Principal`], checks authorization, then
//! performs the operation. These functions are the boundary an HTTP
//! layer would call; nothing here assumes a transport.

pub mod assets;
pub mod assignments;
pub mod labels;
pub mod maintenance;
pub mod requests;
pub mod roles;
pub mod users;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Asset, Assignment, Label, Request, User};

fn fetch_asset(store: &dyn Store, id: i64) -> Result<Asset> {
    store.get_asset(id)?.ok_or(Error::NotFound("asset"))
}

fn fetch_user(store: &dyn Store, id: i64) -> Result<User> {
    store.get_user(id)?.ok_or(Error::NotFound("user"))
}

fn fetch_label(store: &dyn Store, id: i64) -> Result<Label> {
    store.get_label(id)?.ok_or(Error::NotFound("label"))
}

fn fetch_request(store: &dyn Store, id: i64) -> Result<Request> {
    store.get_request(id)?.ok_or(Error::NotFound("request"))
}

fn fetch_assignment(store: &dyn Store, id: i64) -> Result<Assignment> {
    store.get_assignment(id)?.ok_or(Error::NotFound("assignment"))
}

fn asset_label_names(store: &dyn Store, asset_id: i64) -> Result<Vec<String>> {
    Ok(store
        .asset_labels(asset_id)?
        .into_iter()
        .map(|l| l.name)
        .collect())
}

fn user_label_names(store: &dyn Store, user_id: i64) -> Result<Vec<String>> {
    Ok(store
        .user_labels(user_id)?
        .into_iter()
        .map(|l| l.name)
        .collect())
}
