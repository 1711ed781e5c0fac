//! # Quartermaster
//!
//! An asset-management core: label-scoped role authorization, an asset
//! checkout lifecycle, and a borrow-request workflow over SQLite.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! quartermaster = "0.1"
//! ```
//!
//! ```rust,ignore
//! use quartermaster::audit::TracingAudit;
//! use quartermaster::authz::Principal;
//! use quartermaster::service::assets;
//! use quartermaster::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/quartermaster.db").unwrap();
//! store.initialize().unwrap();
//!
//! let audit = TracingAudit;
//! let principal = Principal::load(&store, 1).unwrap();
//! let visible = assets::list_assets(&store, &audit, &principal).unwrap();
//! ```
//!
//! Authentication is out of scope: callers resolve a user id however
//! they like and hand the core a loaded [`authz::Principal`].

pub mod audit;
pub mod authz;
pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod types;
