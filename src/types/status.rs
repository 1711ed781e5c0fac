use std::fmt;

use serde::{Deserialize, Serialize};

/// Where an asset sits in its checkout lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    Available,
    #[serde(rename = "In Use")]
    InUse,
    Maintenance,
    Reserved,
}

impl AssetStatus {
    /// Converts a status string to its enum value.
    pub fn parse(s: &str) -> Option<AssetStatus> {
        match s {
            "Available" => Some(AssetStatus::Available),
            "In Use" => Some(AssetStatus::InUse),
            "Maintenance" => Some(AssetStatus::Maintenance),
            "Reserved" => Some(AssetStatus::Reserved),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AssetStatus::Available => "Available",
            AssetStatus::InUse => "In Use",
            AssetStatus::Maintenance => "Maintenance",
            AssetStatus::Reserved => "Reserved",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a borrow request. Pending requests take exactly one
/// terminal transition to Approved or Rejected; Approved requests become
/// Fulfilled when the asset is checked out against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

impl RequestStatus {
    pub fn parse(s: &str) -> Option<RequestStatus> {
        match s {
            "Pending" => Some(RequestStatus::Pending),
            "Approved" => Some(RequestStatus::Approved),
            "Rejected" => Some(RequestStatus::Rejected),
            "Fulfilled" => Some(RequestStatus::Fulfilled),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Fulfilled => "Fulfilled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one asset relates to another in a directed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkRelation {
    License,
    Consumable,
    Peripheral,
}

impl LinkRelation {
    pub fn parse(s: &str) -> Option<LinkRelation> {
        match s {
            "License" => Some(LinkRelation::License),
            "Consumable" => Some(LinkRelation::Consumable),
            "Peripheral" => Some(LinkRelation::Peripheral),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LinkRelation::License => "License",
            LinkRelation::Consumable => "Consumable",
            LinkRelation::Peripheral => "Peripheral",
        }
    }
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
