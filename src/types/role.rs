use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed set of grantable role names. A role on its own grants
/// nothing; it is always paired with a [`Scope`] in a grant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleName {
    CreateEditUser,
    ReadUser,
    DeleteUser,
    DisableUser,
    ResetPasswordUser,
    CreateEditAsset,
    CheckInOutAsset,
    ReadAsset,
    RetireAsset,
    LinkAsset,
    RequestAsset,
}

impl RoleName {
    pub const ALL: [RoleName; 11] = [
        RoleName::CreateEditUser,
        RoleName::ReadUser,
        RoleName::DeleteUser,
        RoleName::DisableUser,
        RoleName::ResetPasswordUser,
        RoleName::CreateEditAsset,
        RoleName::CheckInOutAsset,
        RoleName::ReadAsset,
        RoleName::RetireAsset,
        RoleName::LinkAsset,
        RoleName::RequestAsset,
    ];

    /// Converts a role string to its enum value.
    pub fn parse(s: &str) -> Option<RoleName> {
        match s {
            "CreateEditUser" => Some(RoleName::CreateEditUser),
            "ReadUser" => Some(RoleName::ReadUser),
            "DeleteUser" => Some(RoleName::DeleteUser),
            "DisableUser" => Some(RoleName::DisableUser),
            "ResetPasswordUser" => Some(RoleName::ResetPasswordUser),
            "CreateEditAsset" => Some(RoleName::CreateEditAsset),
            "CheckInOutAsset" => Some(RoleName::CheckInOutAsset),
            "ReadAsset" => Some(RoleName::ReadAsset),
            "RetireAsset" => Some(RoleName::RetireAsset),
            "LinkAsset" => Some(RoleName::LinkAsset),
            "RequestAsset" => Some(RoleName::RequestAsset),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RoleName::CreateEditUser => "CreateEditUser",
            RoleName::ReadUser => "ReadUser",
            RoleName::DeleteUser => "DeleteUser",
            RoleName::DisableUser => "DisableUser",
            RoleName::ResetPasswordUser => "ResetPasswordUser",
            RoleName::CreateEditAsset => "CreateEditAsset",
            RoleName::CheckInOutAsset => "CheckInOutAsset",
            RoleName::ReadAsset => "ReadAsset",
            RoleName::RetireAsset => "RetireAsset",
            RoleName::LinkAsset => "LinkAsset",
            RoleName::RequestAsset => "RequestAsset",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grant's reach: one named label, or every label via the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Wildcard,
    Label(String),
}

impl Serialize for Scope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Scope::parse(&s))
    }
}

impl Scope {
    pub const WILDCARD: &'static str = "*";

    /// Parses the stored scope string. Any non-`*` value is treated as a
    /// label name; whether that label exists is the caller's concern.
    pub fn parse(s: &str) -> Scope {
        if s == Self::WILDCARD {
            Scope::Wildcard
        } else {
            Scope::Label(s.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Wildcard => Self::WILDCARD,
            Scope::Label(name) => name,
        }
    }

    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Scope::Wildcard)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
