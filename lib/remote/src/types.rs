//! Wire types for the remote back-office services.

use frontdesk_core::{RoleId, UserId};
use serde::{Deserialize, Serialize};

/// A permission as returned by the role service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Permission name, e.g. `view_rooms`.
    pub name: String,
}

/// A role together with the permissions granted to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Role identifier, when the service echoes it.
    #[serde(default)]
    pub id: Option<RoleId>,
    /// Role display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Permissions granted to the role.
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,
}

impl RoleRecord {
    /// Returns the permission names in the order the service sent them.
    #[must_use]
    pub fn permission_names(&self) -> Vec<String> {
        self.permissions.iter().map(|p| p.name.clone()).collect()
    }
}

/// The role service answers either with the role itself or wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RoleEnvelope {
    Wrapped { data: RoleRecord },
    Bare(RoleRecord),
}

impl RoleEnvelope {
    pub(crate) fn into_role(self) -> RoleRecord {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(role) => role,
        }
    }
}

/// One row of the staff directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// The user account this directory row belongs to.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Stored path of the profile photo, in whatever shape it was saved.
    #[serde(default, alias = "image", alias = "avatar")]
    pub photo: Option<String>,
}

/// One page of the staff directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryPage {
    /// Rows on this page.
    #[serde(default)]
    pub data: Vec<DirectoryEntry>,
    /// 1-based index of this page.
    #[serde(default = "first_page")]
    pub current_page: u32,
    /// Index of the last available page.
    #[serde(default = "first_page")]
    pub last_page: u32,
}

fn first_page() -> u32 {
    1
}

impl DirectoryPage {
    /// Finds the row linked to the given user.
    #[must_use]
    pub fn find(&self, user_id: UserId) -> Option<&DirectoryEntry> {
        self.data.iter().find(|e| e.user_id == Some(user_id))
    }

    /// Returns true if pages remain after this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// A permission in an account payload: either a bare name or a record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum PermissionEntry {
    Name(String),
    Record(PermissionRecord),
}

fn permission_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = Option::<Vec<PermissionEntry>>::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            PermissionEntry::Name(name) => name,
            PermissionEntry::Record(record) => record.name,
        })
        .collect())
}

/// The account returned by the sign-in endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Role identifier.
    #[serde(alias = "role")]
    pub role_id: RoleId,
    /// Permissions known at sign-in time, often empty.
    #[serde(default, deserialize_with = "permission_names")]
    pub permissions: Vec<String>,
    /// Stored profile photo path, if the account carries one.
    #[serde(default, alias = "image", alias = "avatar")]
    pub photo: Option<String>,
}

/// Successful sign-in response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInGrant {
    /// Opaque session token.
    #[serde(alias = "access_token")]
    pub token: String,
    /// The signed-in account.
    pub user: Account,
}

/// Error body shape used by the back-office API.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) message: Option<String>,
}
