//! The signed-in user and the values hanging off it.

use chrono::Utc;
use frontdesk_core::{RoleId, UserId};
use frontdesk_remote::Account;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Permission string granting every permission.
pub const WILDCARD: &str = "*";

/// Set of permission strings held by a user.
///
/// Membership checks are hash lookups so UI code can ask freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(HashSet<String>);

impl PermissionSet {
    /// Creates an empty set (denies everything).
    #[must_use]
    pub fn empty() -> Self {
        Self(HashSet::new())
    }

    /// Creates the universal set `{"*"}`.
    #[must_use]
    pub fn wildcard() -> Self {
        Self(HashSet::from([WILDCARD.to_string()]))
    }

    /// Returns true if `permission` is granted.
    #[must_use]
    pub fn allows(&self, permission: &str) -> bool {
        self.0.contains(WILDCARD) || self.0.contains(permission)
    }

    /// Returns true if this is exactly the universal set.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0.len() == 1 && self.0.contains(WILDCARD)
    }

    /// Returns true if nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of permission names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the permission names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A resolved profile image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    /// Canonical absolute URL of the image.
    url: String,
    /// Cache-busting stamp; grows with every refresh.
    version: i64,
}

impl Avatar {
    /// Creates an avatar with a fresh version stamp.
    ///
    /// The stamp is the current time in milliseconds, bumped past
    /// `previous` so it never goes backwards.
    #[must_use]
    pub fn stamped(url: String, previous: Option<&Avatar>) -> Self {
        let now = Utc::now().timestamp_millis();
        let version = match previous {
            Some(prev) if prev.version >= now => prev.version + 1,
            _ => now,
        };
        Self { url, version }
    }

    /// Returns the resolved image URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the cache-bust version.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Returns the URL with the version appended as a query parameter.
    #[must_use]
    pub fn cache_busted_url(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}v={}", self.url, separator, self.version)
    }
}

/// The authenticated back-office user as held in memory and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    role: RoleId,
    #[serde(default)]
    permissions: PermissionSet,
    #[serde(default)]
    avatar: Option<Avatar>,
}

impl User {
    /// Creates a user with no permissions and no avatar.
    #[must_use]
    pub fn new(id: UserId, name: String, email: String, role: RoleId) -> Self {
        Self {
            id,
            name,
            email,
            role,
            permissions: PermissionSet::empty(),
            avatar: None,
        }
    }

    /// Returns the user's identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the user's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the user's email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the user's role.
    #[must_use]
    pub fn role(&self) -> RoleId {
        self.role
    }

    /// Returns the user's permission set.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns the user's avatar, if one is known.
    #[must_use]
    pub fn avatar(&self) -> Option<&Avatar> {
        self.avatar.as_ref()
    }

    /// Replaces the permission set.
    pub fn set_permissions(&mut self, permissions: PermissionSet) {
        self.permissions = permissions;
    }

    /// Replaces the avatar.
    pub fn set_avatar(&mut self, avatar: Avatar) {
        self.avatar = Some(avatar);
    }
}

/// User details supplied to `login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: RoleId,
    /// Permissions already known to the caller, possibly none.
    pub permissions: Vec<String>,
    /// Raw stored photo path, if the caller has one.
    pub photo: Option<String>,
}

impl UserProfile {
    /// Creates a profile with no permissions and no photo.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>, role: RoleId) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            role,
            permissions: Vec::new(),
            photo: None,
        }
    }

    /// Sets the permissions known at login time.
    #[must_use]
    pub fn with_permissions<S: Into<String>>(mut self, permissions: impl IntoIterator<Item = S>) -> Self {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the stored photo path.
    #[must_use]
    pub fn with_photo(mut self, photo: Option<String>) -> Self {
        self.photo = photo;
        self
    }
}

impl From<Account> for UserProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role_id,
            permissions: account.permissions,
            photo: account.photo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receptionist() -> User {
        User::new(
            UserId::new(5),
            "Ada".to_string(),
            "ada@example.com".to_string(),
            RoleId::new(2),
        )
    }

    #[test]
    fn empty_set_denies_everything() {
        let set = PermissionSet::empty();
        assert!(!set.allows("view_rooms"));
        assert!(!set.allows(WILDCARD));
    }

    #[test]
    fn wildcard_allows_everything() {
        let set = PermissionSet::wildcard();
        assert!(set.is_wildcard());
        assert!(set.allows("view_rooms"));
        assert!(set.allows("anything at all"));
    }

    #[test]
    fn exact_membership() {
        let set: PermissionSet = ["view_rooms", "view_bookings"].into_iter().collect();
        assert!(set.allows("view_rooms"));
        assert!(!set.allows("edit_rooms"));
        assert!(!set.allows("view_room"));
        assert_eq!(set.names(), vec!["view_bookings", "view_rooms"]);
    }

    #[test]
    fn wildcard_among_others_is_not_exact_wildcard() {
        let set: PermissionSet = ["*", "view_rooms"].into_iter().collect();
        assert!(set.allows("edit_rooms"));
        assert!(!set.is_wildcard());
    }

    #[test]
    fn avatar_version_never_goes_backwards() {
        let first = Avatar::stamped("https://files/a.jpg".to_string(), None);
        let far_future = Avatar {
            url: first.url().to_string(),
            version: first.version() + 1_000_000,
        };
        let next = Avatar::stamped("https://files/b.jpg".to_string(), Some(&far_future));
        assert_eq!(next.version(), far_future.version() + 1);
    }

    #[test]
    fn cache_busted_url_appends_version() {
        let avatar = Avatar {
            url: "https://files/a.jpg".to_string(),
            version: 7,
        };
        assert_eq!(avatar.cache_busted_url(), "https://files/a.jpg?v=7");

        let with_query = Avatar {
            url: "https://files/a.jpg?size=64".to_string(),
            version: 7,
        };
        assert_eq!(with_query.cache_busted_url(), "https://files/a.jpg?size=64&v=7");
    }

    #[test]
    fn new_user_has_no_permissions_or_avatar() {
        let user = receptionist();
        assert!(user.permissions().is_empty());
        assert!(user.avatar().is_none());
    }

    #[test]
    fn user_snapshot_tolerates_missing_optional_fields() {
        let user: User = serde_json::from_str(
            r#"{"id":"5","name":"Ada","email":"ada@example.com","role":2}"#,
        )
        .expect("parse");
        assert_eq!(user.id(), UserId::new(5));
        assert!(user.permissions().is_empty());
    }

    #[test]
    fn profile_from_account() {
        let account: Account = serde_json::from_str(
            r#"{"id":5,"name":"Ada","email":"ada@example.com","role_id":2,"photo":"x.jpg"}"#,
        )
        .expect("parse");
        let profile = UserProfile::from(account);
        assert_eq!(profile.role, RoleId::new(2));
        assert_eq!(profile.photo.as_deref(), Some("x.jpg"));
    }
}
