//! Configuration for the access layer.
//!
//! Fields with defaults can be omitted when loading from environment
//! variables; hosts embed [`AccessConfig`] in their own configuration.

use frontdesk_core::RoleId;
use serde::{Deserialize, Serialize};

use crate::avatar::AvatarResolver;
use crate::role::RolePolicy;

/// Well-known routes the authority and guards navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Where unauthenticated users are sent.
    #[serde(default = "default_login_route")]
    pub login: String,
    /// Where users lacking a permission are sent.
    #[serde(default = "default_unauthorized_route")]
    pub unauthorized: String,
    /// Where users land after login when no return path was captured.
    #[serde(default = "default_landing_route")]
    pub landing: String,
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_unauthorized_route() -> String {
    "/unauthorized".to_string()
}

fn default_landing_route() -> String {
    "/dashboard".to_string()
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: default_login_route(),
            unauthorized: default_unauthorized_route(),
            landing: default_landing_route(),
        }
    }
}

/// Access layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Role id reserved for the superuser.
    #[serde(default = "default_superuser_role")]
    pub superuser_role: RoleId,

    /// Base URL of the file-serving host for profile photos.
    #[serde(default = "default_file_base_url")]
    pub file_base_url: String,

    /// Asset shown when a user has no photo.
    #[serde(default = "default_avatar")]
    pub default_avatar: String,

    /// Upper bound on directory pages scanned when looking up a photo.
    #[serde(default = "default_directory_max_pages")]
    pub directory_max_pages: u32,

    /// Navigation targets.
    #[serde(default)]
    pub routes: RouteConfig,
}

fn default_superuser_role() -> RoleId {
    RoleId::new(1)
}

fn default_file_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_avatar() -> String {
    "/images/default-avatar.png".to_string()
}

fn default_directory_max_pages() -> u32 {
    20
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            superuser_role: default_superuser_role(),
            file_base_url: default_file_base_url(),
            default_avatar: default_avatar(),
            directory_max_pages: default_directory_max_pages(),
            routes: RouteConfig::default(),
        }
    }
}

impl AccessConfig {
    /// Returns the role policy derived from this configuration.
    #[must_use]
    pub fn role_policy(&self) -> RolePolicy {
        RolePolicy::new(self.superuser_role)
    }

    /// Returns the avatar resolver derived from this configuration.
    #[must_use]
    pub fn avatar_resolver(&self) -> AvatarResolver {
        AvatarResolver::new(self.file_base_url.clone(), self.default_avatar.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_config_has_correct_defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.superuser_role, RoleId::new(1));
        assert_eq!(config.routes.login, "/login");
        assert_eq!(config.routes.unauthorized, "/unauthorized");
        assert_eq!(config.routes.landing, "/dashboard");
        assert_eq!(config.directory_max_pages, 20);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: AccessConfig = serde_json::from_str(
            r#"{"superuser_role":"3","routes":{"landing":"/bookings"}}"#,
        )
        .expect("parse");
        assert_eq!(config.superuser_role, RoleId::new(3));
        assert_eq!(config.routes.landing, "/bookings");
        assert_eq!(config.routes.login, "/login");
        assert_eq!(config.file_base_url, "http://localhost:8000");
    }

    #[test]
    fn derived_resolver_uses_file_base_url() {
        let config = AccessConfig {
            file_base_url: "https://files.example.com".to_string(),
            ..AccessConfig::default()
        };
        assert_eq!(
            config.avatar_resolver().resolve(Some("x.jpg")),
            "https://files.example.com/storage/x.jpg"
        );
        assert!(config.role_policy().tier(RoleId::new(1)).is_superuser());
    }
}
