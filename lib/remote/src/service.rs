//! Service traits consumed by the access layer.

use crate::error::RemoteError;
use crate::types::{DirectoryPage, SignInGrant};
use async_trait::async_trait;
use frontdesk_core::RoleId;
use rootcause::prelude::Report;

/// Resolves a role into the permission names it grants.
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Fetches the permission names granted to `role`.
    async fn role_permissions(
        &self,
        token: &str,
        role: RoleId,
    ) -> Result<Vec<String>, Report<RemoteError>>;
}

/// Pages through the staff directory.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Fetches one 1-based page of the directory listing.
    async fn directory_page(
        &self,
        token: &str,
        page: u32,
    ) -> Result<DirectoryPage, Report<RemoteError>>;
}

/// Exchanges credentials for a session token.
#[async_trait]
pub trait SignInService: Send + Sync {
    /// Signs in with email and password.
    async fn sign_in(&self, email: &str, password: &str)
    -> Result<SignInGrant, Report<RemoteError>>;
}
