//! Clients for the remote back-office services consumed by the access layer.
//!
//! Three services are involved:
//! - the role service, which maps a role to its permission names
//! - the staff directory, which links user accounts to profile photos
//! - the sign-in endpoint, which exchanges credentials for an opaque token
//!
//! Each is exposed as a trait so the access layer can be exercised without a
//! live backend. [`RemoteClient`] implements all three over HTTP.

mod client;
mod error;
mod service;
mod types;

pub use client::RemoteClient;
pub use error::RemoteError;
pub use service::{DirectoryService, PermissionService, SignInService};
pub use types::{Account, DirectoryEntry, DirectoryPage, PermissionRecord, RoleRecord, SignInGrant};
