//! Session and permission authority for the frontdesk back office.
//!
//! This crate provides:
//! - A persisted session record (`SessionStore`) over a pluggable key-value store
//! - Profile photo URL normalization (`AvatarResolver`)
//! - The `Authority`, which owns the signed-in user and their permissions
//! - Access guards at page, route and fragment granularity
//!
//! # Access Control Model
//!
//! Every user has one role. The configured superuser role is granted the
//! wildcard permission `*` and passes every check. Any other role's
//! permissions are fetched from the API after sign-in; if that fetch fails
//! the user holds no permissions at all.
//!
//! # Example
//!
//! ```
//! use frontdesk_platform_access::{
//!     FragmentGuard, GuardDecision, Requirement, RouteConfig, RouteGuard, decide,
//! };
//! # use frontdesk_platform_access::AccessCheck;
//! # struct Receptionist;
//! # impl AccessCheck for Receptionist {
//! #     fn is_loading(&self) -> bool { false }
//! #     fn is_authenticated(&self) -> bool { true }
//! #     fn has_permission(&self, p: &str) -> bool { p == "view_rooms" }
//! # }
//! let access = Receptionist;
//! let routes = RouteConfig::default();
//!
//! let decision = decide(&access, &Requirement::permission("view_rooms"), &routes, "/rooms");
//! assert_eq!(decision, GuardDecision::Allow);
//!
//! let table = RouteGuard::back_office(routes);
//! assert!(!table.resolve(&access, "/users").is_allowed());
//!
//! assert!(!FragmentGuard::permission("edit_rooms").show(&access));
//! ```

pub mod authority;
pub mod avatar;
pub mod config;
pub mod error;
pub mod guard;
pub mod navigation;
pub mod notice;
pub mod role;
pub mod session;
pub mod store;
pub mod user;

// Re-export main types at crate root
pub use authority::{AuthStatus, Authority, Hydration, Services};
pub use avatar::AvatarResolver;
pub use config::{AccessConfig, RouteConfig};
pub use error::{AccessError, SessionError, StoreError};
pub use guard::{
    AccessCheck, FragmentGuard, GuardDecision, PageGuard, PageView, Redirect, Requirement,
    RouteGuard, decide,
};
pub use navigation::{Navigator, RecordingNavigator};
pub use notice::{Notice, Severity};
pub use role::{RolePolicy, RoleTier};
pub use session::{SessionRecord, SessionStore, SessionToken};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use user::{Avatar, PermissionSet, User, UserProfile};
