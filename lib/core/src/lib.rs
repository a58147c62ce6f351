//! Core types shared by the frontdesk crates.
//!
//! This crate provides the numeric identifiers used by the back-office API.

pub mod id;

pub use id::{ParseIdError, RoleId, UserId};
