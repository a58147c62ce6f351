//! Console host for the frontdesk session authority.

pub mod cli;
pub mod config;
pub mod navigator;

pub use cli::{Cli, Command, Output, run};
pub use config::ConsoleConfig;
pub use navigator::ConsoleNavigator;
