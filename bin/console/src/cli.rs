//! Command-line surface and command execution.
//!
//! One invocation is one "page load": the host hydrates the authority, runs
//! a single command against it, and exits.

use clap::{Parser, Subcommand};
use frontdesk_core::{RoleId, UserId};
use frontdesk_platform_access::{
    AccessError, Authority, FragmentGuard, GuardDecision, Navigator, PageGuard, PageView,
    Requirement, RouteGuard, SessionToken, UserProfile,
};
use rootcause::prelude::Report;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "frontdesk")]
#[command(about = "Frontdesk console - sign in and check back-office access", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    SignIn {
        /// Account email address
        #[arg(short = 'e', long)]
        email: String,

        /// Account password
        #[arg(short = 'p', long)]
        password: String,
    },
    /// Adopt a session token issued elsewhere
    Login {
        /// Bearer token for the API
        #[arg(long)]
        token: String,

        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        role: RoleId,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// Permission already known for the user (repeatable)
        #[arg(long = "permission")]
        permissions: Vec<String>,

        /// Stored profile photo path
        #[arg(long)]
        photo: Option<String>,
    },
    /// End the session
    Logout,
    /// Show the signed-in user
    Status,
    /// Check a permission; exits non-zero if it is not held
    Can {
        permission: String,
    },
    /// Open a page behind the page guard
    Visit {
        path: String,

        /// Permission the page requires (default: any signed-in user)
        #[arg(long)]
        require: Option<String>,
    },
    /// Resolve a path against the back-office route table
    Route {
        path: String,
    },
}

/// What a command printed and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub lines: Vec<String>,
    pub success: bool,
}

impl Output {
    fn ok(lines: Vec<String>) -> Self {
        Self {
            lines,
            success: true,
        }
    }

    fn line(line: impl Into<String>, success: bool) -> Self {
        Self {
            lines: vec![line.into()],
            success,
        }
    }
}

/// Runs one command against a hydrated authority.
///
/// # Errors
///
/// Returns the login failure for `sign-in` and `login`. The authority has
/// already logged out and queued a notice by then.
pub async fn run(
    command: Command,
    authority: &Authority,
    navigator: Arc<dyn Navigator>,
) -> Result<Output, Report<AccessError>> {
    match command {
        Command::SignIn { email, password } => {
            let destination = authority.sign_in(&email, &password).await?;
            Ok(Output::line(format!("signed in; landing on {destination}"), true))
        }
        Command::Login {
            token,
            user_id,
            role,
            name,
            email,
            permissions,
            photo,
        } => {
            let profile = UserProfile::new(user_id, name, email, role)
                .with_permissions(permissions)
                .with_photo(photo);
            let destination = authority.login(SessionToken::new(token), profile).await?;
            Ok(Output::line(format!("signed in; landing on {destination}"), true))
        }
        Command::Logout => {
            authority.logout();
            Ok(Output::line("signed out", true))
        }
        Command::Status => Ok(status(authority)),
        Command::Can { permission } => {
            let allowed = FragmentGuard::permission(permission.as_str()).show(authority);
            Ok(Output::line(if allowed { "yes" } else { "no" }, allowed))
        }
        Command::Visit { path, require } => {
            let requirement = require.map_or(Requirement::Authenticated, Requirement::Permission);
            let guard = PageGuard::for_authority(authority, navigator);
            let view = guard.render(authority, &path, &requirement, || format!("rendered {path}"));
            Ok(match view {
                PageView::Placeholder => Output::line("loading...", false),
                PageView::Rendered(page) => Output::line(page, true),
                PageView::Redirected(redirect) => {
                    let mut lines = vec![format!("redirected to {}", redirect.route)];
                    lines.extend(redirect.notice.map(|n| n.to_string()));
                    Output {
                        lines,
                        success: false,
                    }
                }
            })
        }
        Command::Route { path } => {
            let table = RouteGuard::back_office(authority.routes().clone());
            Ok(match table.resolve(authority, &path) {
                GuardDecision::Allow => Output::line(format!("allow {path}"), true),
                GuardDecision::Pending => Output::line("pending", false),
                GuardDecision::RedirectTo(redirect) => {
                    redirect.follow(authority.sessions(), navigator.as_ref());
                    let mut lines = vec![format!("redirect {path} -> {}", redirect.route)];
                    lines.extend(redirect.notice.map(|n| n.to_string()));
                    Output {
                        lines,
                        success: false,
                    }
                }
            })
        }
    }
}

fn status(authority: &Authority) -> Output {
    let Some(user) = authority.current_user() else {
        return Output::line("signed out", true);
    };
    let tier = authority
        .tier()
        .map_or_else(|| "unknown".to_string(), |t| format!("{t:?}").to_lowercase());
    let permissions = user.permissions().names();
    Output::ok(vec![
        format!("user: {} <{}> (#{})", user.name(), user.email(), user.id()),
        format!("role: {} ({tier})", user.role()),
        format!("avatar: {}", authority.avatar_url()),
        format!(
            "permissions: {}",
            if permissions.is_empty() {
                "(none)".to_string()
            } else {
                permissions.join(", ")
            }
        ),
    ])
}
