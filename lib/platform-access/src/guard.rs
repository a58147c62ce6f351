//! Access guards.
//!
//! Every guard reduces to [`decide`], a pure function of the authority's
//! answers to three questions. The variants differ only in what they do with
//! the decision:
//!
//! - [`PageGuard`] renders a placeholder, renders the page, or navigates away
//! - [`RouteGuard`] maps a path to a requirement and leaves navigation to the host
//! - [`FragmentGuard`] shows or hides a piece of UI and never navigates
//!
//! While the authority is loading, all of them answer [`GuardDecision::Pending`].

use std::sync::Arc;
use tracing::{debug, warn};

use crate::authority::Authority;
use crate::config::RouteConfig;
use crate::error::AccessError;
use crate::navigation::Navigator;
use crate::notice::Notice;
use crate::session::SessionStore;

/// The queries guards are allowed to make.
pub trait AccessCheck {
    /// Returns true until the session has been decided.
    fn is_loading(&self) -> bool;

    /// Returns true if a user is signed in.
    fn is_authenticated(&self) -> bool;

    /// Returns true if the signed-in user holds `permission`.
    fn has_permission(&self, permission: &str) -> bool;
}

/// What a guarded page, route or fragment needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Any signed-in user.
    Authenticated,
    /// A signed-in user holding the named permission.
    Permission(String),
}

impl Requirement {
    #[must_use]
    pub fn permission(name: impl Into<String>) -> Self {
        Self::Permission(name.into())
    }
}

/// Where to send the user, and what to tell them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub route: String,
    /// Path to come back to after signing in.
    pub return_to: Option<String>,
    pub notice: Option<Notice>,
}

impl Redirect {
    /// Records the return path and navigates.
    pub fn follow(&self, sessions: &SessionStore, navigator: &dyn Navigator) {
        if let Some(path) = &self.return_to {
            if let Err(e) = sessions.remember_return_to(path) {
                warn!(error = %e, path = %path, "failed to record return path");
            }
        }
        navigator.navigate(&self.route);
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// The session is still loading; check again once it settles.
    Pending,
    RedirectTo(Redirect),
}

impl GuardDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

enum Verdict<'a> {
    Loading,
    SignedOut,
    Denied(&'a str),
    Granted,
}

fn evaluate<'a, A: AccessCheck + ?Sized>(access: &A, requirement: &'a Requirement) -> Verdict<'a> {
    if access.is_loading() {
        return Verdict::Loading;
    }
    if !access.is_authenticated() {
        return Verdict::SignedOut;
    }
    match requirement {
        Requirement::Authenticated => Verdict::Granted,
        Requirement::Permission(name) if access.has_permission(name) => Verdict::Granted,
        Requirement::Permission(name) => Verdict::Denied(name),
    }
}

/// Decides whether `path` may be shown under `requirement`.
#[must_use]
pub fn decide<A: AccessCheck + ?Sized>(
    access: &A,
    requirement: &Requirement,
    routes: &RouteConfig,
    path: &str,
) -> GuardDecision {
    match evaluate(access, requirement) {
        Verdict::Loading => GuardDecision::Pending,
        Verdict::Granted => GuardDecision::Allow,
        Verdict::SignedOut => GuardDecision::RedirectTo(Redirect {
            route: routes.login.clone(),
            return_to: (path != routes.login).then(|| path.to_string()),
            notice: None,
        }),
        Verdict::Denied(permission) => {
            let denied = AccessError::AuthorizationDenied {
                permission: permission.to_string(),
            };
            GuardDecision::RedirectTo(Redirect {
                route: routes.unauthorized.clone(),
                return_to: None,
                notice: Some(Notice::from(&denied)),
            })
        }
    }
}

/// What a page guard produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView<T> {
    /// Loading indicator; nothing was navigated.
    Placeholder,
    Rendered(T),
    /// The guard navigated away.
    Redirected(Redirect),
}

/// Redirect-on-render guard for whole pages.
#[derive(Clone)]
pub struct PageGuard {
    routes: RouteConfig,
    sessions: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl PageGuard {
    #[must_use]
    pub fn new(routes: RouteConfig, sessions: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            routes,
            sessions,
            navigator,
        }
    }

    /// Creates a guard sharing the authority's routes and session store.
    #[must_use]
    pub fn for_authority(authority: &Authority, navigator: Arc<dyn Navigator>) -> Self {
        Self::new(authority.routes().clone(), authority.sessions().clone(), navigator)
    }

    /// Renders `page` if allowed, otherwise shows a placeholder or redirects.
    pub fn render<A, T>(
        &self,
        access: &A,
        path: &str,
        requirement: &Requirement,
        page: impl FnOnce() -> T,
    ) -> PageView<T>
    where
        A: AccessCheck + ?Sized,
    {
        match decide(access, requirement, &self.routes, path) {
            GuardDecision::Allow => PageView::Rendered(page()),
            GuardDecision::Pending => PageView::Placeholder,
            GuardDecision::RedirectTo(redirect) => {
                debug!(path, route = %redirect.route, "page guard redirecting");
                redirect.follow(&self.sessions, self.navigator.as_ref());
                PageView::Redirected(redirect)
            }
        }
    }
}

impl std::fmt::Debug for PageGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteRule {
    prefix: String,
    requirement: Requirement,
}

impl RouteRule {
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/'),
            None => false,
        }
    }
}

/// Route-level guard over a table of path prefixes.
///
/// Paths matching no rule are public.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    routes: RouteConfig,
    rules: Vec<RouteRule>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(routes: RouteConfig) -> Self {
        Self {
            routes,
            rules: Vec::new(),
        }
    }

    /// The hotel back-office route table.
    #[must_use]
    pub fn back_office(routes: RouteConfig) -> Self {
        let landing = routes.landing.clone();
        Self::new(routes)
            .protect(landing, Requirement::Authenticated)
            .protect("/profile", Requirement::Authenticated)
            .protect("/rooms", Requirement::permission("view_rooms"))
            .protect("/bookings", Requirement::permission("view_bookings"))
            .protect("/clients", Requirement::permission("view_clients"))
            .protect("/employees", Requirement::permission("view_employees"))
            .protect("/users", Requirement::permission("view_users"))
            .protect("/roles", Requirement::permission("view_roles"))
    }

    /// Requires `requirement` for `prefix` and everything below it.
    #[must_use]
    pub fn protect(mut self, prefix: impl Into<String>, requirement: Requirement) -> Self {
        self.rules.push(RouteRule {
            prefix: prefix.into(),
            requirement,
        });
        self
    }

    /// Returns the requirement of the most specific matching rule.
    #[must_use]
    pub fn requirement_for(&self, path: &str) -> Option<&Requirement> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        self.rules
            .iter()
            .filter(|rule| rule.matches(path))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| &rule.requirement)
    }

    /// Decides navigation to `path`.
    #[must_use]
    pub fn resolve<A: AccessCheck + ?Sized>(&self, access: &A, path: &str) -> GuardDecision {
        match self.requirement_for(path) {
            Some(requirement) => decide(access, requirement, &self.routes, path),
            None => GuardDecision::Allow,
        }
    }

    /// Waits for the authority to finish loading, then decides.
    pub async fn resolve_settled(&self, authority: &Authority, path: &str) -> GuardDecision {
        let mut status = authority.subscribe();
        if status.wait_for(|s| !s.is_loading()).await.is_err() {
            return GuardDecision::Pending;
        }
        self.resolve(authority, path)
    }
}

/// Shows or hides a fragment of UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentGuard {
    requirement: Requirement,
}

impl FragmentGuard {
    #[must_use]
    pub fn new(requirement: Requirement) -> Self {
        Self { requirement }
    }

    #[must_use]
    pub fn permission(name: impl Into<String>) -> Self {
        Self::new(Requirement::permission(name))
    }

    /// Returns true if the fragment should be shown.
    #[must_use]
    pub fn show<A: AccessCheck + ?Sized>(&self, access: &A) -> bool {
        matches!(evaluate(access, &self.requirement), Verdict::Granted)
    }

    /// Renders `fragment` if allowed.
    pub fn render<A, T>(&self, access: &A, fragment: impl FnOnce() -> T) -> Option<T>
    where
        A: AccessCheck + ?Sized,
    {
        self.show(access).then(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::notice::Severity;
    use crate::store::MemoryStore;
    use std::collections::HashSet;

    #[derive(Default)]
    struct StaticAccess {
        loading: bool,
        authenticated: bool,
        permissions: HashSet<&'static str>,
    }

    impl StaticAccess {
        fn loading() -> Self {
            Self {
                loading: true,
                ..Self::default()
            }
        }

        fn signed_out() -> Self {
            Self::default()
        }

        fn signed_in(permissions: &[&'static str]) -> Self {
            Self {
                authenticated: true,
                permissions: permissions.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl AccessCheck for StaticAccess {
        fn is_loading(&self) -> bool {
            self.loading
        }

        fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        fn has_permission(&self, permission: &str) -> bool {
            self.authenticated
                && (self.permissions.contains("*") || self.permissions.contains(permission))
        }
    }

    fn page_guard() -> (PageGuard, SessionStore, Arc<RecordingNavigator>) {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        let navigator = Arc::new(RecordingNavigator::new());
        let guard = PageGuard::new(RouteConfig::default(), sessions.clone(), navigator.clone());
        (guard, sessions, navigator)
    }

    #[test]
    fn decide_loading_is_pending() {
        let decision = decide(
            &StaticAccess::loading(),
            &Requirement::permission("view_users"),
            &RouteConfig::default(),
            "/users",
        );
        assert_eq!(decision, GuardDecision::Pending);
    }

    #[test]
    fn decide_signed_out_redirects_to_login_with_return_path() {
        let decision = decide(
            &StaticAccess::signed_out(),
            &Requirement::permission("view_users"),
            &RouteConfig::default(),
            "/users",
        );
        assert_eq!(
            decision,
            GuardDecision::RedirectTo(Redirect {
                route: "/login".to_string(),
                return_to: Some("/users".to_string()),
                notice: None,
            })
        );
    }

    #[test]
    fn decide_denied_redirects_with_notice() {
        let decision = decide(
            &StaticAccess::signed_in(&["view_rooms"]),
            &Requirement::permission("view_users"),
            &RouteConfig::default(),
            "/users",
        );
        let GuardDecision::RedirectTo(redirect) = decision else {
            panic!("expected redirect, got {decision:?}");
        };
        assert_eq!(redirect.route, "/unauthorized");
        assert_eq!(redirect.return_to, None);
        let notice = redirect.notice.expect("notice");
        assert_eq!(notice.severity, Severity::Warning);
        assert_eq!(notice.message, "You do not have permission to access this page.");
    }

    #[test]
    fn decide_allows_wildcard_and_plain_auth() {
        let routes = RouteConfig::default();
        assert!(decide(
            &StaticAccess::signed_in(&["*"]),
            &Requirement::permission("view_users"),
            &routes,
            "/users"
        )
        .is_allowed());
        assert!(decide(
            &StaticAccess::signed_in(&[]),
            &Requirement::Authenticated,
            &routes,
            "/dashboard"
        )
        .is_allowed());
    }

    #[test]
    fn page_guard_redirects_and_records_return_path() {
        let (guard, sessions, navigator) = page_guard();

        let view = guard.render(
            &StaticAccess::signed_out(),
            "/users?page=2",
            &Requirement::permission("view_users"),
            || "users page",
        );

        assert!(matches!(view, PageView::Redirected(_)));
        assert_eq!(navigator.routes(), vec!["/login"]);
        assert_eq!(
            sessions.peek_return_to().unwrap().as_deref(),
            Some("/users?page=2")
        );
    }

    #[test]
    fn page_guard_placeholder_while_loading() {
        let (guard, _, navigator) = page_guard();
        let view = guard.render(&StaticAccess::loading(), "/users", &Requirement::Authenticated, || ());
        assert_eq!(view, PageView::Placeholder);
        assert!(navigator.routes().is_empty());
    }

    #[test]
    fn page_guard_renders_when_allowed() {
        let (guard, sessions, navigator) = page_guard();
        let view = guard.render(
            &StaticAccess::signed_in(&["view_users"]),
            "/users",
            &Requirement::permission("view_users"),
            || "users page",
        );
        assert_eq!(view, PageView::Rendered("users page"));
        assert!(navigator.routes().is_empty());
        assert!(sessions.peek_return_to().unwrap().is_none());
    }

    #[test]
    fn page_guard_denied_does_not_record_return_path() {
        let (guard, sessions, navigator) = page_guard();
        guard.render(
            &StaticAccess::signed_in(&[]),
            "/users",
            &Requirement::permission("view_users"),
            || (),
        );
        assert_eq!(navigator.last().as_deref(), Some("/unauthorized"));
        assert!(sessions.peek_return_to().unwrap().is_none());
    }

    #[test]
    fn route_table_picks_most_specific_rule() {
        let guard = RouteGuard::new(RouteConfig::default())
            .protect("/rooms", Requirement::permission("view_rooms"))
            .protect("/rooms/new", Requirement::permission("create_rooms"));

        assert_eq!(
            guard.requirement_for("/rooms/new"),
            Some(&Requirement::permission("create_rooms"))
        );
        assert_eq!(
            guard.requirement_for("/rooms/12?tab=rates"),
            Some(&Requirement::permission("view_rooms"))
        );
        assert_eq!(guard.requirement_for("/roomservice"), None);
        assert_eq!(guard.requirement_for("/login"), None);
    }

    #[test]
    fn route_guard_resolves_without_navigating() {
        let guard = RouteGuard::back_office(RouteConfig::default());

        assert_eq!(
            guard.resolve(&StaticAccess::signed_out(), "/login"),
            GuardDecision::Allow
        );
        assert_eq!(
            guard.resolve(&StaticAccess::loading(), "/users"),
            GuardDecision::Pending
        );
        assert!(guard
            .resolve(&StaticAccess::signed_in(&["view_rooms"]), "/rooms/3")
            .is_allowed());
        assert!(matches!(
            guard.resolve(&StaticAccess::signed_in(&["view_rooms"]), "/users"),
            GuardDecision::RedirectTo(Redirect { ref route, .. }) if route == "/unauthorized"
        ));
        assert!(guard
            .resolve(&StaticAccess::signed_in(&[]), "/dashboard")
            .is_allowed());
    }

    #[test]
    fn fragment_guard_hides_while_loading_or_denied() {
        let guard = FragmentGuard::permission("edit_rooms");

        assert_eq!(guard.render(&StaticAccess::loading(), || "button"), None);
        assert_eq!(guard.render(&StaticAccess::signed_out(), || "button"), None);
        assert_eq!(guard.render(&StaticAccess::signed_in(&["view_rooms"]), || "button"), None);
        assert_eq!(
            guard.render(&StaticAccess::signed_in(&["edit_rooms"]), || "button"),
            Some("button")
        );
        assert!(guard.show(&StaticAccess::signed_in(&["*"])));
    }

    #[tokio::test]
    async fn route_guard_waits_for_hydration() {
        use crate::authority::{Authority, Services};
        use crate::config::AccessConfig;
        use async_trait::async_trait;
        use frontdesk_core::RoleId;
        use frontdesk_remote::{DirectoryPage, DirectoryService, PermissionService, RemoteError};
        use rootcause::prelude::Report;

        struct Unreachable;

        #[async_trait]
        impl PermissionService for Unreachable {
            async fn role_permissions(
                &self,
                _token: &str,
                _role: RoleId,
            ) -> Result<Vec<String>, Report<RemoteError>> {
                Ok(Vec::new())
            }
        }

        #[async_trait]
        impl DirectoryService for Unreachable {
            async fn directory_page(
                &self,
                _token: &str,
                _page: u32,
            ) -> Result<DirectoryPage, Report<RemoteError>> {
                Ok(DirectoryPage {
                    data: Vec::new(),
                    current_page: 1,
                    last_page: 1,
                })
            }
        }

        let service = Arc::new(Unreachable);
        let authority = Authority::new(
            &AccessConfig::default(),
            Arc::new(MemoryStore::new()),
            Services::new(service.clone(), service),
            Arc::new(RecordingNavigator::new()),
        );
        let guard = RouteGuard::back_office(RouteConfig::default());
        assert_eq!(guard.resolve(&authority, "/users"), GuardDecision::Pending);

        let waiting = {
            let authority = authority.clone();
            let guard = guard.clone();
            tokio::spawn(async move { guard.resolve_settled(&authority, "/users").await })
        };
        authority.initialize();

        let decision = waiting.await.unwrap();
        assert!(matches!(
            decision,
            GuardDecision::RedirectTo(Redirect { ref route, .. }) if route == "/login"
        ));
    }
}
