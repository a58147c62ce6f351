//! The session and permission authority.
//!
//! One [`Authority`] is built at startup and handed to every consumer. It
//! owns the signed-in user and moves through a small state machine:
//!
//! ```text
//! Uninitialized -> Hydrating -> Authenticated | Unauthenticated
//! Authenticated -> Unauthenticated   (logout, corrupt snapshot)
//! ```
//!
//! Permission and avatar data are enriched by background fetches after login
//! or hydration. Those fetches never fail the session: a failed permission
//! fetch leaves the user with an empty (deny-all) set, a failed avatar fetch
//! leaves the previous avatar. Results are tagged with the session
//! generation they were started for and dropped if the session changed
//! while they were in flight.

use frontdesk_core::{RoleId, UserId};
use frontdesk_remote::{
    DirectoryService, PermissionService, RemoteClient, RemoteError, SignInService,
};
use rootcause::prelude::Report;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::avatar::AvatarResolver;
use crate::config::{AccessConfig, RouteConfig};
use crate::error::{AccessError, GENERIC_LOGIN_FAILURE, SessionError};
use crate::guard::AccessCheck;
use crate::navigation::Navigator;
use crate::notice::Notice;
use crate::role::{RolePolicy, RoleTier};
use crate::session::{SessionRecord, SessionStore, SessionToken};
use crate::store::KeyValueStore;
use crate::user::{Avatar, PermissionSet, User, UserProfile};

/// Lifecycle state of the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStatus {
    /// `initialize` has not run yet.
    Uninitialized,
    /// The persisted session is being read.
    Hydrating,
    /// A user is signed in (permissions may still be loading).
    Authenticated,
    /// Nobody is signed in.
    Unauthenticated,
}

impl AuthStatus {
    /// Returns true until hydration has decided the session.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Hydrating)
    }
}

/// Remote services the authority talks to.
#[derive(Clone)]
pub struct Services {
    permissions: Arc<dyn PermissionService>,
    directory: Arc<dyn DirectoryService>,
    sign_in: Option<Arc<dyn SignInService>>,
}

impl Services {
    /// Creates a service set without a sign-in endpoint.
    #[must_use]
    pub fn new(
        permissions: Arc<dyn PermissionService>,
        directory: Arc<dyn DirectoryService>,
    ) -> Self {
        Self {
            permissions,
            directory,
            sign_in: None,
        }
    }

    /// Adds a sign-in endpoint.
    #[must_use]
    pub fn with_sign_in(mut self, sign_in: Arc<dyn SignInService>) -> Self {
        self.sign_in = Some(sign_in);
        self
    }

    /// Uses one HTTP client for every service.
    #[must_use]
    pub fn from_client(client: RemoteClient) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client.clone()).with_sign_in(client)
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("sign_in", &self.sign_in.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle on the background enrichments started by `initialize`.
///
/// Dropping it does not cancel anything.
#[derive(Debug, Default)]
pub struct Hydration {
    tasks: Vec<JoinHandle<()>>,
}

impl Hydration {
    /// Returns the number of enrichments started.
    #[must_use]
    pub fn started(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true once every enrichment has finished.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Waits for every enrichment to finish.
    pub async fn settled(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "session enrichment task did not complete");
            }
        }
    }
}

/// The signed-in user plus the values derived once at sign-in.
#[derive(Debug, Clone)]
struct Principal {
    token: SessionToken,
    user: User,
    tier: RoleTier,
}

#[derive(Debug)]
struct State {
    status: AuthStatus,
    principal: Option<Principal>,
    /// Bumped on every login and logout.
    generation: u64,
}

/// Identifies the session an enrichment was started for.
#[derive(Debug, Clone)]
struct Ticket {
    generation: u64,
    user_id: UserId,
    role: RoleId,
    tier: RoleTier,
    token: SessionToken,
}

struct Inner {
    sessions: SessionStore,
    services: Services,
    navigator: Arc<dyn Navigator>,
    resolver: AvatarResolver,
    policy: RolePolicy,
    routes: RouteConfig,
    directory_max_pages: u32,
    state: RwLock<State>,
    status_tx: watch::Sender<AuthStatus>,
    initialized: AtomicBool,
    notices: Mutex<Vec<Notice>>,
}

/// Session and permission authority.
///
/// Cloning yields another handle on the same authority.
#[derive(Clone)]
pub struct Authority {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authority")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Authority {
    /// Creates an authority in the `Uninitialized` state.
    #[must_use]
    pub fn new(
        config: &AccessConfig,
        store: Arc<dyn KeyValueStore>,
        services: Services,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (status_tx, _) = watch::channel(AuthStatus::Uninitialized);
        Self {
            inner: Arc::new(Inner {
                sessions: SessionStore::new(store),
                services,
                navigator,
                resolver: config.avatar_resolver(),
                policy: config.role_policy(),
                routes: config.routes.clone(),
                directory_max_pages: config.directory_max_pages.max(1),
                state: RwLock::new(State {
                    status: AuthStatus::Uninitialized,
                    principal: None,
                    generation: 0,
                }),
                status_tx,
                initialized: AtomicBool::new(false),
                notices: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Restores the persisted session.
    ///
    /// Runs at most once per authority; later calls return an empty
    /// [`Hydration`]. Must be called from within a tokio runtime because
    /// enrichments are spawned onto it.
    pub fn initialize(&self) -> Hydration {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("authority already initialized");
            return Hydration::default();
        }

        self.set_status(AuthStatus::Hydrating);

        let record = match self.inner.sessions.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("no persisted session");
                self.reset(AuthStatus::Unauthenticated);
                return Hydration::default();
            }
            Err(report) => {
                self.discard_unreadable_session(&report);
                return Hydration::default();
            }
        };

        let (token, mut user) = record.into_parts();
        let tier = self.inner.policy.tier(user.role());

        let corrected = tier.is_superuser() && !user.permissions().is_wildcard();
        if corrected {
            user.set_permissions(PermissionSet::wildcard());
        }
        let needs_permissions = !tier.is_superuser() && user.permissions().is_empty();
        let needs_avatar = user.avatar().is_none();

        let ticket = {
            let mut state = self.write_state();
            state.generation += 1;
            state.status = AuthStatus::Authenticated;
            let ticket = Ticket {
                generation: state.generation,
                user_id: user.id(),
                role: user.role(),
                tier,
                token: token.clone(),
            };
            if corrected {
                info!(user = %user.id(), "correcting superuser permissions to wildcard");
                self.persist(&token, &user);
            }
            state.principal = Some(Principal { token, user, tier });
            ticket
        };
        self.inner.status_tx.send_replace(AuthStatus::Authenticated);
        info!(user = %ticket.user_id, tier = ?tier, "session restored");

        let mut tasks = Vec::new();
        if needs_permissions {
            let this = self.clone();
            let ticket = ticket.clone();
            tasks.push(tokio::spawn(async move {
                this.resolve_permissions(&ticket).await;
            }));
        }
        if needs_avatar {
            let this = self.clone();
            tasks.push(tokio::spawn(async move {
                this.resolve_avatar(&ticket).await;
            }));
        }

        Hydration { tasks }
    }

    fn discard_unreadable_session(&self, report: &Report<SessionError>) {
        let cause = report.current_context();
        if cause.is_corruption() {
            error!(error = %cause, "persisted session is corrupt; clearing it");
            if let Err(e) = self.inner.sessions.clear() {
                warn!(error = %e, "failed to clear corrupt session");
            }
            let err = AccessError::PersistenceCorruption {
                reason: cause.to_string(),
            };
            self.push_notice(Notice::from(&err));
        } else {
            warn!(error = %cause, "session store unavailable; starting signed out");
        }
        self.reset(AuthStatus::Unauthenticated);
    }

    /// Signs in with a token and user obtained elsewhere.
    ///
    /// Resolves once permissions and avatar have been fetched (or have
    /// failed, which is not an error) and navigation has been requested.
    /// Returns the route navigated to.
    #[instrument(skip(self, token, profile), fields(user = %profile.id, role = %profile.role))]
    pub async fn login(
        &self,
        token: SessionToken,
        profile: UserProfile,
    ) -> Result<String, Report<AccessError>> {
        if token.is_blank() {
            warn!("login attempted without a token");
            return Err(self.fail_login(None));
        }

        let ticket = match self.establish(token, profile) {
            Ok(ticket) => ticket,
            Err(report) => {
                error!(error = %report, "failed to persist session");
                return Err(self.fail_login(None));
            }
        };

        let permissions = async {
            if ticket.tier.is_superuser() {
                debug!("superuser; skipping permission fetch");
            } else {
                self.resolve_permissions(&ticket).await;
            }
        };
        tokio::join!(permissions, self.resolve_avatar(&ticket));

        if !self.is_current(&ticket) {
            debug!("session changed during login; not navigating");
            return Ok(self.inner.routes.login.clone());
        }

        let destination = match self.inner.sessions.take_return_to() {
            Ok(Some(path)) if path != self.inner.routes.login => path,
            Ok(_) => self.inner.routes.landing.clone(),
            Err(e) => {
                warn!(error = %e, "failed to read return path");
                self.inner.routes.landing.clone()
            }
        };

        info!(destination = %destination, "login complete");
        self.inner.navigator.navigate(&destination);
        Ok(destination)
    }

    /// Exchanges credentials at the sign-in endpoint, then logs in.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String, Report<AccessError>> {
        let Some(service) = self.inner.services.sign_in.clone() else {
            warn!("no sign-in service configured");
            return Err(self.fail_login(None));
        };

        match service.sign_in(email, password).await {
            Ok(grant) => {
                self.login(SessionToken::new(grant.token), grant.user.into())
                    .await
            }
            Err(report) => {
                let cause: &RemoteError = report.current_context();
                warn!(error = %cause, "sign-in rejected");
                Err(self.fail_login(cause.server_message()))
            }
        }
    }

    fn establish(
        &self,
        token: SessionToken,
        profile: UserProfile,
    ) -> Result<Ticket, Report<SessionError>> {
        let tier = self.inner.policy.tier(profile.role);
        let mut user = User::new(profile.id, profile.name, profile.email, profile.role);
        if tier.is_superuser() {
            user.set_permissions(PermissionSet::wildcard());
        } else {
            user.set_permissions(profile.permissions.into_iter().collect());
        }
        if let Some(photo) = profile.photo.as_deref().filter(|p| !p.trim().is_empty()) {
            user.set_avatar(Avatar::stamped(self.inner.resolver.resolve(Some(photo)), None));
        }

        self.inner
            .sessions
            .save(&SessionRecord::new(token.clone(), user.clone()))?;

        let ticket = {
            let mut state = self.write_state();
            state.generation += 1;
            state.status = AuthStatus::Authenticated;
            let ticket = Ticket {
                generation: state.generation,
                user_id: user.id(),
                role: user.role(),
                tier,
                token: token.clone(),
            };
            state.principal = Some(Principal { token, user, tier });
            ticket
        };
        self.inner.status_tx.send_replace(AuthStatus::Authenticated);
        Ok(ticket)
    }

    fn fail_login(&self, server_message: Option<&str>) -> Report<AccessError> {
        self.logout();
        let err = AccessError::LoginFailed {
            message: server_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(GENERIC_LOGIN_FAILURE)
                .to_string(),
        };
        self.push_notice(Notice::from(&err));
        err.into()
    }

    /// Ends the session. Safe to call at any time, any number of times.
    pub fn logout(&self) {
        if let Err(e) = self.inner.sessions.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
        self.reset(AuthStatus::Unauthenticated);
        info!("logged out");
        self.inner.navigator.navigate(&self.inner.routes.login);
    }

    /// Fetches the permissions of `role` for the signed-in user.
    ///
    /// Does nothing when nobody is signed in or the user is a superuser.
    pub async fn fetch_permissions(&self, role: RoleId) {
        let Some(mut ticket) = self.ticket() else {
            debug!("not signed in; skipping permission fetch");
            return;
        };
        if ticket.tier.is_superuser() {
            return;
        }
        ticket.role = role;
        self.resolve_permissions(&ticket).await;
    }

    /// Re-fetches the signed-in user's permissions.
    pub async fn refresh_permissions(&self) {
        if let Some(role) = self.ticket().map(|t| t.role) {
            self.fetch_permissions(role).await;
        }
    }

    /// Looks up and stores the avatar of `user_id`, if it is the signed-in user.
    pub async fn fetch_avatar(&self, user_id: UserId) {
        match self.ticket() {
            Some(ticket) if ticket.user_id == user_id => self.resolve_avatar(&ticket).await,
            _ => debug!(user = %user_id, "not the signed-in user; skipping avatar fetch"),
        }
    }

    #[instrument(skip(self, ticket), fields(user = %ticket.user_id, role = %ticket.role))]
    async fn resolve_permissions(&self, ticket: &Ticket) {
        let result = self
            .inner
            .services
            .permissions
            .role_permissions(ticket.token.as_str(), ticket.role)
            .await;

        let (permissions, failure) = match result {
            Ok(names) => (names.into_iter().collect::<PermissionSet>(), None),
            Err(report) => {
                let err = AccessError::RemoteFetchFailure {
                    resource: "permissions".to_string(),
                    reason: report.current_context().to_string(),
                };
                (PermissionSet::empty(), Some(err))
            }
        };

        let count = permissions.len();
        if !self.apply(ticket, |user| user.set_permissions(permissions)) {
            debug!("session changed; discarding permission result");
            return;
        }

        match failure {
            Some(err) => {
                warn!(error = %err, "permission fetch failed; denying by default");
                self.push_notice(Notice::from(&err));
            }
            None => debug!(count, "permissions applied"),
        }
    }

    #[instrument(skip(self, ticket), fields(user = %ticket.user_id))]
    async fn resolve_avatar(&self, ticket: &Ticket) {
        match self.find_photo(ticket).await {
            Ok(Some(photo)) => {
                let url = self.inner.resolver.resolve(Some(&photo));
                let applied = self.apply(ticket, |user| {
                    let avatar = Avatar::stamped(url, user.avatar());
                    user.set_avatar(avatar);
                });
                if applied {
                    debug!("avatar updated");
                } else {
                    debug!("session changed; discarding avatar result");
                }
            }
            Ok(None) => debug!("no directory photo for user"),
            Err(report) => {
                let err = AccessError::RemoteFetchFailure {
                    resource: "profile photo".to_string(),
                    reason: report.current_context().to_string(),
                };
                warn!(error = %err, "avatar fetch failed; keeping previous avatar");
                if self.is_current(ticket) {
                    self.push_notice(Notice::from(&err));
                }
            }
        }
    }

    /// Pages through the directory until the user's row or the last page.
    async fn find_photo(&self, ticket: &Ticket) -> Result<Option<String>, Report<RemoteError>> {
        let directory = &self.inner.services.directory;
        let mut page = 1;
        loop {
            let listing = directory
                .directory_page(ticket.token.as_str(), page)
                .await?;
            if let Some(entry) = listing.find(ticket.user_id) {
                return Ok(entry.photo.clone().filter(|p| !p.trim().is_empty()));
            }
            if !listing.has_more() || page >= self.inner.directory_max_pages {
                debug!(pages = page, "user not found in directory");
                return Ok(None);
            }
            page += 1;
        }
    }

    /// Mutates the user if `ticket` still names the current session, and
    /// persists the result. Returns whether the patch was applied.
    fn apply(&self, ticket: &Ticket, patch: impl FnOnce(&mut User)) -> bool {
        let mut state = self.write_state();
        if state.generation != ticket.generation {
            return false;
        }
        let Some(principal) = state.principal.as_mut() else {
            return false;
        };
        if principal.user.id() != ticket.user_id {
            return false;
        }
        patch(&mut principal.user);
        let (token, user) = (principal.token.clone(), principal.user.clone());
        // Persisting under the lock keeps concurrent enrichments from
        // writing their snapshots out of order.
        self.persist(&token, &user);
        true
    }

    fn persist(&self, token: &SessionToken, user: &User) {
        let record = SessionRecord::new(token.clone(), user.clone());
        if let Err(e) = self.inner.sessions.save(&record) {
            warn!(error = %e, "failed to persist session update");
        }
    }

    fn ticket(&self) -> Option<Ticket> {
        let state = self.read_state();
        state.principal.as_ref().map(|p| Ticket {
            generation: state.generation,
            user_id: p.user.id(),
            role: p.user.role(),
            tier: p.tier,
            token: p.token.clone(),
        })
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        let state = self.read_state();
        state.generation == ticket.generation
            && state
                .principal
                .as_ref()
                .is_some_and(|p| p.user.id() == ticket.user_id)
    }

    fn reset(&self, status: AuthStatus) {
        {
            let mut state = self.write_state();
            state.generation += 1;
            state.principal = None;
            state.status = status;
        }
        self.inner.status_tx.send_replace(status);
    }

    fn set_status(&self, status: AuthStatus) {
        self.write_state().status = status;
        self.inner.status_tx.send_replace(status);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn push_notice(&self, notice: Notice) {
        self.inner
            .notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.read_state().status
    }

    /// Returns true if a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status() == AuthStatus::Authenticated
    }

    /// Returns true until hydration has decided the session.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status().is_loading()
    }

    /// Returns true if the signed-in user holds `permission`.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        let state = self.read_state();
        state.status == AuthStatus::Authenticated
            && state
                .principal
                .as_ref()
                .is_some_and(|p| p.user.permissions().allows(permission))
    }

    /// Returns a copy of the signed-in user.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.read_state().principal.as_ref().map(|p| p.user.clone())
    }

    /// Returns the signed-in user's role tier.
    #[must_use]
    pub fn tier(&self) -> Option<RoleTier> {
        self.read_state().principal.as_ref().map(|p| p.tier)
    }

    /// Returns the session token for authenticated API calls.
    #[must_use]
    pub fn token(&self) -> Option<SessionToken> {
        self.read_state().principal.as_ref().map(|p| p.token.clone())
    }

    /// Returns the avatar URL to display, falling back to the default asset.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        self.read_state()
            .principal
            .as_ref()
            .and_then(|p| p.user.avatar())
            .map(Avatar::cache_busted_url)
            .unwrap_or_else(|| self.inner.resolver.default_avatar().to_string())
    }

    /// Subscribes to lifecycle changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Drains queued notices, oldest first.
    #[must_use]
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(
            &mut *self
                .inner
                .notices
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Returns the session store, used by guards to record return paths.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// Returns the configured navigation targets.
    #[must_use]
    pub fn routes(&self) -> &RouteConfig {
        &self.inner.routes
    }
}

impl AccessCheck for Authority {
    fn is_loading(&self) -> bool {
        Authority::is_loading(self)
    }

    fn is_authenticated(&self) -> bool {
        Authority::is_authenticated(self)
    }

    fn has_permission(&self, permission: &str) -> bool {
        Authority::has_permission(self, permission)
    }
}
