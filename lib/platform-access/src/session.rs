//! The persisted session.
//!
//! A session is one versioned record holding the opaque token and the user
//! snapshot, so a token without a user (or the reverse) cannot be written.
//! Older clients stored three independent entries (`auth_token`,
//! `auth_user`, `auth_user_id`); those are read once, migrated into the
//! record, and always cleared on logout.

use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{SessionError, StoreError};
use crate::store::KeyValueStore;
use crate::user::User;

/// Key of the versioned session record.
pub const SESSION_KEY: &str = "auth_session";
/// Legacy key of the opaque token.
pub const LEGACY_TOKEN_KEY: &str = "auth_token";
/// Legacy key of the serialized user snapshot.
pub const LEGACY_USER_KEY: &str = "auth_user";
/// Legacy key of the user identifier.
pub const LEGACY_USER_ID_KEY: &str = "auth_user_id";
/// Key of the path captured before a forced login redirect.
pub const RETURN_TO_KEY: &str = "auth_return_to";

/// Current session record schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Opaque bearer token issued by the back-office API.
///
/// The token is never validated here, only stored and replayed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Creates a token from a string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the token carries no characters.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The persisted session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    schema_version: u32,
    token: SessionToken,
    user: User,
    saved_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Creates a record at the current schema version.
    #[must_use]
    pub fn new(token: SessionToken, user: User) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            token,
            user,
            saved_at: Utc::now(),
        }
    }

    /// Returns the schema version the record was written with.
    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Returns the session token.
    #[must_use]
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Returns the user snapshot.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Returns when the record was last written.
    #[must_use]
    pub fn saved_at(&self) -> DateTime<Utc> {
        self.saved_at
    }

    /// Splits the record into token and user.
    #[must_use]
    pub fn into_parts(self) -> (SessionToken, User) {
        (self.token, self.user)
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    schema_version: Option<u32>,
}

/// Typed access to the session entries of a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a session store over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads the persisted session.
    ///
    /// Returns `Ok(None)` when no complete session is stored. A record or
    /// snapshot that does not parse is reported as corruption and left in
    /// place; the caller decides whether to clear it.
    pub fn load(&self) -> Result<Option<SessionRecord>, Report<SessionError>> {
        if let Some(raw) = self.get(SESSION_KEY)? {
            return Self::decode_record(&raw).map(Some);
        }
        self.load_legacy()
    }

    fn decode_record(raw: &str) -> Result<SessionRecord, Report<SessionError>> {
        let header: VersionHeader = serde_json::from_str(raw).map_err(|e| SessionError::Corrupt {
            reason: e.to_string(),
        })?;

        match header.schema_version {
            Some(SCHEMA_VERSION) => {}
            Some(found) => return Err(SessionError::UnsupportedVersion { found }.into()),
            None => {
                return Err(SessionError::Corrupt {
                    reason: "session record has no schema version".to_string(),
                }
                .into());
            }
        }

        serde_json::from_str(raw).map_err(|e| {
            SessionError::Corrupt {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn load_legacy(&self) -> Result<Option<SessionRecord>, Report<SessionError>> {
        let token = self
            .get(LEGACY_TOKEN_KEY)?
            .map(SessionToken::new)
            .filter(|t| !t.is_blank());
        let user = self.get(LEGACY_USER_KEY)?;

        let (Some(token), Some(user)) = (token, user) else {
            return Ok(None);
        };

        let user: User = serde_json::from_str(&user).map_err(|e| SessionError::Corrupt {
            reason: format!("legacy user snapshot: {e}"),
        })?;

        let record = SessionRecord::new(token, user);
        info!(user = %record.user().id(), "migrating legacy session entries");
        self.save(&record)?;
        for key in [LEGACY_TOKEN_KEY, LEGACY_USER_KEY, LEGACY_USER_ID_KEY] {
            self.remove(key)?;
        }
        Ok(Some(record))
    }

    /// Persists `record`, replacing any stored session.
    pub fn save(&self, record: &SessionRecord) -> Result<(), Report<SessionError>> {
        let encoded = serde_json::to_string(record).map_err(|e| SessionError::Corrupt {
            reason: e.to_string(),
        })?;
        self.store
            .set(SESSION_KEY, &encoded)
            .map_err(SessionError::from)?;
        debug!(user = %record.user().id(), "session saved");
        Ok(())
    }

    /// Removes every session entry, legacy ones and the return path included.
    ///
    /// Every key is attempted even if an earlier removal fails; the first
    /// failure is returned.
    pub fn clear(&self) -> Result<(), Report<SessionError>> {
        let mut first_error: Option<StoreError> = None;
        for key in [
            SESSION_KEY,
            LEGACY_TOKEN_KEY,
            LEGACY_USER_KEY,
            LEGACY_USER_ID_KEY,
            RETURN_TO_KEY,
        ] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to remove session entry");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(SessionError::from(e).into()),
            None => Ok(()),
        }
    }

    /// Records the path a user asked for before being sent to log in.
    pub fn remember_return_to(&self, path: &str) -> Result<(), Report<SessionError>> {
        self.store
            .set(RETURN_TO_KEY, path)
            .map_err(SessionError::from)?;
        Ok(())
    }

    /// Returns and forgets the recorded return path.
    pub fn take_return_to(&self) -> Result<Option<String>, Report<SessionError>> {
        let path = self.get(RETURN_TO_KEY)?;
        if path.is_some() {
            self.remove(RETURN_TO_KEY)?;
        }
        Ok(path.filter(|p| !p.is_empty()))
    }

    /// Returns the recorded return path without consuming it.
    pub fn peek_return_to(&self) -> Result<Option<String>, Report<SessionError>> {
        self.get(RETURN_TO_KEY)
    }

    fn get(&self, key: &str) -> Result<Option<String>, Report<SessionError>> {
        Ok(self.store.get(key).map_err(SessionError::from)?)
    }

    fn remove(&self, key: &str) -> Result<(), Report<SessionError>> {
        Ok(self.store.remove(key).map_err(SessionError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::user::PermissionSet;
    use frontdesk_core::{RoleId, UserId};

    fn user() -> User {
        let mut user = User::new(
            UserId::new(5),
            "Ada".to_string(),
            "ada@example.com".to_string(),
            RoleId::new(2),
        );
        user.set_permissions(["view_rooms"].into_iter().collect::<PermissionSet>());
        user
    }

    fn stores() -> (Arc<MemoryStore>, SessionStore) {
        let memory = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(memory.clone());
        (memory, sessions)
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = SessionToken::new("secret-token");
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.as_str(), "secret-token");
    }

    #[test]
    fn empty_store_has_no_session() {
        let (_, sessions) = stores();
        assert!(sessions.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let (_, sessions) = stores();
        let record = SessionRecord::new(SessionToken::new("tok"), user());
        sessions.save(&record).unwrap();

        let loaded = sessions.load().unwrap().expect("session");
        assert_eq!(loaded.token().as_str(), "tok");
        assert_eq!(loaded.user(), record.user());
        assert_eq!(loaded.schema_version(), SCHEMA_VERSION);
    }

    #[test]
    fn garbage_record_is_corruption() {
        let (memory, sessions) = stores();
        memory.set(SESSION_KEY, "{not json").unwrap();
        let err = sessions.load().unwrap_err();
        assert!(err.current_context().is_corruption());
    }

    #[test]
    fn unknown_version_is_unsupported() {
        let (memory, sessions) = stores();
        memory
            .set(SESSION_KEY, r#"{"schema_version":99,"token":"t"}"#)
            .unwrap();
        let err = sessions.load().unwrap_err();
        assert_eq!(
            err.current_context(),
            &SessionError::UnsupportedVersion { found: 99 }
        );
    }

    #[test]
    fn legacy_token_without_user_is_absent() {
        let (memory, sessions) = stores();
        memory.set(LEGACY_TOKEN_KEY, "tok").unwrap();
        assert!(sessions.load().unwrap().is_none());
    }

    #[test]
    fn legacy_user_without_token_is_absent() {
        let (memory, sessions) = stores();
        memory
            .set(LEGACY_USER_KEY, &serde_json::to_string(&user()).unwrap())
            .unwrap();
        assert!(sessions.load().unwrap().is_none());
    }

    #[test]
    fn legacy_entries_are_migrated() {
        let (memory, sessions) = stores();
        memory.set(LEGACY_TOKEN_KEY, "tok").unwrap();
        memory
            .set(LEGACY_USER_KEY, &serde_json::to_string(&user()).unwrap())
            .unwrap();
        memory.set(LEGACY_USER_ID_KEY, "5").unwrap();

        let record = sessions.load().unwrap().expect("migrated session");
        assert_eq!(record.user().id(), UserId::new(5));
        assert_eq!(memory.keys(), vec![SESSION_KEY.to_string()]);
    }

    #[test]
    fn legacy_corrupt_user_is_corruption() {
        let (memory, sessions) = stores();
        memory.set(LEGACY_TOKEN_KEY, "tok").unwrap();
        memory.set(LEGACY_USER_KEY, "{\"id\":").unwrap();
        let err = sessions.load().unwrap_err();
        assert!(err.current_context().is_corruption());
    }

    #[test]
    fn clear_removes_everything() {
        let (memory, sessions) = stores();
        sessions
            .save(&SessionRecord::new(SessionToken::new("tok"), user()))
            .unwrap();
        memory.set(LEGACY_USER_ID_KEY, "5").unwrap();
        sessions.remember_return_to("/rooms").unwrap();

        sessions.clear().unwrap();
        assert!(memory.is_empty());
        sessions.clear().unwrap();
    }

    #[test]
    fn return_to_is_consumed_once() {
        let (_, sessions) = stores();
        sessions.remember_return_to("/users").unwrap();
        assert_eq!(sessions.peek_return_to().unwrap().as_deref(), Some("/users"));
        assert_eq!(sessions.take_return_to().unwrap().as_deref(), Some("/users"));
        assert!(sessions.take_return_to().unwrap().is_none());
    }
}
