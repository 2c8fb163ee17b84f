//! Session management with FSM-based state tracking.
//!
//! [`SessionManager`] owns the single in-memory [`Session`] and keeps it
//! consistent with the persisted token: every session it creates writes the
//! token to storage, every session it destroys removes it, and both happen
//! under the same lock.

use crate::auth_fsm::{AuthMachine, AuthMachineInput, AuthState, AuthStateChangedPayload};
use crate::claims::TokenClaims;
use crate::router::{Route, Router};
use crate::{AuthError, AuthResult};
use chrono::Utc;
use client_storage::{StorageKeys, TokenStorage};
use nutrition_api_client::models::AuthPayload;
use nutrition_api_client::UnauthorizedHandler;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Redirect reason used when any API call comes back unauthorized.
pub const SESSION_EXPIRED: &str = "Session expired";

/// Claim keys that map onto dedicated [`Session`] fields.
const IDENTITY_KEYS: [&str; 4] = ["id", "name", "email", "profileCompleted"];

/// The authenticated user plus their bearer credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_completed: bool,
    /// Remaining token claims and server fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Session {
    /// Merge an explicit login result with the claims decoded from its token.
    ///
    /// Explicit fields win; claims fill the gaps; anything still missing is
    /// empty (`profile_completed` defaults to `false`).
    pub fn normalize(token: String, payload: &AuthPayload, claims: Option<&TokenClaims>) -> Self {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        let claim = |key: &str| claims.and_then(|c| c.string(key));

        let mut extra: BTreeMap<_, _> = claims
            .into_iter()
            .flat_map(|c| c.iter())
            .filter(|(key, _)| !IDENTITY_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        extra.extend(payload.extra.clone());
        extra.remove("token");

        Self {
            id: non_empty(&payload.id)
                .or_else(|| claims.and_then(TokenClaims::subject))
                .unwrap_or_default(),
            name: non_empty(&payload.name)
                .or_else(|| claim("name"))
                .unwrap_or_default(),
            email: non_empty(&payload.email)
                .or_else(|| claim("email"))
                .unwrap_or_default(),
            profile_completed: payload
                .profile_completed
                .or_else(|| claims.and_then(|c| c.bool("profileCompleted")))
                .unwrap_or(false),
            token,
            extra,
        }
    }

    /// True when the session names a user; the route guard admits only these.
    pub fn has_identity(&self) -> bool {
        !self.id.is_empty()
    }

    fn to_payload(&self) -> AuthPayload {
        AuthPayload {
            token: Some(self.token.clone()),
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            profile_completed: Some(self.profile_completed),
            extra: self.extra.clone(),
        }
    }
}

/// Callback type for auth state change notifications.
pub type AuthStateCallback = Box<dyn Fn(AuthStateChangedPayload) + Send + Sync>;

struct SessionInner {
    fsm: AuthMachine,
    session: Option<Session>,
}

/// Outcome of a locked mutation, applied once the lock is released.
struct Transition {
    old: AuthState,
    new: AuthState,
    payload: AuthStateChangedPayload,
}

/// Owner of the in-memory session, the persisted token and the auth state.
///
/// Built once at startup and shared through `Arc`. Registered with the API
/// client as its [`UnauthorizedHandler`].
pub struct SessionManager {
    storage: Arc<dyn TokenStorage>,
    router: Router,
    inner: Mutex<SessionInner>,
    state_callback: Mutex<Option<Arc<dyn Fn(AuthStateChangedPayload) + Send + Sync>>>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn TokenStorage>, router: Router) -> Self {
        Self {
            storage,
            router,
            inner: Mutex::new(SessionInner {
                fsm: AuthMachine::new(),
                session: None,
            }),
            state_callback: Mutex::new(None),
        }
    }

    /// Set a callback to be notified of auth state changes.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        *self.state_callback.lock() = Some(Arc::from(callback));
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn state(&self) -> AuthState {
        AuthState::from(self.inner.lock().fsm.state())
    }

    /// True until [`initialize`](Self::initialize) has finished.
    pub fn loading(&self) -> bool {
        self.state().is_loading()
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.lock().session.clone()
    }

    /// Consume `input` on the locked machine and capture what changed.
    fn consume(inner: &mut SessionInner, input: AuthMachineInput) -> AuthResult<Transition> {
        let old = AuthState::from(inner.fsm.state());
        inner.fsm.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                inner.fsm.state()
            ))
        })?;
        let new = AuthState::from(inner.fsm.state());

        let (user_id, email) = inner
            .session
            .as_ref()
            .map(|s| (Some(s.id.clone()), Some(s.email.clone())))
            .unwrap_or((None, None));

        Ok(Transition {
            old,
            new,
            payload: AuthStateChangedPayload {
                state: new,
                user_id,
                email,
            },
        })
    }

    fn notify(&self, transition: Transition) {
        if transition.old == transition.new {
            return;
        }
        debug!(
            old_state = ?transition.old,
            new_state = ?transition.new,
            "Auth state transition"
        );
        let callback = self.state_callback.lock().clone();
        if let Some(callback) = callback {
            callback(transition.payload);
        }
    }

    /// Restore the session from the persisted token. Runs once; later calls
    /// return the current state unchanged.
    ///
    /// - no token: not logged in, no navigation
    /// - live token: session rebuilt from its claims, no navigation
    /// - expired, claim-less or undecodable token, or an unreadable token
    ///   slot: logout, without an error
    pub fn initialize(&self) -> AuthResult<AuthState> {
        {
            let mut inner = self.inner.lock();
            if !matches!(AuthState::from(inner.fsm.state()), AuthState::Uninitialized) {
                debug!("Session already initialized");
                return Ok(AuthState::from(inner.fsm.state()));
            }
            let transition = Self::consume(&mut inner, AuthMachineInput::InitStarted)?;
            drop(inner);
            self.notify(transition);
        }

        let token = match self.storage.get(StorageKeys::TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Persisted token is unreadable, logging out");
                self.end_session(AuthMachineInput::SessionRejected, Route::login())?;
                return Ok(self.state());
            }
        };

        let Some(token) = token else {
            info!("No persisted session");
            return self.finish_init(AuthMachineInput::NoSession, None);
        };

        match TokenClaims::decode(&token) {
            Ok(claims) if !claims.is_expired_at(Utc::now()) => {
                let session = Session::normalize(token, &AuthPayload::default(), Some(&claims));
                info!(user_id = %session.id, "Restored persisted session");
                self.finish_init(AuthMachineInput::SessionRestored, Some(session))
            }
            Ok(_) => {
                info!("Persisted token expired, logging out");
                self.end_session(AuthMachineInput::SessionRejected, Route::login())?;
                Ok(self.state())
            }
            Err(e) => {
                warn!(error = %e, "Persisted token is unreadable, logging out");
                self.end_session(AuthMachineInput::SessionRejected, Route::login())?;
                Ok(self.state())
            }
        }
    }

    fn finish_init(
        &self,
        input: AuthMachineInput,
        session: Option<Session>,
    ) -> AuthResult<AuthState> {
        let mut inner = self.inner.lock();
        if !matches!(AuthState::from(inner.fsm.state()), AuthState::Initializing) {
            // A login or logout landed while restoring; it wins.
            return Ok(AuthState::from(inner.fsm.state()));
        }
        inner.session = session;
        let transition = Self::consume(&mut inner, input)?;
        drop(inner);

        let state = transition.new;
        self.notify(transition);
        Ok(state)
    }

    /// Replace the session with one built from `payload`, persist its token
    /// and route on profile completion.
    ///
    /// Safe to call repeatedly; each call fully replaces the previous session.
    pub fn login(&self, payload: AuthPayload) -> AuthResult<Session> {
        let token = payload
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = match TokenClaims::decode(&token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(error = %e, "Token has no readable claims, using explicit fields");
                None
            }
        };
        let session = Session::normalize(token, &payload, claims.as_ref());

        let transition = {
            let mut inner = self.inner.lock();
            self.storage.set(StorageKeys::TOKEN, &session.token)?;
            inner.session = Some(session.clone());
            Self::consume(&mut inner, AuthMachineInput::LoginSucceeded)?
        };
        self.notify(transition);

        info!(
            user_id = %session.id,
            profile_completed = session.profile_completed,
            "Logged in"
        );
        self.router.navigate(if session.profile_completed {
            Route::Dashboard
        } else {
            Route::ProfileComplete
        });

        Ok(session)
    }

    /// Clear the persisted token and the session, then go to `/login`.
    /// Idempotent.
    pub fn logout(&self) -> AuthResult<()> {
        info!("Logging out");
        self.end_session(AuthMachineInput::LogoutRequested, Route::login())
    }

    /// Tear the session down after the server rejected our credential and
    /// send the user to `/login?error=<reason>`.
    pub fn force_reauthenticate(&self, reason: &str) {
        warn!(reason, "Forcing re-authentication");
        if let Err(e) =
            self.end_session(AuthMachineInput::Unauthorized, Route::login_with_error(reason))
        {
            warn!(error = %e, "Failed to clear session during re-authentication");
        }
    }

    /// Mark the current user's profile as complete and route to the dashboard.
    pub fn mark_profile_completed(&self) -> AuthResult<Session> {
        let session = self.current().ok_or(AuthError::NotLoggedIn)?;
        let mut payload = session.to_payload();
        payload.profile_completed = Some(true);
        self.login(payload)
    }

    /// Remove the token and the session under one lock, then navigate.
    ///
    /// The in-memory session is always cleared and navigation always happens;
    /// a storage failure is reported afterwards.
    fn end_session(&self, input: AuthMachineInput, route: Route) -> AuthResult<()> {
        let (transition, removed) = {
            let mut inner = self.inner.lock();
            let removed = self.storage.delete(StorageKeys::TOKEN);
            inner.session = None;
            (Self::consume(&mut inner, input)?, removed)
        };
        self.notify(transition);
        self.router.navigate(route);

        match removed {
            Ok(existed) => {
                debug!(existed, "Persisted token removed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl UnauthorizedHandler for SessionManager {
    fn on_unauthorized(&self) {
        self.force_reauthenticate(SESSION_EXPIRED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::unsigned_token;
    use client_storage::{FileStorage, MemoryStorage};
    use serde_json::json;

    fn manager() -> (Arc<MemoryStorage>, SessionManager) {
        let storage = Arc::new(MemoryStorage::new());
        let manager = SessionManager::new(storage.clone(), Router::default());
        (storage, manager)
    }

    fn future_exp() -> i64 {
        Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_explicit_id_wins_over_claims() {
        let (_, manager) = manager();
        let token = unsigned_token(json!({ "id": "99", "exp": future_exp() }));

        let session = manager
            .login(AuthPayload {
                id: Some("42".into()),
                ..AuthPayload::from_token(token)
            })
            .unwrap();

        assert_eq!(session.id, "42");
    }

    #[test]
    fn test_claims_fill_missing_id() {
        let (_, manager) = manager();
        let token = unsigned_token(json!({ "id": "99", "exp": future_exp() }));

        let session = manager.login(AuthPayload::from_token(token)).unwrap();

        assert_eq!(session.id, "99");
    }

    #[test]
    fn test_claims_merge_as_extras_without_overriding() {
        let (_, manager) = manager();
        let token = unsigned_token(json!({
            "sub": "7",
            "name": "Claimed",
            "role": "user",
            "exp": future_exp()
        }));

        let mut payload = AuthPayload::from_token(token);
        payload.name = Some("Server".into());
        payload
            .extra
            .insert("profileImage".into(), json!("img.png"));

        let session = manager.login(payload).unwrap();

        assert_eq!(session.id, "7");
        assert_eq!(session.name, "Server");
        assert_eq!(session.extra.get("role"), Some(&json!("user")));
        assert_eq!(session.extra.get("profileImage"), Some(&json!("img.png")));
        assert!(!session.profile_completed);
    }

    #[test]
    fn test_opaque_token_uses_explicit_fields() {
        let (storage, manager) = manager();

        let session = manager
            .login(AuthPayload {
                id: Some("1".into()),
                email: Some("a@b.com".into()),
                ..AuthPayload::from_token("opaque")
            })
            .unwrap();

        assert_eq!(session.id, "1");
        assert_eq!(session.email, "a@b.com");
        assert!(!session.profile_completed);
        assert_eq!(
            storage.get(StorageKeys::TOKEN).unwrap().as_deref(),
            Some("opaque")
        );
    }

    #[test]
    fn test_login_without_token_changes_nothing() {
        let (storage, manager) = manager();

        let err = manager.login(AuthPayload::default()).unwrap_err();

        assert!(matches!(err, AuthError::MissingToken));
        assert!(manager.current().is_none());
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
    }

    #[test]
    fn test_login_routes_on_profile_completion() {
        let (_, manager) = manager();

        manager
            .login(AuthPayload {
                profile_completed: Some(false),
                ..AuthPayload::from_token("t1")
            })
            .unwrap();
        assert_eq!(manager.router().current(), Route::ProfileComplete);

        manager
            .login(AuthPayload {
                profile_completed: Some(true),
                ..AuthPayload::from_token("t2")
            })
            .unwrap();
        assert_eq!(manager.router().current(), Route::Dashboard);
        assert_eq!(manager.current().unwrap().token, "t2");
    }

    #[test]
    fn test_logout_without_session_is_idempotent() {
        let (storage, manager) = manager();

        manager.logout().unwrap();
        manager.logout().unwrap();

        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
        assert_eq!(manager.state(), AuthState::NotLoggedIn);
        assert_eq!(manager.router().current(), Route::login());
    }

    #[test]
    fn test_initialize_restores_live_token() {
        let (storage, manager) = manager();
        let token = unsigned_token(json!({ "sub": "7", "exp": future_exp() }));
        storage.set(StorageKeys::TOKEN, &token).unwrap();

        assert!(manager.loading());
        let state = manager.initialize().unwrap();

        assert_eq!(state, AuthState::LoggedIn);
        assert!(!manager.loading());
        let session = manager.current().unwrap();
        assert_eq!(session.id, "7");
        assert_eq!(session.token, token);
    }

    #[test]
    fn test_initialize_purges_expired_token() {
        let (storage, manager) = manager();
        let token = unsigned_token(json!({ "sub": "7", "exp": Utc::now().timestamp() - 10 }));
        storage.set(StorageKeys::TOKEN, &token).unwrap();

        let state = manager.initialize().unwrap();

        assert_eq!(state, AuthState::NotLoggedIn);
        assert!(manager.current().is_none());
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
        assert_eq!(manager.router().current(), Route::login());
    }

    #[test]
    fn test_initialize_purges_undecodable_token() {
        let (storage, manager) = manager();
        storage.set(StorageKeys::TOKEN, "garbage").unwrap();

        assert_eq!(manager.initialize().unwrap(), AuthState::NotLoggedIn);
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
    }

    #[test]
    fn test_initialize_recovers_from_corrupt_storage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();
        let storage = Arc::new(FileStorage::new(&path));
        let manager = SessionManager::new(storage.clone(), Router::default());

        assert_eq!(manager.initialize().unwrap(), AuthState::NotLoggedIn);
        assert_eq!(manager.router().current(), Route::login());
        manager.logout().unwrap();

        assert_eq!(storage.get(StorageKeys::TOKEN).unwrap(), None);
    }

    #[test]
    fn test_initialize_without_token_does_not_navigate() {
        let (_, manager) = manager();
        manager.router().navigate(Route::Register);

        assert_eq!(manager.initialize().unwrap(), AuthState::NotLoggedIn);
        assert_eq!(manager.router().current(), Route::Register);
    }

    #[test]
    fn test_initialize_runs_once() {
        let (storage, manager) = manager();
        manager.initialize().unwrap();

        let token = unsigned_token(json!({ "sub": "7", "exp": future_exp() }));
        storage.set(StorageKeys::TOKEN, &token).unwrap();

        assert_eq!(manager.initialize().unwrap(), AuthState::NotLoggedIn);
        assert!(manager.current().is_none());
    }

    #[test]
    fn test_unauthorized_clears_storage_and_session() {
        let (storage, manager) = manager();
        manager.login(AuthPayload::from_token("t1")).unwrap();

        manager.on_unauthorized();

        assert!(manager.current().is_none());
        assert!(!storage.has(StorageKeys::TOKEN).unwrap());
        assert_eq!(
            manager.router().current(),
            Route::login_with_error(SESSION_EXPIRED)
        );
    }

    #[test]
    fn test_mark_profile_completed_routes_to_dashboard() {
        let (_, manager) = manager();
        assert!(matches!(
            manager.mark_profile_completed(),
            Err(AuthError::NotLoggedIn)
        ));

        manager
            .login(AuthPayload {
                id: Some("1".into()),
                ..AuthPayload::from_token("t1")
            })
            .unwrap();
        let session = manager.mark_profile_completed().unwrap();

        assert!(session.profile_completed);
        assert_eq!(session.id, "1");
        assert_eq!(manager.router().current(), Route::Dashboard);
    }

    #[test]
    fn test_state_callback_sees_transitions() {
        let (storage, manager) = manager();
        let token = unsigned_token(json!({ "sub": "7", "email": "a@b.com", "exp": future_exp() }));
        storage.set(StorageKeys::TOKEN, &token).unwrap();

        let seen = Arc::new(Mutex::new(Vec::<AuthStateChangedPayload>::new()));
        let sink = seen.clone();
        manager.set_state_callback(Box::new(move |payload: AuthStateChangedPayload| {
            sink.lock().push(payload)
        }));

        manager.initialize().unwrap();
        manager.logout().unwrap();

        let seen = seen.lock();
        let states: Vec<_> = seen.iter().map(|p| p.state).collect();
        assert_eq!(
            states,
            vec![
                AuthState::Initializing,
                AuthState::LoggedIn,
                AuthState::NotLoggedIn
            ]
        );
        assert_eq!(seen[1].user_id.as_deref(), Some("7"));
        assert_eq!(seen[1].email.as_deref(), Some("a@b.com"));
        assert_eq!(seen[2].user_id, None);
    }

    #[test]
    fn test_state_callback_may_replace_itself() {
        let (_, manager) = manager();
        let manager = Arc::new(manager);
        let calls = Arc::new(Mutex::new(0));

        let weak = Arc::downgrade(&manager);
        let counter = calls.clone();
        manager.set_state_callback(Box::new(move |_: AuthStateChangedPayload| {
            *counter.lock() += 1;
            if let Some(manager) = weak.upgrade() {
                manager.set_state_callback(Box::new(|_: AuthStateChangedPayload| {}));
            }
        }));

        manager.login(AuthPayload::from_token("t1")).unwrap();
        manager.logout().unwrap();

        assert_eq!(*calls.lock(), 1);
    }
}
