//! The ways a user gets a session, and the account actions that end or
//! upgrade one.
//!
//! Every successful path ends in [`SessionManager::login`]; failures leave the
//! session untouched and come back as a [`FlowError`] carrying the message
//! to show the user.

use crate::router::Route;
use crate::session::{Session, SessionManager};
use crate::{AuthError, AuthResult};
use nutrition_api_client::models::{AuthPayload, ProfileUpdate, RegisterRequest};
use nutrition_api_client::ApiClient;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const GOOGLE_LOGIN_FAILED: &str = "Google login failed";
pub const PROFILE_UPDATE_FAILED: &str = "Failed to update profile";
pub const ACCOUNT_DELETE_FAILED: &str = "Failed to delete account";
pub const NO_TOKEN_PROVIDED: &str = "No token provided";
pub const AUTHENTICATION_FAILED: &str = "Authentication failed";
pub const ACCOUNT_DELETED: &str = "Account deleted successfully";

/// A failed flow: what to show the user, and why it failed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FlowError {
    pub message: String,
    #[source]
    pub source: AuthError,
}

impl FlowError {
    fn new(source: impl Into<AuthError>, fallback: &str) -> Self {
        let source = source.into();
        let message = match &source {
            AuthError::Api(api) => api.user_message(fallback),
            _ => fallback.to_string(),
        };
        Self { message, source }
    }

    /// Same as `new` but ignores any server-provided message.
    fn generic(source: impl Into<AuthError>, message: &str) -> Self {
        Self {
            message: message.to_string(),
            source: source.into(),
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Clone)]
pub struct AuthFlowController {
    api: ApiClient,
    sessions: Arc<SessionManager>,
}

impl AuthFlowController {
    pub fn new(api: ApiClient, sessions: Arc<SessionManager>) -> Self {
        Self { api, sessions }
    }

    /// Email and password login.
    pub async fn credential_login(&self, email: &str, password: &str) -> FlowResult<Session> {
        let payload = self
            .api
            .login(email, password)
            .await
            .map_err(|e| FlowError::new(e, LOGIN_FAILED))?;

        self.sessions
            .login(payload)
            .map_err(|e| FlowError::new(e, LOGIN_FAILED))
    }

    /// Create a credential account, then log in with the returned payload.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> FlowResult<Session> {
        let request = RegisterRequest::credential(name, email, password);
        let payload = self
            .api
            .register(&request)
            .await
            .map_err(|e| FlowError::new(e, REGISTRATION_FAILED))?;

        self.sessions
            .login(payload)
            .map_err(|e| FlowError::new(e, REGISTRATION_FAILED))
    }

    /// Finish the OAuth redirect: the query token is a bootstrap credential
    /// used to fetch the identity, and the two are logged in together.
    ///
    /// A missing token or a failed identity fetch sends the user to
    /// `/login?error=...` without touching the session.
    pub async fn complete_oauth_redirect(&self, token: Option<&str>) -> FlowResult<Session> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            warn!("OAuth callback without token");
            self.sessions
                .router()
                .navigate(Route::login_with_error(NO_TOKEN_PROVIDED));
            return Err(FlowError::generic(AuthError::MissingToken, NO_TOKEN_PROVIDED));
        };

        let identity = match self.api.me(token).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Identity fetch failed during OAuth callback");
                self.sessions
                    .router()
                    .navigate(Route::login_with_error(AUTHENTICATION_FAILED));
                return Err(FlowError::generic(e, AUTHENTICATION_FAILED));
            }
        };

        info!(user_id = ?identity.id, "OAuth identity fetched");
        self.sessions
            .login(AuthPayload {
                token: Some(token.to_string()),
                ..identity
            })
            .map_err(|e| FlowError::generic(e, AUTHENTICATION_FAILED))
    }

    /// Exchange an identity-provider credential for a session.
    pub async fn exchange_oauth_credential(&self, credential: &str) -> FlowResult<Session> {
        let payload = self
            .api
            .oauth_success(credential)
            .await
            .map_err(|e| FlowError::generic(e, GOOGLE_LOGIN_FAILED))?;

        self.sessions
            .login(payload)
            .map_err(|e| FlowError::generic(e, GOOGLE_LOGIN_FAILED))
    }

    /// Save the health profile and move on to the dashboard.
    pub async fn complete_profile(&self, profile: &ProfileUpdate) -> FlowResult<Session> {
        let user_id = self
            .current_user_id()
            .map_err(|e| FlowError::new(e, PROFILE_UPDATE_FAILED))?;

        self.api
            .update_profile(&user_id, profile)
            .await
            .map_err(|e| FlowError::new(e, PROFILE_UPDATE_FAILED))?;

        self.sessions
            .mark_profile_completed()
            .map_err(|e| FlowError::new(e, PROFILE_UPDATE_FAILED))
    }

    /// Delete the account, end the session and land on `/login` with a
    /// confirmation message.
    pub async fn delete_account(&self) -> FlowResult<()> {
        let user_id = self
            .current_user_id()
            .map_err(|e| FlowError::new(e, ACCOUNT_DELETE_FAILED))?;

        self.api
            .delete_account(&user_id)
            .await
            .map_err(|e| FlowError::new(e, ACCOUNT_DELETE_FAILED))?;

        info!(user_id = %user_id, "Account deleted");
        let logged_out = self.sessions.logout();
        self.sessions
            .router()
            .navigate(Route::login_with_message(ACCOUNT_DELETED));
        logged_out.map_err(|e| FlowError::new(e, ACCOUNT_DELETE_FAILED))
    }

    fn current_user_id(&self) -> AuthResult<String> {
        self.sessions
            .current()
            .filter(Session::has_identity)
            .map(|s| s.id)
            .ok_or(AuthError::NotLoggedIn)
    }
}
