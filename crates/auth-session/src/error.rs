//! Authentication error types.

use nutrition_api_client::ApiError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login result carried no bearer token
    #[error("Login response did not include a token")]
    MissingToken,

    /// Token is not a decodable claims-bearing token
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Operation requires a session
    #[error("Not logged in")]
    NotLoggedIn,

    /// Invalid state transition in the auth FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] client_storage::StorageError),

    /// Nutrition service error
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Covers connection failures, timeouts and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Api(ApiError::Http(e)) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().is_some_and(|s| s.is_server_error())
            }
            AuthError::Api(ApiError::Middleware(e)) => e.is_connect() || e.is_timeout(),
            AuthError::Api(ApiError::Rejected { status, .. }) => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_rejection_is_transient() {
        let err = AuthError::Api(ApiError::Rejected {
            status: 503,
            message: String::new(),
        });
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_rejection_is_not_transient() {
        let err = AuthError::Api(ApiError::Rejected {
            status: 400,
            message: "Invalid credentials".into(),
        });
        assert!(!err.is_transient());
    }

    #[test]
    fn test_is_not_transient_session_errors() {
        assert!(!AuthError::NotLoggedIn.is_transient());
        assert!(!AuthError::MissingToken.is_transient());
        assert!(!AuthError::Api(ApiError::Unauthorized {
            message: String::new()
        })
        .is_transient());
    }
}
