//! Typed navigation targets and the channel the shell follows.

use std::borrow::Cow;
use std::fmt;
use tokio::sync::watch;
use tracing::info;

/// A view the shell can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/login`, optionally carrying an error or an informational message.
    Login {
        error: Option<String>,
        message: Option<String>,
    },
    Register,
    /// `/auth/callback?token=...`, the OAuth return path.
    AuthCallback { token: Option<String> },
    ProfileComplete,
    Dashboard,
}

impl Route {
    pub fn login() -> Self {
        Route::Login {
            error: None,
            message: None,
        }
    }

    pub fn login_with_error(error: impl Into<String>) -> Self {
        Route::Login {
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn login_with_message(message: impl Into<String>) -> Self {
        Route::Login {
            error: None,
            message: Some(message.into()),
        }
    }

    /// Views that require a session.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::ProfileComplete | Route::Dashboard)
    }

    /// Parse a path with optional query. Unknown paths fall back to `/login`.
    pub fn parse(path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };
        let param = |name: &str| query_param(query, name);

        match path.trim_end_matches('/') {
            "/login" => Route::Login {
                error: param("error"),
                message: param("message"),
            },
            "/register" => Route::Register,
            "/auth/callback" => Route::AuthCallback {
                token: param("token"),
            },
            "/profile/complete" => Route::ProfileComplete,
            "/dashboard" => Route::Dashboard,
            _ => Route::login(),
        }
    }

    /// Render as a path, percent-encoding query values.
    pub fn to_path(&self) -> String {
        match self {
            Route::Login { error, message } => {
                let mut params = Vec::new();
                if let Some(error) = error {
                    params.push(format!("error={}", urlencoding::encode(error)));
                }
                if let Some(message) = message {
                    params.push(format!("message={}", urlencoding::encode(message)));
                }
                if params.is_empty() {
                    "/login".to_string()
                } else {
                    format!("/login?{}", params.join("&"))
                }
            }
            Route::Register => "/register".to_string(),
            Route::AuthCallback { token: Some(token) } => {
                format!("/auth/callback?token={}", urlencoding::encode(token))
            }
            Route::AuthCallback { token: None } => "/auth/callback".to_string(),
            Route::ProfileComplete => "/profile/complete".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            let value = value.replace('+', " ");
            urlencoding::decode(&value)
                .map(Cow::into_owned)
                .unwrap_or(value)
        })
        .filter(|value| !value.is_empty())
}

/// Publishes navigation intents to whoever renders the shell.
///
/// Cloning shares the same channel.
#[derive(Clone)]
pub struct Router {
    tx: watch::Sender<Route>,
}

impl Router {
    pub fn new(initial: Route) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn navigate(&self, route: Route) {
        info!(route = %route, "Navigating");
        self.tx.send_replace(route);
    }

    pub fn current(&self) -> Route {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.tx.subscribe()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Route::login())
    }
}
