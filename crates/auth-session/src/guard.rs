//! Gate in front of protected views.

use crate::router::Route;
use crate::session::SessionManager;
use std::sync::Arc;
use tracing::debug;

/// What the shell should do with a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Startup restore still running; show a neutral waiting state.
    Pending,
    Redirect(Route),
    Admit(Route),
}

#[derive(Clone)]
pub struct RouteGuard {
    sessions: Arc<SessionManager>,
}

impl RouteGuard {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Public routes are always admitted. Protected ones need a session that
    /// names a user, not just a stored token.
    pub fn check(&self, route: Route) -> GuardOutcome {
        if !route.is_protected() {
            return GuardOutcome::Admit(route);
        }
        if self.sessions.loading() {
            return GuardOutcome::Pending;
        }

        match self.sessions.current() {
            Some(session) if session.has_identity() => GuardOutcome::Admit(route),
            _ => {
                debug!(route = %route, "No session identity, redirecting to login");
                GuardOutcome::Redirect(Route::login())
            }
        }
    }

    /// Check `route` and navigate to wherever the guard sends the user.
    /// Pending checks leave the current route alone.
    pub fn open(&self, route: Route) -> GuardOutcome {
        let outcome = self.check(route);
        match &outcome {
            GuardOutcome::Admit(route) | GuardOutcome::Redirect(route) => {
                self.sessions.router().navigate(route.clone())
            }
            GuardOutcome::Pending => {}
        }
        outcome
    }
}
