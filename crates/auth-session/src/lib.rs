//! Client-side authentication lifecycle for Nutri.
//!
//! - [`SessionManager`]: the in-memory session, the persisted token and the
//!   auth state machine behind them
//! - [`AuthFlowController`]: credential login, OAuth completion and the
//!   account actions, each ending in a session change
//! - [`RouteGuard`]: admits protected views only for an identified session
//! - [`Router`]: typed navigation intents the shell follows

pub mod auth_fsm;
mod claims;
mod error;
pub mod flows;
mod guard;
pub mod router;
mod session;

pub use auth_fsm::{AuthState, AuthStateChangedPayload};
pub use claims::TokenClaims;
pub use error::{AuthError, AuthResult};
pub use flows::{AuthFlowController, FlowError, FlowResult};
pub use guard::{GuardOutcome, RouteGuard};
pub use router::{Route, Router};
pub use session::{AuthStateCallback, Session, SessionManager, SESSION_EXPIRED};
