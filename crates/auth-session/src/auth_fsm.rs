//! Authentication state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Uninitialized  │ (initial, loading)
//! └────────┬────────┘
//!          │ InitStarted
//!          ▼
//! ┌─────────────────┐  SessionRestored   ┌─────────────────┐
//! │  Initializing   │ ─────────────────► │    LoggedIn     │ ◄─┐
//! │   (loading)     │                    └────────┬────────┘   │ LoginSucceeded
//! └────────┬────────┘                             │            │ (any state)
//!          │ NoSession / SessionRejected          │ LogoutRequested / Unauthorized
//!          ▼                                      ▼
//! ┌─────────────────┐ ◄──────────────────────────┘
//! │   NotLoggedIn   │
//! └─────────────────┘
//! ```
//!
//! `LoginSucceeded`, `LogoutRequested` and `Unauthorized` are accepted in
//! every state; the last one applied wins.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(Uninitialized)

    Uninitialized => {
        InitStarted => Initializing,
        LoginSucceeded => LoggedIn,
        LogoutRequested => NotLoggedIn,
        Unauthorized => NotLoggedIn
    },
    Initializing => {
        SessionRestored => LoggedIn,
        NoSession => NotLoggedIn,
        SessionRejected => NotLoggedIn,
        LoginSucceeded => LoggedIn,
        LogoutRequested => NotLoggedIn,
        Unauthorized => NotLoggedIn
    },
    LoggedIn => {
        LoginSucceeded => LoggedIn,
        LogoutRequested => NotLoggedIn,
        Unauthorized => NotLoggedIn
    },
    NotLoggedIn => {
        LoginSucceeded => LoggedIn,
        LogoutRequested => NotLoggedIn,
        Unauthorized => NotLoggedIn
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Authentication state as seen by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Startup restore has not run yet.
    Uninitialized,
    /// Restoring the persisted token.
    Initializing,
    LoggedIn,
    NotLoggedIn,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::LoggedIn)
    }

    /// True until startup restore has finished.
    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Uninitialized | AuthState::Initializing)
    }
}

impl From<&AuthMachineState> for AuthState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::Uninitialized => AuthState::Uninitialized,
            AuthMachineState::Initializing => AuthState::Initializing,
            AuthMachineState::LoggedIn => AuthState::LoggedIn,
            AuthMachineState::NotLoggedIn => AuthState::NotLoggedIn,
        }
    }
}

/// Payload for auth state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    pub state: AuthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_uninitialized() {
        let machine = AuthMachine::new();
        assert_eq!(*machine.state(), AuthMachineState::Uninitialized);
        assert!(AuthState::from(machine.state()).is_loading());
    }

    #[test]
    fn test_restore_flow() {
        let mut machine = AuthMachine::new();

        machine.consume(&AuthMachineInput::InitStarted).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::Initializing);

        machine.consume(&AuthMachineInput::SessionRestored).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::LoggedIn);
    }

    #[test]
    fn test_restore_without_session() {
        for input in [AuthMachineInput::NoSession, AuthMachineInput::SessionRejected] {
            let mut machine = AuthMachine::new();
            machine.consume(&AuthMachineInput::InitStarted).unwrap();
            machine.consume(&input).unwrap();
            assert_eq!(*machine.state(), AuthMachineState::NotLoggedIn);
        }
    }

    #[test]
    fn test_init_runs_once() {
        let mut machine = AuthMachine::new();
        machine.consume(&AuthMachineInput::InitStarted).unwrap();
        machine.consume(&AuthMachineInput::NoSession).unwrap();

        assert!(machine.consume(&AuthMachineInput::InitStarted).is_err());
        assert!(machine.consume(&AuthMachineInput::SessionRestored).is_err());
    }

    #[test]
    fn test_login_replaces_login() {
        let mut machine = AuthMachine::new();
        machine.consume(&AuthMachineInput::LoginSucceeded).unwrap();
        machine.consume(&AuthMachineInput::LoginSucceeded).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::LoggedIn);
    }

    #[test]
    fn test_logout_is_idempotent() {
        let mut machine = AuthMachine::new();
        machine.consume(&AuthMachineInput::LogoutRequested).unwrap();
        machine.consume(&AuthMachineInput::LogoutRequested).unwrap();
        machine.consume(&AuthMachineInput::Unauthorized).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::NotLoggedIn);
    }

    #[test]
    fn test_unauthorized_ends_session() {
        let mut machine = AuthMachine::new();
        machine.consume(&AuthMachineInput::InitStarted).unwrap();
        machine.consume(&AuthMachineInput::SessionRestored).unwrap();

        machine.consume(&AuthMachineInput::Unauthorized).unwrap();
        assert_eq!(*machine.state(), AuthMachineState::NotLoggedIn);
    }

    #[test]
    fn test_auth_state_flags() {
        assert!(AuthState::Uninitialized.is_loading());
        assert!(AuthState::Initializing.is_loading());
        assert!(!AuthState::LoggedIn.is_loading());
        assert!(!AuthState::NotLoggedIn.is_loading());

        assert!(AuthState::LoggedIn.is_authenticated());
        assert!(!AuthState::Initializing.is_authenticated());
    }
}
