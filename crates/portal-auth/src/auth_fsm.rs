//! Session lifecycle state machine using rust-fsm.
//!
//! The lifecycle phase is an explicit finite state machine; the session data
//! (identity, tokens, loading flag) is derived by a pure reducer over
//! [`AuthAction`]s. [`AuthStateMachine`] runs both in lockstep so an action
//! that is illegal for the current phase leaves the data untouched.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │     Booting     │ (initial, isLoading = true)
//! └────────┬────────┘
//!          │ LoginSucceeded          BootSettled
//!          ├───────────────────────────────┐
//!          ▼                               ▼
//! ┌─────────────────┐  LoggedOut  ┌─────────────────┐
//! │  Authenticated  │ ──────────► │ Unauthenticated │
//! │                 │ ◄────────── │                 │
//! └─────────────────┘ LoginSucc.  └─────────────────┘
//!   UserUpdated, LoginSucceeded loop on Authenticated
//! ```

use crate::error::{AuthError, AuthResult};
use crate::identity::{Identity, UserPatch};
use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_lifecycle(Booting)

    Booting => {
        LoginSucceeded => Authenticated,
        BootSettled => Unauthenticated,
        LoggedOut => Unauthenticated
    },
    Unauthenticated => {
        LoginSucceeded => Authenticated,
        BootSettled => Unauthenticated,
        LoggedOut => Unauthenticated
    },
    Authenticated => {
        // Re-login replaces the session (last write wins)
        LoginSucceeded => Authenticated,
        UserUpdated => Authenticated,
        BootSettled => Authenticated,
        LoggedOut => Unauthenticated
    }
}

pub use session_lifecycle::Input as LifecycleInput;
pub use session_lifecycle::State as LifecycleState;
pub use session_lifecycle::StateMachine as LifecycleMachine;

/// Lifecycle phase for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// Persisted session not yet inspected.
    Booting,
    Authenticated,
    Unauthenticated,
}

impl AuthPhase {
    pub fn is_settled(&self) -> bool {
        !matches!(self, AuthPhase::Booting)
    }
}

impl From<&LifecycleState> for AuthPhase {
    fn from(state: &LifecycleState) -> Self {
        match state {
            LifecycleState::Booting => AuthPhase::Booting,
            LifecycleState::Authenticated => AuthPhase::Authenticated,
            LifecycleState::Unauthenticated => AuthPhase::Unauthenticated,
        }
    }
}

/// In-memory session data.
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<Identity>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub is_loading: bool,
}

impl SessionState {
    /// State before rehydration has run.
    pub fn booting() -> Self {
        Self {
            user: None,
            access_token: None,
            refresh_token: None,
            is_loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
            && self
                .access_token
                .as_deref()
                .is_some_and(|token| !token.is_empty())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::booting()
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("is_loading", &self.is_loading)
            .finish()
    }
}

/// Actions accepted by the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    LoginSuccess {
        user: Identity,
        access_token: String,
        refresh_token: Option<String>,
    },
    UpdateUser(UserPatch),
    Logout,
    SetLoading(bool),
}

impl AuthAction {
    pub fn name(&self) -> &'static str {
        match self {
            AuthAction::LoginSuccess { .. } => "LOGIN_SUCCESS",
            AuthAction::UpdateUser(_) => "UPDATE_USER",
            AuthAction::Logout => "LOGOUT",
            AuthAction::SetLoading(_) => "SET_LOADING",
        }
    }

    /// Lifecycle input driven by this action, if it moves the phase at all.
    fn lifecycle_input(&self) -> Option<LifecycleInput> {
        match self {
            AuthAction::LoginSuccess { .. } => Some(LifecycleInput::LoginSucceeded),
            AuthAction::UpdateUser(_) => Some(LifecycleInput::UserUpdated),
            AuthAction::Logout => Some(LifecycleInput::LoggedOut),
            AuthAction::SetLoading(false) => Some(LifecycleInput::BootSettled),
            AuthAction::SetLoading(true) => None,
        }
    }
}

/// Pure transition function over session data.
pub fn reduce(state: &SessionState, action: &AuthAction) -> SessionState {
    match action {
        AuthAction::LoginSuccess {
            user,
            access_token,
            refresh_token,
        } => SessionState {
            user: Some(user.clone()),
            access_token: Some(access_token.clone()),
            refresh_token: refresh_token.clone(),
            is_loading: false,
        },
        AuthAction::UpdateUser(patch) => match &state.user {
            Some(user) => SessionState {
                user: Some(user.merged(patch)),
                ..state.clone()
            },
            None => state.clone(),
        },
        AuthAction::Logout => SessionState {
            user: None,
            access_token: None,
            refresh_token: None,
            is_loading: false,
        },
        AuthAction::SetLoading(is_loading) => SessionState {
            is_loading: *is_loading,
            ..state.clone()
        },
    }
}

/// Lifecycle machine and session data, advanced together.
pub struct AuthStateMachine {
    lifecycle: LifecycleMachine,
    state: SessionState,
}

impl AuthStateMachine {
    pub fn new() -> Self {
        Self {
            lifecycle: LifecycleMachine::new(),
            state: SessionState::booting(),
        }
    }

    pub fn phase(&self) -> AuthPhase {
        AuthPhase::from(self.lifecycle.state())
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Apply an action. Illegal lifecycle transitions leave everything unchanged.
    pub fn dispatch(&mut self, action: AuthAction) -> AuthResult<AuthPhase> {
        if matches!(action, AuthAction::UpdateUser(_)) && self.state.user.is_none() {
            return Ok(self.phase());
        }

        if let Some(input) = action.lifecycle_input() {
            let from = self.phase();
            self.lifecycle.consume(&input).map_err(|_| {
                AuthError::InvalidStateTransition(format!(
                    "Cannot apply {} in phase {:?}",
                    action.name(),
                    from
                ))
            })?;
        }

        self.state = reduce(&self.state, &action);
        Ok(self.phase())
    }
}

impl Default for AuthStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
