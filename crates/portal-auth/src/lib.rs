//! Authentication session lifecycle for the HR portal.
//!
//! This crate provides:
//! - [`Identity`] and [`UserPatch`], the signed-in user record and its partial updates
//! - the session lifecycle machine and pure reducer ([`AuthStateMachine`])
//! - [`RedirectPolicy`] and [`RouteGuard`] for role- and first-login-aware routing
//! - the [`LoginClient`] seam with an HTTP implementation
//! - [`SessionManager`], the provider tying storage, login and state together

mod auth_fsm;
mod error;
mod identity;
mod login_client;
mod redirect;
mod session;

pub use auth_fsm::{
    reduce, AuthAction, AuthPhase, AuthStateMachine, LifecycleInput, LifecycleMachine,
    LifecycleState, SessionState,
};
pub use error::{AuthError, AuthResult, LoginError, RestoreError, LOGIN_REJECTED_MESSAGE};
pub use identity::{Identity, IdentityDefect, Role, UserPatch};
pub use login_client::{Credentials, HttpLoginClient, LoginClient, LoginResponse};
pub use redirect::{GuardDecision, Navigator, RedirectPolicy, Route, RouteGuard};
pub use session::{AuthSnapshot, AuthStateCallback, RestoredSession, SessionManager};
