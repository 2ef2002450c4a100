//! Session provider: owns the lifecycle machine and keeps it in step with storage.
//!
//! The manager serializes persistence and dispatch under one lock so any
//! observer (or a fresh process reading the durable store) sees the session
//! that was just committed. Observers are notified after the lock is released.

use crate::auth_fsm::{AuthAction, AuthPhase, AuthStateMachine, SessionState};
use crate::error::{AuthError, AuthResult, RestoreError};
use crate::identity::{Identity, UserPatch};
use crate::login_client::{Credentials, LoginClient};
use crate::redirect::{GuardDecision, Navigator, RedirectPolicy, Route, RouteGuard};
use parking_lot::Mutex;
use portal_config_and_utils::Config;
use portal_storage::{
    PrivacyHeuristic, SessionStore, StorageProbe, StorageSelector, StoreBackends, StoreKind,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Point-in-time view of the session handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    #[serde(flatten)]
    pub state: SessionState,
    pub is_authenticated: bool,
    /// Backend the current session is persisted in.
    pub store: Option<StoreKind>,
}

impl AuthSnapshot {
    pub fn user(&self) -> Option<&Identity> {
        self.state.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.state.access_token.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }
}

/// A persisted session that passed validation.
#[derive(Debug, Clone)]
pub struct RestoredSession {
    pub user: Identity,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub source: StoreKind,
}

/// Callback type for session change notifications.
pub type AuthStateCallback = Box<dyn Fn(&AuthSnapshot) + Send + Sync>;

type SharedCallback = Arc<dyn Fn(&AuthSnapshot) + Send + Sync>;

struct SessionInner {
    machine: AuthStateMachine,
    active_store: Option<StoreKind>,
}

impl SessionInner {
    fn snapshot(&self) -> AuthSnapshot {
        let state = self.machine.state().clone();
        AuthSnapshot {
            phase: self.machine.phase(),
            is_authenticated: state.is_authenticated(),
            store: self.active_store,
            state,
        }
    }

    /// Dispatch and report whether anything observable changed.
    fn apply(&mut self, action: AuthAction) -> AuthResult<bool> {
        let before_phase = self.machine.phase();
        let before = self.machine.state().clone();
        let name = action.name();

        let phase = self.machine.dispatch(action)?;

        let changed = phase != before_phase || *self.machine.state() != before;
        if changed {
            debug!(
                action = name,
                old_phase = ?before_phase,
                new_phase = ?phase,
                "Session transition"
            );
        }
        Ok(changed)
    }
}

/// Provider for the authentication session.
pub struct SessionManager {
    store: SessionStore,
    selector: StorageSelector,
    login_client: Arc<dyn LoginClient>,
    policy: RedirectPolicy,
    inner: Mutex<SessionInner>,
    state_callback: Mutex<Option<SharedCallback>>,
}

impl SessionManager {
    /// Create a session manager from explicit collaborators.
    pub fn new(
        store: SessionStore,
        selector: StorageSelector,
        login_client: Arc<dyn LoginClient>,
        policy: RedirectPolicy,
    ) -> Self {
        Self {
            store,
            selector,
            login_client,
            policy,
            inner: Mutex::new(SessionInner {
                machine: AuthStateMachine::new(),
                active_store: None,
            }),
            state_callback: Mutex::new(None),
        }
    }

    /// Wire a manager over the given backends with a custom privacy heuristic.
    pub fn with_backends(
        backends: StoreBackends,
        privacy: PrivacyHeuristic,
        login_client: Arc<dyn LoginClient>,
        policy: RedirectPolicy,
    ) -> Self {
        let probe = StorageProbe::new(backends.durable(), privacy);
        Self::new(
            SessionStore::new(backends),
            StorageSelector::new(probe),
            login_client,
            policy,
        )
    }

    /// Wire a manager using the configured private-mode flag and routes.
    pub fn from_config(
        config: &Config,
        backends: StoreBackends,
        login_client: Arc<dyn LoginClient>,
    ) -> Self {
        let probe = StorageProbe::with_private_flag(backends.durable(), config.private_mode);
        Self::new(
            SessionStore::new(backends),
            StorageSelector::new(probe),
            login_client,
            RedirectPolicy::from_config(config),
        )
    }

    /// Set a callback to be notified of session changes.
    ///
    /// The callback runs with no manager lock held, so it may call back into
    /// the manager.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        *self.state_callback.lock() = Some(Arc::from(callback));
    }

    /// Drive `navigator` with the redirect policy after every change.
    pub fn attach_navigator(&self, navigator: Arc<dyn Navigator>) {
        let policy = self.policy.clone();
        self.set_state_callback(Box::new(move |snapshot| {
            let current = navigator.current_route();
            if let Some(target) = policy.decide(snapshot.user(), &current) {
                debug!(from = %current, to = %target, "Redirecting");
                navigator.navigate(&target);
            }
        }));
    }

    fn notify_state_change(&self, snapshot: &AuthSnapshot) {
        let callback = self.state_callback.lock().clone();
        if let Some(callback) = callback {
            callback(snapshot);
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn policy(&self) -> &RedirectPolicy {
        &self.policy
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Read and validate the persisted session without touching in-memory state.
    pub fn restore(&self) -> Result<Option<RestoredSession>, RestoreError> {
        let raw = match self.store.load().map_err(RestoreError::Unavailable)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let user_json = match raw.user.as_deref() {
            Some(json) => json,
            None => {
                debug!("Stored tokens without a user, ignoring");
                return Ok(None);
            }
        };

        let user: Identity = serde_json::from_str(user_json)
            .map_err(|e| RestoreError::Corrupt(format!("user is not a valid identity: {}", e)))?;
        user.validate()
            .map_err(|defect| RestoreError::Corrupt(defect.to_string()))?;

        let access_token = match raw.usable_access_token() {
            Some(token) => token.to_string(),
            None => {
                debug!(user_id = %user.id, "Stored user without an access token, ignoring");
                return Ok(None);
            }
        };

        Ok(Some(RestoredSession {
            user,
            access_token,
            refresh_token: raw.refresh_token.clone(),
            source: raw.user_source.unwrap_or(StoreKind::Ephemeral),
        }))
    }

    /// Restore the persisted session on startup.
    ///
    /// Settles `is_loading` exactly once; later calls return the current
    /// snapshot unchanged. Never fails: unusable data is cleared and the
    /// session starts logged out.
    pub fn rehydrate(&self) -> AuthSnapshot {
        let mut inner = self.inner.lock();
        if inner.machine.phase().is_settled() {
            debug!("Session already rehydrated");
            return inner.snapshot();
        }

        let (action, source) = match self.restore() {
            Ok(Some(restored)) => {
                info!(
                    user_id = %restored.user.id,
                    role = %restored.user.role_name(),
                    store = %restored.source,
                    "Restored session"
                );
                let source = restored.source;
                (
                    AuthAction::LoginSuccess {
                        user: restored.user,
                        access_token: restored.access_token,
                        refresh_token: restored.refresh_token,
                    },
                    Some(source),
                )
            }
            Ok(None) => {
                self.clear_store();
                debug!("No stored session");
                (AuthAction::SetLoading(false), None)
            }
            Err(RestoreError::Corrupt(reason)) => {
                warn!(reason = %reason, "Discarding corrupt stored session");
                self.clear_store();
                (AuthAction::SetLoading(false), None)
            }
            Err(RestoreError::Unavailable(e)) => {
                warn!(error = %e, "Session storage unavailable, starting logged out");
                self.clear_store();
                (AuthAction::SetLoading(false), None)
            }
        };

        let changed = match inner.apply(action) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(error = %e, "Rehydration dispatch rejected");
                false
            }
        };
        inner.active_store = source;
        let snapshot = inner.snapshot();
        drop(inner);

        if changed {
            self.notify_state_change(&snapshot);
        }
        snapshot
    }

    /// Authenticate and persist the session.
    ///
    /// Every collaborator failure surfaces as [`AuthError::LoginRejected`];
    /// the detail is only logged.
    pub async fn login(
        &self,
        credentials: &Credentials,
        remember_me: bool,
    ) -> AuthResult<AuthSnapshot> {
        let device_id = self.store.device_id().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read device id");
            None
        });

        let response = match self
            .login_client
            .login(credentials, device_id.as_deref())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    username = %credentials.username_or_email,
                    error = %e,
                    "Login failed"
                );
                return Err(AuthError::LoginRejected);
            }
        };

        if let Err(defect) = response.user.validate() {
            warn!(reason = %defect, "Login response carried an unusable identity");
            return Err(AuthError::LoginRejected);
        }
        if response.access_token.is_empty() {
            warn!(user_id = %response.user.id, "Login response carried an empty access token");
            return Err(AuthError::LoginRejected);
        }

        let chosen = self.selector.select(remember_me);

        let mut inner = self.inner.lock();
        let kind = self.persist(
            &response.user,
            &response.access_token,
            response.refresh_token.as_deref(),
            chosen,
        )?;
        let changed = inner.apply(AuthAction::LoginSuccess {
            user: response.user.clone(),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        })?;
        inner.active_store = Some(kind);
        let snapshot = inner.snapshot();
        drop(inner);

        let remembered = remember_me.then_some(credentials.username_or_email.as_str());
        if let Err(e) = self.store.set_remembered_username(remembered) {
            warn!(error = %e, "Could not update remembered username");
        }

        info!(
            user_id = %response.user.id,
            role = %response.user.role_name(),
            store = %kind,
            first_login = response.user.first_login,
            "Login successful"
        );

        if changed {
            self.notify_state_change(&snapshot);
        }
        Ok(snapshot)
    }

    /// Save to the chosen store, falling back to ephemeral if durable refuses.
    fn persist(
        &self,
        user: &Identity,
        access_token: &str,
        refresh_token: Option<&str>,
        chosen: StoreKind,
    ) -> AuthResult<StoreKind> {
        match self.store.save(user, access_token, refresh_token, chosen) {
            Ok(()) => Ok(chosen),
            Err(e) if chosen == StoreKind::Durable => {
                warn!(error = %e, "Durable save failed, keeping session for this tab only");
                self.store
                    .save(user, access_token, refresh_token, StoreKind::Ephemeral)?;
                Ok(StoreKind::Ephemeral)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// End the session. Always ends logged out, whatever storage does.
    pub fn logout(&self) -> AuthSnapshot {
        let mut inner = self.inner.lock();
        self.clear_store();

        let changed = match inner.apply(AuthAction::Logout) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(error = %e, "Logout dispatch rejected");
                false
            }
        };
        inner.active_store = None;
        let snapshot = inner.snapshot();
        drop(inner);

        info!("Logged out");
        if changed {
            self.notify_state_change(&snapshot);
        }
        snapshot
    }

    /// Merge `patch` into the current identity and persist it where the session lives.
    pub fn update_user(&self, patch: UserPatch) -> AuthResult<AuthSnapshot> {
        let mut inner = self.inner.lock();

        let merged = match inner.machine.state().user.as_ref() {
            Some(user) => user.merged(&patch),
            None => {
                debug!("No current user, ignoring update");
                return Ok(inner.snapshot());
            }
        };

        if let Some(kind) = inner.active_store {
            if let Err(e) = self.store.write_user(&merged, kind) {
                warn!(error = %e, store = %kind, "Could not persist user update");
            }
        }

        let changed = inner.apply(AuthAction::UpdateUser(patch))?;
        let snapshot = inner.snapshot();
        drop(inner);

        if changed {
            self.notify_state_change(&snapshot);
        }
        Ok(snapshot)
    }

    /// Where to navigate from `current`, given the signed-in user.
    pub fn redirect_for(&self, current: &Route) -> Option<Route> {
        let inner = self.inner.lock();
        self.policy.decide(inner.machine.state().user.as_ref(), current)
    }

    /// Check access to a route restricted to `allowed_roles`.
    pub fn guard(&self, allowed_roles: &[&str]) -> GuardDecision {
        let inner = self.inner.lock();
        RouteGuard::new(self.policy.clone()).check(inner.machine.state(), allowed_roles)
    }

    /// Last identifier used with remember-me, for prefilling the login form.
    pub fn remembered_username(&self) -> Option<String> {
        self.store.remembered_username().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read remembered username");
            None
        })
    }

    fn clear_store(&self) {
        let report = self.store.clear();
        for failure in &report.failures {
            warn!(
                store = %failure.store,
                key = failure.key,
                error = %failure.error,
                "Failed to clear session key"
            );
        }
    }
}
