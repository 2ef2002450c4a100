#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use portal_auth::{
    Credentials, Identity, LoginClient, LoginError, LoginResponse, Navigator, RedirectPolicy,
    Route, SessionManager,
};
use portal_storage::{
    KeyValueStore, MemoryStore, StorageError, StorageKeys, StorageResult, StoreBackends,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Build an identity with the given role and first-login flag.
pub fn identity(id: &str, role: &str, first_login: bool) -> Identity {
    serde_json::from_value(json!({
        "id": id,
        "email": format!("{}@example.com", id),
        "name": format!("User {}", id),
        "firstLogin": first_login,
        "role": { "roleName": role, "permissions": ["profile.read"] },
        "department": "Engineering",
        "manager": { "id": 99, "name": "Boss" }
    }))
    .expect("valid identity")
}

pub fn login_response(user: Identity, access_token: &str) -> LoginResponse {
    LoginResponse {
        user,
        access_token: access_token.to_string(),
        refresh_token: Some(format!("{}-refresh", access_token)),
    }
}

pub fn creds(username: &str) -> Credentials {
    Credentials::new(username, "correct horse")
}

/// Login collaborator answering from a queue, recording each call.
#[derive(Default)]
pub struct ScriptedLoginClient {
    responses: Mutex<VecDeque<Result<LoginResponse, LoginError>>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedLoginClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_ok(&self, response: LoginResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn push_err(&self, error: LoginError) {
        self.responses.lock().push_back(Err(error));
    }

    /// `(username, device_id)` for every login attempt so far.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LoginClient for ScriptedLoginClient {
    async fn login(
        &self,
        credentials: &Credentials,
        device_id: Option<&str>,
    ) -> Result<LoginResponse, LoginError> {
        self.calls.lock().push((
            credentials.username_or_email.clone(),
            device_id.map(str::to_string),
        ));
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(LoginError::Http("no scripted response".into())))
    }
}

/// In-memory store whose operations can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    /// When set, only writes to this key fail.
    fail_write_key: Mutex<Option<String>>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes_to(&self, key: &str) {
        *self.fail_write_key.lock() = Some(key.to_string());
    }

    fn denied(op: &str) -> StorageError {
        StorageError::Platform(format!("{} denied", op))
    }
}

impl KeyValueStore for FlakyStore {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::denied("write"));
        }
        if self.fail_write_key.lock().as_deref() == Some(key) {
            return Err(StorageError::QuotaExceeded(key.to_string()));
        }
        self.inner.set(key, value)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::denied("read"));
        }
        self.inner.get(key)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::denied("delete"));
        }
        self.inner.delete(key)
    }
}

/// A manager plus handles on everything it was built from.
pub struct Harness {
    pub manager: SessionManager,
    pub durable: Arc<dyn KeyValueStore>,
    pub ephemeral: Arc<dyn KeyValueStore>,
    pub client: Arc<ScriptedLoginClient>,
}

impl Harness {
    pub fn new(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self::build(durable, ephemeral, false)
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    pub fn private(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self::build(durable, ephemeral, true)
    }

    fn build(
        durable: Arc<dyn KeyValueStore>,
        ephemeral: Arc<dyn KeyValueStore>,
        private: bool,
    ) -> Self {
        let client = ScriptedLoginClient::new();
        let manager = SessionManager::with_backends(
            StoreBackends::new(durable.clone(), ephemeral.clone()),
            Box::new(move || Ok(private)),
            client.clone(),
            RedirectPolicy::default(),
        );
        Self {
            manager,
            durable,
            ephemeral,
            client,
        }
    }
}

/// True when `store` holds none of the session keys.
pub fn has_no_session(store: &dyn KeyValueStore) -> bool {
    StorageKeys::SESSION_KEYS
        .iter()
        .all(|key| store.get(key).expect("readable store").is_none())
}

pub fn stored_user(store: &dyn KeyValueStore) -> Option<serde_json::Value> {
    store
        .get(StorageKeys::USER)
        .expect("readable store")
        .map(|json| serde_json::from_str(&json).expect("stored user is JSON"))
}

/// Navigator that records every navigation.
pub struct RecordingNavigator {
    current: Mutex<Route>,
    history: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn at(route: &str) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(Route::from(route)),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .iter()
            .map(|r| r.as_str().to_string())
            .collect()
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> Route {
        self.current.lock().clone()
    }

    fn navigate(&self, to: &Route) {
        *self.current.lock() = to.clone();
        self.history.lock().push(to.clone());
    }
}
