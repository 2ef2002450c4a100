//! Persistence of the identity + token triple across the two backends.

use crate::{KeyValueStore, StorageError, StorageKeys, StorageResult, StoreKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// The durable and ephemeral backends, addressable by [`StoreKind`].
#[derive(Clone)]
pub struct StoreBackends {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
}

impl StoreBackends {
    pub fn new(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, ephemeral }
    }

    pub fn get(&self, kind: StoreKind) -> &dyn KeyValueStore {
        match kind {
            StoreKind::Durable => self.durable.as_ref(),
            StoreKind::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    pub fn durable(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.durable)
    }

    pub fn ephemeral(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.ephemeral)
    }
}

/// Session entries as found in storage, before any parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSession {
    /// Serialized identity.
    pub user: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Backend that supplied `user`.
    pub user_source: Option<StoreKind>,
}

impl RawSession {
    /// Access token, treating the empty string as absent.
    pub fn usable_access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }
}

/// A failure swallowed while clearing.
#[derive(Debug)]
pub struct ClearFailure {
    pub store: StoreKind,
    pub key: &'static str,
    pub error: StorageError,
}

/// Outcome of a best-effort clear.
#[derive(Debug, Default)]
pub struct ClearReport {
    pub failures: Vec<ClearFailure>,
}

impl ClearReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reads and writes the `user` / `accessToken` / `refreshToken` entries.
///
/// Writes go to exactly one backend. Reads consult the backends in
/// [`StoreKind::READ_ORDER`], key by key, so a session is found wherever it was
/// written.
#[derive(Clone)]
pub struct SessionStore {
    backends: StoreBackends,
}

impl SessionStore {
    pub fn new(backends: StoreBackends) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &StoreBackends {
        &self.backends
    }

    /// Persist a session into `kind`.
    ///
    /// Session keys in the other backend are purged first, otherwise an older
    /// session there could shadow this one on the next read. If a write to
    /// `kind` fails, whatever was already written there is removed again
    /// before the error is returned.
    pub fn save<U: Serialize>(
        &self,
        user: &U,
        access_token: &str,
        refresh_token: Option<&str>,
        kind: StoreKind,
    ) -> StorageResult<()> {
        let user_json =
            serde_json::to_string(user).map_err(|e| StorageError::Encoding(e.to_string()))?;

        for other in StoreKind::READ_ORDER.into_iter().filter(|k| *k != kind) {
            self.purge(other, &mut ClearReport::default());
        }

        let store = self.backends.get(kind);
        let written = store
            .set(StorageKeys::USER, &user_json)
            .and_then(|_| store.set(StorageKeys::ACCESS_TOKEN, access_token))
            .and_then(|_| match refresh_token {
                Some(token) => store.set(StorageKeys::REFRESH_TOKEN, token),
                None => store.delete(StorageKeys::REFRESH_TOKEN).map(|_| ()),
            });

        if let Err(e) = written {
            warn!(store = %kind, error = %e, "Session write failed, rolling back");
            self.purge(kind, &mut ClearReport::default());
            return Err(e);
        }

        debug!(store = %kind, "Session saved");
        Ok(())
    }

    /// Rewrite only the `user` entry in `kind`.
    pub fn write_user<U: Serialize>(&self, user: &U, kind: StoreKind) -> StorageResult<()> {
        let user_json =
            serde_json::to_string(user).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.backends.get(kind).set(StorageKeys::USER, &user_json)?;
        debug!(store = %kind, "Stored user updated");
        Ok(())
    }

    /// Read the session triple, durable backend first.
    ///
    /// Returns `Ok(None)` when no session key is present anywhere. A backend
    /// that fails to read is skipped; only when every backend fails for the
    /// same key is the error returned.
    pub fn load(&self) -> StorageResult<Option<RawSession>> {
        let (user, user_source) = self.read_first(StorageKeys::USER)?;
        let (access_token, _) = self.read_first(StorageKeys::ACCESS_TOKEN)?;
        let (refresh_token, _) = self.read_first(StorageKeys::REFRESH_TOKEN)?;

        if user.is_none() && access_token.is_none() && refresh_token.is_none() {
            return Ok(None);
        }

        Ok(Some(RawSession {
            user,
            access_token,
            refresh_token,
            user_source,
        }))
    }

    fn read_first(&self, key: &'static str) -> StorageResult<(Option<String>, Option<StoreKind>)> {
        let mut last_error = None;
        let mut failed = 0;

        for kind in StoreKind::READ_ORDER {
            match self.backends.get(kind).get(key) {
                Ok(Some(value)) => {
                    if let Some(value) = normalize(key, value) {
                        return Ok((Some(value), Some(kind)));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(store = %kind, key = %key, error = %e, "Session read failed, trying next store");
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if failed == StoreKind::READ_ORDER.len() => Err(e),
            _ => Ok((None, None)),
        }
    }

    /// Remove every session key from every backend.
    ///
    /// Never stops early; failures are collected in the report.
    pub fn clear(&self) -> ClearReport {
        let mut report = ClearReport::default();
        for kind in StoreKind::READ_ORDER {
            self.purge(kind, &mut report);
        }
        if !report.is_clean() {
            warn!(failures = report.failures.len(), "Session clear left entries behind");
        }
        report
    }

    fn purge(&self, kind: StoreKind, report: &mut ClearReport) {
        let store = self.backends.get(kind);
        for key in StorageKeys::SESSION_KEYS {
            if let Err(error) = store.delete(key) {
                report.failures.push(ClearFailure {
                    store: kind,
                    key,
                    error,
                });
            }
        }
    }

    /// Last login identifier saved with "remember me".
    pub fn remembered_username(&self) -> StorageResult<Option<String>> {
        self.backends.durable.get(StorageKeys::REMEMBERED_USERNAME)
    }

    /// Keep (`Some`) or forget (`None`) the last login identifier.
    pub fn set_remembered_username(&self, username: Option<&str>) -> StorageResult<()> {
        let durable = &self.backends.durable;
        match username {
            Some(name) => durable.set(StorageKeys::REMEMBERED_USERNAME, name),
            None => durable.delete(StorageKeys::REMEMBERED_USERNAME).map(|_| ()),
        }
    }

    /// Stable device identifier, if the fingerprint collaborator has set one.
    pub fn device_id(&self) -> StorageResult<Option<String>> {
        self.backends.durable.get(StorageKeys::DEVICE_ID)
    }
}

/// Literal placeholders some writers leave behind instead of deleting.
fn normalize(key: &str, value: String) -> Option<String> {
    match value.trim() {
        "null" | "undefined" => None,
        "" if key == StorageKeys::USER => None,
        _ => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde_json::json;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Platform("broken".into()))
        }

        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Platform("broken".into()))
        }

        fn delete(&self, _key: &str) -> StorageResult<bool> {
            Err(StorageError::Platform("broken".into()))
        }
    }

    fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>, SessionStore) {
        let durable = Arc::new(MemoryStore::new());
        let ephemeral = Arc::new(MemoryStore::new());
        let store = SessionStore::new(StoreBackends::new(durable.clone(), ephemeral.clone()));
        (durable, ephemeral, store)
    }

    fn user() -> serde_json::Value {
        json!({ "id": "7", "role": { "roleName": "HR" }, "firstLogin": false })
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_, _, store) = stores();
        store
            .save(&user(), "access", Some("refresh"), StoreKind::Durable)
            .unwrap();

        let raw = store.load().unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(raw.user.as_ref().unwrap()).unwrap();
        assert_eq!(parsed, user());
        assert_eq!(raw.access_token.as_deref(), Some("access"));
        assert_eq!(raw.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(raw.user_source, Some(StoreKind::Durable));
    }

    #[test]
    fn test_save_writes_only_chosen_store() {
        let (durable, ephemeral, store) = stores();
        store.save(&user(), "a", Some("r"), StoreKind::Ephemeral).unwrap();

        assert!(durable.is_empty());
        assert_eq!(ephemeral.len(), 3);
        assert_eq!(store.load().unwrap().unwrap().user_source, Some(StoreKind::Ephemeral));
    }

    #[test]
    fn test_save_purges_other_store() {
        let (durable, _, store) = stores();
        store.save(&user(), "old", Some("old-r"), StoreKind::Durable).unwrap();
        store.save(&user(), "new", None, StoreKind::Ephemeral).unwrap();

        assert!(durable.is_empty());
        let raw = store.load().unwrap().unwrap();
        assert_eq!(raw.access_token.as_deref(), Some("new"));
        assert_eq!(raw.refresh_token, None);
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let durable = Arc::new(MemoryStore::with_quota(64));
        let ephemeral = Arc::new(MemoryStore::new());
        let store = SessionStore::new(StoreBackends::new(durable.clone(), ephemeral));

        let long_token = "x".repeat(128);
        let result = store.save(&user(), &long_token, None, StoreKind::Durable);

        assert!(matches!(result, Err(StorageError::QuotaExceeded(_))));
        assert!(durable.is_empty());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_dual_read_prefers_durable_per_key() {
        let (durable, ephemeral, store) = stores();
        ephemeral.set(StorageKeys::USER, r#"{"id":"e"}"#).unwrap();
        ephemeral.set(StorageKeys::ACCESS_TOKEN, "eph").unwrap();
        durable.set(StorageKeys::ACCESS_TOKEN, "dur").unwrap();

        let raw = store.load().unwrap().unwrap();
        assert_eq!(raw.user_source, Some(StoreKind::Ephemeral));
        assert_eq!(raw.access_token.as_deref(), Some("dur"));
    }

    #[test]
    fn test_placeholder_values_fall_through() {
        let (durable, ephemeral, store) = stores();
        durable.set(StorageKeys::USER, "undefined").unwrap();
        ephemeral.set(StorageKeys::USER, r#"{"id":"1"}"#).unwrap();
        durable.set(StorageKeys::ACCESS_TOKEN, "null").unwrap();

        let raw = store.load().unwrap().unwrap();
        assert_eq!(raw.user.as_deref(), Some(r#"{"id":"1"}"#));
        assert_eq!(raw.access_token, None);
    }

    #[test]
    fn test_empty_access_token_is_kept_but_unusable() {
        let (durable, _, store) = stores();
        durable.set(StorageKeys::ACCESS_TOKEN, "").unwrap();

        let raw = store.load().unwrap().unwrap();
        assert_eq!(raw.access_token.as_deref(), Some(""));
        assert_eq!(raw.usable_access_token(), None);
    }

    #[test]
    fn test_load_empty_is_none() {
        let (_, _, store) = stores();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_read_failure_in_one_store_falls_back() {
        let ephemeral = Arc::new(MemoryStore::new());
        ephemeral.set(StorageKeys::USER, "{}").unwrap();
        ephemeral.set(StorageKeys::ACCESS_TOKEN, "t").unwrap();
        let store = SessionStore::new(StoreBackends::new(Arc::new(BrokenStore), ephemeral));

        let raw = store.load().unwrap().unwrap();
        assert_eq!(raw.access_token.as_deref(), Some("t"));
    }

    #[test]
    fn test_read_failure_everywhere_is_error() {
        let store = SessionStore::new(StoreBackends::new(Arc::new(BrokenStore), Arc::new(BrokenStore)));
        assert!(store.load().is_err());
    }

    #[test]
    fn test_clear_purges_both_and_is_idempotent() {
        let (durable, ephemeral, store) = stores();
        durable.set(StorageKeys::USER, "{}").unwrap();
        ephemeral.set(StorageKeys::ACCESS_TOKEN, "t").unwrap();
        durable.set(StorageKeys::DEVICE_ID, "dev-1").unwrap();

        assert!(store.clear().is_clean());
        assert!(store.clear().is_clean());
        assert_eq!(store.load().unwrap(), None);
        assert!(ephemeral.is_empty());
        assert_eq!(store.device_id().unwrap(), Some("dev-1".to_string()));
    }

    #[test]
    fn test_clear_continues_past_failures() {
        let ephemeral = Arc::new(MemoryStore::new());
        ephemeral.set(StorageKeys::USER, "{}").unwrap();
        ephemeral.set(StorageKeys::REFRESH_TOKEN, "r").unwrap();
        let store = SessionStore::new(StoreBackends::new(Arc::new(BrokenStore), ephemeral.clone()));

        let report = store.clear();
        assert_eq!(report.failures.len(), StorageKeys::SESSION_KEYS.len());
        assert!(report.failures.iter().all(|f| f.store == StoreKind::Durable));
        assert!(ephemeral.is_empty());
    }

    #[test]
    fn test_remembered_username_lives_in_durable() {
        let (durable, _, store) = stores();
        store.set_remembered_username(Some("jdoe")).unwrap();
        assert_eq!(durable.get(StorageKeys::REMEMBERED_USERNAME).unwrap(), Some("jdoe".into()));

        store.clear();
        assert_eq!(store.remembered_username().unwrap(), Some("jdoe".into()));

        store.set_remembered_username(None).unwrap();
        assert_eq!(store.remembered_username().unwrap(), None);
    }
}
