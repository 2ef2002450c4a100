use parking_lot::Mutex;
use portal_auth::{HttpLoginClient, Navigator, Route, SessionManager};
use portal_config_and_utils::{Config, Paths};
use portal_storage::{
    FileStore, KeyValueStore, MemoryStore, StorageKeys, StorageResult, StoreBackends,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::info;

/// Wire the session manager for this process.
///
/// The process plays the role of a browser tab: the ephemeral store is an
/// in-memory map that disappears on exit.
pub fn build_manager(
    config: &Config,
    paths: &Paths,
) -> Result<SessionManager, Box<dyn std::error::Error>> {
    let durable: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(paths.durable_store_file()));
    ensure_device_id(durable.as_ref())?;
    let ephemeral: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let login_client = Arc::new(HttpLoginClient::from_config(config)?);
    Ok(SessionManager::from_config(
        config,
        StoreBackends::new(durable, ephemeral),
        login_client,
    ))
}

/// Return the stored device id, generating one on first run.
pub fn ensure_device_id(store: &dyn KeyValueStore) -> StorageResult<String> {
    if let Some(existing) = store.get(StorageKeys::DEVICE_ID)? {
        if !existing.trim().is_empty() {
            return Ok(existing);
        }
    }
    let device_id = uuid::Uuid::new_v4().to_string();
    store.set(StorageKeys::DEVICE_ID, &device_id)?;
    info!(device_id = %device_id, "Generated device id");
    Ok(device_id)
}

/// Read one line from stdin after printing `label`.
pub fn prompt(label: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Navigator that reports redirects on the terminal.
pub struct TerminalNavigator {
    current: Mutex<Route>,
}

impl TerminalNavigator {
    pub fn at(route: Route) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(route),
        })
    }

    pub fn visit(&self, route: Route) {
        *self.current.lock() = route;
    }
}

impl Navigator for TerminalNavigator {
    fn current_route(&self) -> Route {
        self.current.lock().clone()
    }

    fn navigate(&self, to: &Route) {
        println!("-> {}", to);
        *self.current.lock() = to.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_device_id_is_generated_once() {
        let store = MemoryStore::new();
        let first = ensure_device_id(&store).unwrap();
        let second = ensure_device_id(&store).unwrap();
        assert_eq!(first, second);
        assert!(uuid::Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_existing_device_id_is_kept() {
        let store = MemoryStore::new();
        store.set(StorageKeys::DEVICE_ID, "fingerprint-1").unwrap();
        assert_eq!(ensure_device_id(&store).unwrap(), "fingerprint-1");
    }

    #[test]
    fn test_build_manager_starts_booting() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let manager = build_manager(&Config::default(), &paths).unwrap();

        assert!(manager.snapshot().is_loading());
        let durable = FileStore::new(paths.durable_store_file());
        assert!(durable.get(StorageKeys::DEVICE_ID).unwrap().is_some());
    }

    #[test]
    fn test_navigator_tracks_current_route() {
        let navigator = TerminalNavigator::at(Route::from("/auth/login"));
        navigator.navigate(&Route::from("/dashboard"));
        assert_eq!(navigator.current_route(), Route::from("/dashboard"));
        navigator.visit(Route::from("/leave"));
        assert_eq!(navigator.current_route().as_str(), "/leave");
    }
}
