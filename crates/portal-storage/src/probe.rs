//! Durable-storage capability probing.

use crate::{KeyValueStore, StorageKeys, StorageResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Best-effort private-context heuristic supplied by the host.
pub type PrivacyHeuristic = Box<dyn Fn() -> StorageResult<bool> + Send + Sync>;

/// Answers "may a session be written durably here?".
///
/// Neither probe ever fails: any error collapses to `false`, which steers the
/// selector toward the ephemeral store.
pub struct StorageProbe {
    durable: Arc<dyn KeyValueStore>,
    privacy: PrivacyHeuristic,
}

impl StorageProbe {
    /// Probe with a host-provided private-context heuristic.
    pub fn new(durable: Arc<dyn KeyValueStore>, privacy: PrivacyHeuristic) -> Self {
        Self { durable, privacy }
    }

    /// Probe whose private-context answer is a fixed flag (e.g. from config).
    pub fn with_private_flag(durable: Arc<dyn KeyValueStore>, private_mode: bool) -> Self {
        Self::new(durable, Box::new(move || Ok(private_mode)))
    }

    /// Whether the host looks like a private/incognito context.
    pub fn is_private_browsing(&self) -> bool {
        match (self.privacy)() {
            Ok(private) => private,
            Err(e) => {
                warn!(error = %e, "Private-context heuristic failed, assuming not private");
                false
            }
        }
    }

    /// Whether a sentinel can be written to and removed from the durable store.
    pub fn can_write_durable(&self) -> bool {
        let sentinel = StorageKeys::PROBE_SENTINEL;
        if let Err(e) = self.durable.set(sentinel, sentinel) {
            debug!(error = %e, "Durable store rejected probe write");
            return false;
        }
        match self.durable.delete(sentinel) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Durable store rejected probe delete");
                false
            }
        }
    }
}
