//! Session storage for the HR portal.
//!
//! This crate provides:
//! - the [`KeyValueStore`] abstraction with a durable [`FileStore`] and an
//!   ephemeral, tab-scoped [`MemoryStore`]
//! - [`StorageProbe`] / [`StorageSelector`] deciding where a new session goes
//! - [`SessionStore`], which persists the identity + token triple and reads it
//!   back across both backends

mod file;
mod keys;
mod memory;
mod probe;
mod selector;
mod session_store;
mod traits;

pub use file::FileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use probe::{PrivacyHeuristic, StorageProbe};
pub use selector::{StorageSelector, StoreKind};
pub use session_store::{ClearFailure, ClearReport, RawSession, SessionStore, StoreBackends};
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend refused the operation (disabled storage, private mode, ...)
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Backend is full
    #[error("Storage quota exceeded while writing {0}")]
    QuotaExceeded(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_are_unique() {
        let keys = [
            StorageKeys::USER,
            StorageKeys::ACCESS_TOKEN,
            StorageKeys::REFRESH_TOKEN,
            StorageKeys::REMEMBERED_USERNAME,
            StorageKeys::DEVICE_ID,
            StorageKeys::PROBE_SENTINEL,
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
    }

    #[test]
    fn test_session_keys_exclude_convenience_keys() {
        assert!(!StorageKeys::SESSION_KEYS.contains(&StorageKeys::REMEMBERED_USERNAME));
        assert!(!StorageKeys::SESSION_KEYS.contains(&StorageKeys::DEVICE_ID));
    }
}
