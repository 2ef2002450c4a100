//! Durable vs. ephemeral store selection.

use crate::StorageProbe;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which of the two backends a value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Survives restarts.
    Durable,
    /// Scoped to the current tab/process.
    Ephemeral,
}

impl StoreKind {
    /// Priority order for reads: the first backend holding a key wins.
    pub const READ_ORDER: [StoreKind; 2] = [StoreKind::Durable, StoreKind::Ephemeral];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Durable => "durable",
            StoreKind::Ephemeral => "ephemeral",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the backend a new session is written to.
pub struct StorageSelector {
    probe: StorageProbe,
}

impl StorageSelector {
    pub fn new(probe: StorageProbe) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> &StorageProbe {
        &self.probe
    }

    /// Durable only when the user asked to be remembered, the host is not a
    /// private context, and the durable store accepts writes.
    pub fn select(&self, remember_me: bool) -> StoreKind {
        if !remember_me {
            return StoreKind::Ephemeral;
        }
        if self.probe.is_private_browsing() {
            debug!("Private context detected, using ephemeral store");
            return StoreKind::Ephemeral;
        }
        if !self.probe.can_write_durable() {
            debug!("Durable store not writable, using ephemeral store");
            return StoreKind::Ephemeral;
        }
        StoreKind::Durable
    }
}
