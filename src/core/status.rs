//! Availability of the backing store
//!
//! Every store-backed component holds the same `StoreStatus`. Taking the
//! store offline makes all of them fail with `StoreUnavailable`, which is how
//! outages are simulated and how an operator drains the ledger for
//! maintenance.

use crate::types::LedgerError;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

#[derive(Debug)]
pub struct StoreStatus {
    online: AtomicBool,
}

impl StoreStatus {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::AcqRel);
        if previous != online {
            warn!(online, "store availability changed");
        }
    }

    /// Fail with `StoreUnavailable` when the store is offline
    pub fn ensure_online(&self, operation: &str) -> Result<(), LedgerError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(LedgerError::store_unavailable(operation))
        }
    }
}

impl Default for StoreStatus {
    fn default() -> Self {
        Self::new()
    }
}
