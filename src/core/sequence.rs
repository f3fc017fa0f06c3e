//! Named sequence counters
//!
//! This module provides the `SequenceGenerator`, which allocates strictly
//! increasing integers per named counter (transaction IDs, per-role member
//! IDs), and the pure formatting of external identifiers from those integers.
//!
//! # Design
//!
//! Each counter lives in a `DashMap` entry. `next` performs the find-and-
//! increment while holding the entry's write lock, so concurrent callers can
//! never observe the same value. A counter that does not exist yet is created
//! at 0 on first use (upsert), so its first allocated value is 1.

use std::sync::Arc;

use dashmap::DashMap;

use super::status::StoreStatus;
use crate::types::{LedgerError, Role};

/// Name of the counter backing transaction IDs
pub const TRANSACTION_SEQUENCE: &str = "transaction_id";

/// Name of the member-ID counter of a role
pub fn member_sequence_name(role: Role) -> String {
    format!("member_id.{}", role.as_str())
}

/// Format an external identifier as prefix plus zero-padded sequence value
///
/// Values wider than `width` are printed in full, never truncated.
pub fn format_external_id(prefix: &str, seq: u64, width: usize) -> String {
    format!("{}{:0width$}", prefix, seq, width = width)
}

fn advance(name: &str, counter: &mut u64) -> Result<u64, LedgerError> {
    *counter = counter
        .checked_add(1)
        .ok_or_else(|| LedgerError::sequence_exhausted(name))?;
    Ok(*counter)
}

/// Thread-safe allocator of named, monotonically increasing counters
#[derive(Debug)]
pub struct SequenceGenerator {
    /// Last allocated value per counter name
    counters: DashMap<String, u64>,

    status: Arc<StoreStatus>,
}

impl SequenceGenerator {
    pub fn new(status: Arc<StoreStatus>) -> Self {
        Self {
            counters: DashMap::new(),
            status,
        }
    }

    /// Allocate the next value of `name`
    ///
    /// # Returns
    ///
    /// * `Ok(value)` - The previous value plus one (1 for a fresh counter)
    /// * `Err(LedgerError::StoreUnavailable)` - The store is offline; no value is consumed
    /// * `Err(LedgerError::SequenceExhausted)` - The counter is at `u64::MAX`; it stays there
    pub fn next(&self, name: &str) -> Result<u64, LedgerError> {
        self.status.ensure_online("sequence allocation")?;

        if let Some(mut counter) = self.counters.get_mut(name) {
            return advance(name, &mut counter);
        }

        let mut counter = self.counters.entry(name.to_string()).or_insert(0);
        advance(name, &mut counter)
    }

    /// Last value allocated for `name` (0 if the counter was never used)
    pub fn current(&self, name: &str) -> u64 {
        self.counters.get(name).map(|counter| *counter).unwrap_or(0)
    }
}
