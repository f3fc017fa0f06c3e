//! Concurrent replay of operation batches
//!
//! This module provides the `BatchProcessor`, which applies a batch of
//! [`LedgerOp`]s concurrently while producing the same balances as applying
//! them one by one.
//!
//! # Design
//!
//! A transfer touches two accounts, so the batch is split into groups of
//! operations connected through shared accounts (union-find over the
//! accounts each operation names). Idempotency keys are ledger-wide, so
//! operations claiming the same key are joined as well; otherwise the first
//! group to commit would win the key instead of the first row. Groups share
//! no account and no key and therefore commute; each group runs
//! sequentially in its own task, in the original order.
//!
//! Transaction ids are allocated in commit order, so their interleaving
//! across groups may differ from a sequential replay. Balances do not.

use std::collections::HashMap;

use tracing::error;

use super::services::LedgerServices;
use crate::types::{AccountId, LedgerError, LedgerOp, OpOutcome};

/// Result of applying a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub op: LedgerOp,
    pub result: Result<OpOutcome, LedgerError>,
}

#[derive(Clone)]
pub struct BatchProcessor {
    services: LedgerServices,
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}

impl BatchProcessor {
    pub fn new(services: LedgerServices) -> Self {
        Self { services }
    }

    /// Split a batch into groups that share no account and no idempotency key
    ///
    /// # Guarantees
    ///
    /// - Each operation appears in exactly one group
    /// - Operations keep their original relative order inside a group
    /// - Two operations naming a common account land in the same group
    /// - Two operations claiming the same idempotency key land in the same group
    /// - Groups are ordered by their first operation
    pub fn partition_independent(&self, batch: Vec<LedgerOp>) -> Vec<Vec<LedgerOp>> {
        let roots: Vec<usize> = {
            let mut parent: Vec<usize> = (0..batch.len()).collect();
            let mut account_owner: HashMap<&AccountId, usize> = HashMap::new();
            let mut key_owner: HashMap<&str, usize> = HashMap::new();

            for (i, op) in batch.iter().enumerate() {
                for account in op.accounts() {
                    match account_owner.get(account) {
                        Some(&first) => union(&mut parent, i, first),
                        None => {
                            account_owner.insert(account, i);
                        }
                    }
                }
                if let Some(key) = op.idempotency_key() {
                    match key_owner.get(key) {
                        Some(&first) => union(&mut parent, i, first),
                        None => {
                            key_owner.insert(key, i);
                        }
                    }
                }
            }

            (0..batch.len()).map(|i| find(&mut parent, i)).collect()
        };

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<LedgerOp>> = Vec::new();
        for (op, root) in batch.into_iter().zip(roots) {
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(op);
        }

        groups
    }

    /// Apply one group sequentially; failures do not stop the group
    pub async fn process_group(&self, ops: Vec<LedgerOp>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            let result = self.services.execute(op.clone()).await;
            results.push(ProcessingResult { op, result });
        }
        results
    }

    /// Apply a batch, one task per independent group
    ///
    /// Results come back grouped, in group order.
    pub async fn process_batch(&self, batch: Vec<LedgerOp>) -> Vec<ProcessingResult> {
        let groups = self.partition_independent(batch);

        let mut tasks = Vec::with_capacity(groups.len());
        for group in groups {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move { processor.process_group(group).await }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => error!(error = %e, "replay task panicked"),
            }
        }
        results
    }
}
