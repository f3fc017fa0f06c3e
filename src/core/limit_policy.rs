//! Role-pair transfer limits
//!
//! `LimitPolicy` decides whether a single transfer may proceed given the
//! roles of both parties. In `Normal` mode an amount above the pair's cap is
//! rejected; in `Bulk` mode the check is skipped entirely and the cap source
//! is not even consulted. Unlisted pairs are uncapped.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use super::traits::TransferCapSource;
use crate::types::{LedgerError, Role, TransferMode};

/// Outcome of a limit check
#[derive(Debug, Clone, PartialEq)]
pub enum LimitDecision {
    Allow,

    /// The amount exceeds `cap`
    Reject { cap: Decimal, reason: String },
}

impl LimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LimitDecision::Allow)
    }
}

/// Stateless per-call limit checker
#[derive(Clone)]
pub struct LimitPolicy {
    caps: Arc<dyn TransferCapSource>,
}

impl LimitPolicy {
    pub fn new(caps: Arc<dyn TransferCapSource>) -> Self {
        Self { caps }
    }

    /// Check a transfer amount against the cap of its role pair
    ///
    /// # Arguments
    ///
    /// * `sender_role` - Resolved role of the sender
    /// * `receiver_role` - Resolved role of the receiver
    /// * `amount` - Amount to move
    /// * `mode` - `Bulk` bypasses every cap
    ///
    /// # Returns
    ///
    /// * `Ok(LimitDecision::Allow)` - No cap, amount within the cap, or bulk mode
    /// * `Ok(LimitDecision::Reject { .. })` - Amount above the configured cap
    /// * `Err(_)` - The cap source failed
    pub async fn check(
        &self,
        sender_role: Role,
        receiver_role: Role,
        amount: Decimal,
        mode: TransferMode,
    ) -> Result<LimitDecision, LedgerError> {
        if mode == TransferMode::Bulk {
            return Ok(LimitDecision::Allow);
        }

        match self.caps.transfer_cap(sender_role, receiver_role).await? {
            Some(cap) if amount > cap => {
                debug!(%sender_role, %receiver_role, %cap, %amount, "limit check rejected");
                Ok(LimitDecision::Reject {
                    cap,
                    reason: format!(
                        "transfers from {} to {} are limited to {} per transaction",
                        sender_role, receiver_role, cap
                    ),
                })
            }
            _ => Ok(LimitDecision::Allow),
        }
    }
}
