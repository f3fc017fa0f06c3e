//! Ledger configuration
//!
//! Loaded from YAML; every field has a default so an empty file (or no file
//! at all) yields a working ledger.
//!
//! ```yaml
//! fees:
//!   online: "30.00"
//!   offline: "50.00"
//! limits:
//!   - sender: treasury_master
//!     receiver: admin
//!     cap: "5000.00"
//! operation_timeout_ms: 5000
//! member_ids:
//!   width: 5
//! logging:
//!   level: info
//!   json: false
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::directory::CapTable;
use crate::types::{FeeSchedule, LedgerError, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub fees: FeeSchedule,

    /// Per-transaction caps; unlisted role pairs are uncapped
    pub limits: Vec<LimitRule>,

    /// Default deadline of transfers and fee deductions
    pub operation_timeout_ms: u64,

    pub member_ids: MemberIdConfig,
    pub logging: LoggingConfig,
}

/// Cap on a single transfer between two roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitRule {
    pub sender: Role,
    pub receiver: Role,
    pub cap: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberIdConfig {
    /// Zero-padding of the numeric part, e.g. 5 gives `CUS00042`
    pub width: usize,
}

impl Default for MemberIdConfig {
    fn default() -> Self {
        Self { width: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            limits: Vec::new(),
            operation_timeout_ms: 5000,
            member_ids: MemberIdConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Load and validate a YAML configuration file
    ///
    /// # Returns
    ///
    /// * `Ok(config)` - The parsed configuration
    /// * `Err(LedgerError::ConfigError)` - File unreadable, malformed or invalid
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| LedgerError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, LedgerError> {
        // An empty document deserializes to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject negative fees, non-positive caps and duplicate role pairs
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.fees.online < Decimal::ZERO || self.fees.offline < Decimal::ZERO {
            return Err(LedgerError::ConfigError {
                message: "registration fees must not be negative".to_string(),
            });
        }

        let mut pairs = HashSet::new();
        for rule in &self.limits {
            if rule.cap <= Decimal::ZERO {
                return Err(LedgerError::ConfigError {
                    message: format!(
                        "cap for {} to {} must be positive, got {}",
                        rule.sender, rule.receiver, rule.cap
                    ),
                });
            }
            if !pairs.insert((rule.sender, rule.receiver)) {
                return Err(LedgerError::ConfigError {
                    message: format!("duplicate limit for {} to {}", rule.sender, rule.receiver),
                });
            }
        }

        if self.operation_timeout_ms == 0 {
            return Err(LedgerError::ConfigError {
                message: "operation_timeout_ms must be positive".to_string(),
            });
        }

        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn cap_table(&self) -> CapTable {
        CapTable::with_caps(
            self.limits
                .iter()
                .map(|rule| ((rule.sender, rule.receiver), rule.cap)),
        )
    }
}
