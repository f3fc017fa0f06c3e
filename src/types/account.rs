//! Account-related types for the campus wallet ledger
//!
//! This module defines account identifiers, the roles an account can hold,
//! and the registration record that drives the one-time registration fee.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account identifier
///
/// Member IDs such as `CUS00042` or `TRM00001`. Ordered so that multi-account
/// operations can lock balances in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Roles an account can hold
///
/// The role decides which transfer caps apply and who may amend
/// transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Student or staff member spending at campus outlets
    Customer,

    /// Food outlet receiving payments
    Restaurant,

    /// Treasury desk collecting cash top-ups
    TreasuryCollector,

    /// Master treasury distributing funds to admins and collectors
    TreasuryMaster,

    /// Campus administrator
    Admin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Customer,
        Role::Restaurant,
        Role::TreasuryCollector,
        Role::TreasuryMaster,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Restaurant => "restaurant",
            Role::TreasuryCollector => "treasury_collector",
            Role::TreasuryMaster => "treasury_master",
            Role::Admin => "admin",
        }
    }

    /// Prefix of the external member ID minted for this role
    pub fn member_prefix(&self) -> &'static str {
        match self {
            Role::Customer => "CUS",
            Role::Restaurant => "RES",
            Role::TreasuryCollector => "TRC",
            Role::TreasuryMaster => "TRM",
            Role::Admin => "ADM",
        }
    }

    /// Whether accounts with this role may amend descriptive transaction fields
    pub fn can_amend_transactions(&self) -> bool {
        matches!(self, Role::Admin | Role::TreasuryMaster)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "customer" => Ok(Role::Customer),
            "restaurant" => Ok(Role::Restaurant),
            "treasury_collector" | "collector" => Ok(Role::TreasuryCollector),
            "treasury_master" | "master" => Ok(Role::TreasuryMaster),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

/// A resolved account: identity plus role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub role: Role,
}

impl Account {
    pub fn new(account_id: impl Into<AccountId>, role: Role) -> Self {
        Self {
            account_id: account_id.into(),
            role,
        }
    }
}

/// How a customer was registered
///
/// The channel selects the registration fee rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationChannel {
    /// Self-service registration
    Online,

    /// Assisted registration at a treasury desk
    Offline,
}

impl RegistrationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationChannel::Online => "online",
            RegistrationChannel::Offline => "offline",
        }
    }
}

impl fmt::Display for RegistrationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "online" | "self" => Ok(RegistrationChannel::Online),
            "offline" | "assisted" => Ok(RegistrationChannel::Offline),
            other => Err(format!("Unknown registration channel '{}'", other)),
        }
    }
}

/// Registration record of a customer account
///
/// `fee_paid` flips to true exactly once, inside the registration fee saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub account_id: AccountId,
    pub channel: RegistrationChannel,
    pub fee_paid: bool,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(account_id: AccountId, channel: RegistrationChannel) -> Self {
        Self {
            account_id,
            channel,
            fee_paid: false,
            registered_at: Utc::now(),
        }
    }
}

/// Balance of one account as reported to the outside
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub role: Role,
    pub balance: Decimal,
}
