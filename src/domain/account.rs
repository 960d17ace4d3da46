use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Asset, AccountId, Stroops};

/// One balance line of an account: the native balance or a trustline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLine {
    pub asset: Asset,
    pub balance: Stroops,
    /// Trust limit; `None` for the native balance
    pub limit: Option<Stroops>,
}

/// Account state fetched immediately before building a transaction.
/// Never cached: every operation loads a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    /// Sequence number of the last transaction the account submitted
    pub sequence: i64,
    pub balances: Vec<BalanceLine>,
}

impl AccountSnapshot {
    /// Sequence number the next transaction must carry.
    pub fn next_sequence(&self) -> i64 {
        self.sequence + 1
    }

    /// Find the balance line holding the given asset.
    pub fn balance_for(&self, asset: &Asset) -> Option<&BalanceLine> {
        self.balances.iter().find(|line| &line.asset == asset)
    }

    /// All non-native balance lines.
    pub fn trustlines(&self) -> impl Iterator<Item = &BalanceLine> {
        self.balances.iter().filter(|line| !line.asset.is_native())
    }
}

/// Identifier of a claimable balance: the hex encoding of its
/// 4-byte type discriminant followed by the 32-byte hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BalanceId {
    hex: String,
    hash: [u8; 32],
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid claimable balance id '{0}': expected 72 hex characters starting with 00000000")]
pub struct BalanceIdError(pub String);

impl BalanceId {
    pub fn parse(input: &str) -> Result<Self, BalanceIdError> {
        let hex_str = input.trim().to_ascii_lowercase();
        let bytes = hex::decode(&hex_str).map_err(|_| BalanceIdError(input.to_string()))?;
        if bytes.len() != 36 || bytes[..4] != [0, 0, 0, 0] {
            return Err(BalanceIdError(input.to_string()));
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[4..]);
        Ok(Self { hex: hex_str, hash })
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Shortened form for display: the first 16 hash characters.
    pub fn short(&self) -> String {
        format!("{}...", &self.hex[8..24])
    }
}

impl TryFrom<String> for BalanceId {
    type Error = BalanceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BalanceId> for String {
    fn from(value: BalanceId) -> Self {
        value.hex
    }
}

impl std::fmt::Display for BalanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex)
    }
}

/// A pending claimable balance as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimableBalance {
    pub id: BalanceId,
    pub asset: Asset,
    pub amount: Stroops,
    /// Account that funded the balance; rejected balances are returned here
    pub sponsor: Option<AccountId>,
    pub claimants: Vec<String>,
    /// Raw asset text when the ledger's asset could not be parsed and
    /// `asset` fell back to native
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrecognized_asset: Option<String>,
}

impl ClaimableBalance {
    pub fn is_claimable_by(&self, account: &AccountId) -> bool {
        self.claimants.iter().any(|c| c == account.as_str())
    }
}

/// Summary of a submitted transaction, as shown in account history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: String,
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub source_account: String,
    pub operation_count: u32,
    pub successful: bool,
    pub memo: Option<String>,
}
