//! Boundary to the external ledger network.
//!
//! The rest of the crate only sees the canonical records from `domain`;
//! every response-shape quirk is normalized inside the gateway.

mod horizon;

pub use horizon::HorizonGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    AccountId, AccountSnapshot, BalanceId, ClaimableBalance, Network, TransactionSummary,
};

/// Page size used for claimable balance listings.
pub const CLAIMABLE_BALANCE_PAGE_LIMIT: u32 = 200;

/// Structured result codes the ledger attaches to a rejected transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCodes {
    /// Transaction-level code, e.g. `tx_failed`
    #[serde(default)]
    pub transaction: Option<String>,
    /// One code per operation, in plan order
    #[serde(default)]
    pub operations: Vec<String>,
}

impl ResultCodes {
    pub fn has_operation_code(&self, code: &str) -> bool {
        self.operations.iter().any(|c| c == code)
    }
}

impl std::fmt::Display for ResultCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tx = self.transaction.as_deref().unwrap_or("unknown");
        if self.operations.is_empty() {
            write!(f, "{}", tx)
        } else {
            write!(f, "{} [{}]", tx, self.operations.join(", "))
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("transaction rejected: {0}")]
    Rejected(ResultCodes),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Query and submission surface of the ledger network.
///
/// Every call is a suspension point; implementations never retry.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn load_account(
        &self,
        network: Network,
        account: &AccountId,
    ) -> GatewayResult<AccountSnapshot>;

    async fn load_claimable_balance(
        &self,
        network: Network,
        balance_id: &BalanceId,
    ) -> GatewayResult<ClaimableBalance>;

    async fn list_claimable_balances(
        &self,
        network: Network,
        claimant: &AccountId,
        limit: u32,
    ) -> GatewayResult<Vec<ClaimableBalance>>;

    /// Most recent transactions first.
    async fn list_transactions(
        &self,
        network: Network,
        account: &AccountId,
        limit: u32,
    ) -> GatewayResult<Vec<TransactionSummary>>;

    /// Submit a base64 transaction envelope and return its hash.
    async fn submit(&self, network: Network, envelope_base64: &str) -> GatewayResult<String>;
}
