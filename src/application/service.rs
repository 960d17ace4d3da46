use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::domain::{
    AccountId, AccountSnapshot, Asset, BalanceId, BalanceLine, ClaimableBalance, Keypair, Network,
    Operation, OperationPlan, Stroops, TransactionSummary, claim_plan, parse_stroops, payment_plan,
    reject_plan, remove_trustline_plan,
};
use crate::gateway::{CLAIMABLE_BALANCE_PAGE_LIMIT, GatewayError, LedgerGateway};
use crate::transaction::{SignedTransaction, TransactionBuilder};

use super::AppError;

/// Result code the ledger reports when a payment destination does not exist.
const OP_NO_DESTINATION: &str = "op_no_destination";

/// Largest page the history endpoint serves.
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// A domain operation, with inputs exactly as the caller supplied them.
/// Inputs are validated before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RemoveTrustline {
        asset_code: String,
        asset_issuer: String,
    },
    ClaimBalance {
        balance_id: String,
    },
    RejectBalance {
        balance_id: String,
    },
    SendPayment {
        destination: String,
        asset: String,
        amount: String,
    },
}

impl Action {
    pub fn describe(&self) -> String {
        match self {
            Action::RemoveTrustline { asset_code, .. } => {
                format!("remove trustline {}", asset_code)
            }
            Action::ClaimBalance { balance_id } => format!("claim balance {}", balance_id),
            Action::RejectBalance { balance_id } => format!("reject balance {}", balance_id),
            Action::SendPayment {
                destination,
                asset,
                amount,
            } => format!("send {} {} to {}", amount, asset, destination),
        }
    }
}

/// Action whose inputs passed validation.
enum Validated {
    RemoveTrustline(Asset),
    Claim(BalanceId),
    Reject(BalanceId),
    Payment {
        destination: AccountId,
        asset: Asset,
        amount: Stroops,
    },
}

impl Validated {
    fn from_action(action: &Action) -> Result<Self, AppError> {
        match action {
            Action::RemoveTrustline {
                asset_code,
                asset_issuer,
            } => Asset::credit(asset_code, asset_issuer)
                .map(Validated::RemoveTrustline)
                .map_err(|e| AppError::InvalidInput(e.to_string())),
            Action::ClaimBalance { balance_id } => {
                Ok(Validated::Claim(parse_balance_id(balance_id)?))
            }
            Action::RejectBalance { balance_id } => {
                Ok(Validated::Reject(parse_balance_id(balance_id)?))
            }
            Action::SendPayment {
                destination,
                asset,
                amount,
            } => {
                let destination = parse_account(destination, "recipient")?;
                let asset =
                    Asset::parse(asset).map_err(|e| AppError::InvalidInput(e.to_string()))?;
                let amount = parse_stroops(amount)
                    .map_err(|e| AppError::InvalidInput(format!("amount '{}': {}", amount, e)))?;
                if amount <= 0 {
                    return Err(AppError::InvalidInput("Amount must be positive".to_string()));
                }
                Ok(Validated::Payment {
                    destination,
                    asset,
                    amount,
                })
            }
        }
    }
}

fn parse_balance_id(input: &str) -> Result<BalanceId, AppError> {
    BalanceId::parse(input).map_err(|e| AppError::InvalidInput(e.to_string()))
}

fn parse_account(input: &str, role: &str) -> Result<AccountId, AppError> {
    input
        .parse()
        .map_err(|e| AppError::InvalidInput(format!("{} '{}': {}", role, input.trim(), e)))
}

/// Parse a network selector supplied as text.
pub fn parse_network(selector: &str) -> Result<Network, AppError> {
    Network::from_str(selector).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Unsupported network '{}'. Valid networks: public, testnet",
            selector
        ))
    })
}

/// A signed transaction that has not been submitted yet.
pub struct PreparedTransaction {
    pub description: String,
    pub network: Network,
    pub plan: OperationPlan,
    pub signed: SignedTransaction,
}

/// Confirmation of a submitted transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub description: String,
    pub hash: String,
    pub plan: OperationPlan,
}

/// Orchestrates domain operations into signed, submitted transactions.
/// This is the primary interface for any client (CLI, TUI, etc.).
///
/// Holds no per-account state: every call resolves the credential and
/// fetches a fresh account snapshot.
pub struct AccountService<G> {
    gateway: G,
    settings: Settings,
}

impl<G: LedgerGateway> AccountService<G> {
    pub fn new(gateway: G, settings: Settings) -> Self {
        Self { gateway, settings }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Public identity behind a secret key.
    pub fn resolve_identity(&self, secret: &str) -> Result<AccountId, AppError> {
        Ok(Keypair::from_secret(secret)?.account_id().clone())
    }

    async fn load_account(
        &self,
        network: Network,
        account: &AccountId,
    ) -> Result<AccountSnapshot, AppError> {
        self.gateway
            .load_account(network, account)
            .await
            .map_err(|e| AppError::resolution(format!("account {}", account), e))
    }

    async fn load_balance(
        &self,
        network: Network,
        balance_id: &BalanceId,
    ) -> Result<ClaimableBalance, AppError> {
        self.gateway
            .load_claimable_balance(network, balance_id)
            .await
            .map_err(|e| AppError::resolution(format!("claimable balance {}", balance_id), e))
    }

    // ========================
    // Transaction operations
    // ========================

    /// Resolve state, compose the operation plan, build and sign, without submitting.
    pub async fn prepare(
        &self,
        secret: &str,
        network: Network,
        action: &Action,
    ) -> Result<PreparedTransaction, AppError> {
        let keypair = Keypair::from_secret(secret)?;
        let validated = Validated::from_action(action)?;
        let description = action.describe();

        debug!(account = %keypair.account_id(), %network, action = %description, "preparing");

        let snapshot = self.load_account(network, keypair.account_id()).await?;

        let plan = match &validated {
            Validated::RemoveTrustline(asset) => remove_trustline_plan(&snapshot, asset),
            Validated::Claim(balance_id) => {
                let record = self.load_balance(network, balance_id).await?;
                claim_plan(&record)
            }
            Validated::Reject(balance_id) => {
                let record = self.load_balance(network, balance_id).await?;
                if let Some(raw) = &record.unrecognized_asset {
                    return Err(AppError::AccountResolution {
                        subject: format!("claimable balance {}", balance_id),
                        reason: format!("asset '{}' is not recognized, refusing to return it", raw),
                    });
                }
                let sponsor =
                    record
                        .sponsor
                        .clone()
                        .ok_or_else(|| AppError::AccountResolution {
                            subject: format!("claimable balance {}", balance_id),
                            reason: "record has no sponsor to return funds to".to_string(),
                        })?;
                reject_plan(&record, &sponsor)
            }
            Validated::Payment {
                destination,
                asset,
                amount,
            } => payment_plan(destination, asset, *amount),
        };

        let transaction = TransactionBuilder::new(&snapshot, self.settings.base_fee)
            .with_timeout(Utc::now(), self.settings.tx_timeout_secs)
            .with_plan(plan.clone())
            .build()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        Ok(PreparedTransaction {
            description,
            network,
            plan,
            signed: transaction.sign(&keypair, network),
        })
    }

    /// Submit a prepared transaction. Never retried.
    pub async fn submit(&self, prepared: PreparedTransaction) -> Result<Receipt, AppError> {
        let PreparedTransaction {
            description,
            network,
            plan,
            signed,
        } = prepared;

        match self
            .gateway
            .submit(network, &signed.envelope_base64())
            .await
        {
            Ok(hash) => {
                info!(action = %description, %hash, "transaction submitted");
                Ok(Receipt {
                    description,
                    hash,
                    plan,
                })
            }
            Err(err) => {
                warn!(action = %description, error = %err, "submission failed");
                Err(classify_submission_error(err, &plan))
            }
        }
    }

    /// Run one domain operation end to end.
    pub async fn execute(
        &self,
        secret: &str,
        network: Network,
        action: &Action,
    ) -> Result<Receipt, AppError> {
        let prepared = self.prepare(secret, network, action).await?;
        self.submit(prepared).await
    }

    pub async fn remove_trustline(
        &self,
        secret: &str,
        network: Network,
        asset_code: &str,
        asset_issuer: &str,
    ) -> Result<Receipt, AppError> {
        let action = Action::RemoveTrustline {
            asset_code: asset_code.to_string(),
            asset_issuer: asset_issuer.to_string(),
        };
        self.execute(secret, network, &action).await
    }

    pub async fn claim_balance(
        &self,
        secret: &str,
        network: Network,
        balance_id: &str,
    ) -> Result<Receipt, AppError> {
        let action = Action::ClaimBalance {
            balance_id: balance_id.to_string(),
        };
        self.execute(secret, network, &action).await
    }

    pub async fn reject_balance(
        &self,
        secret: &str,
        network: Network,
        balance_id: &str,
    ) -> Result<Receipt, AppError> {
        let action = Action::RejectBalance {
            balance_id: balance_id.to_string(),
        };
        self.execute(secret, network, &action).await
    }

    pub async fn send_payment(
        &self,
        secret: &str,
        network: Network,
        destination: &str,
        asset: &str,
        amount: &str,
    ) -> Result<Receipt, AppError> {
        let action = Action::SendPayment {
            destination: destination.to_string(),
            asset: asset.to_string(),
            amount: amount.to_string(),
        };
        self.execute(secret, network, &action).await
    }

    // ========================
    // Queries
    // ========================

    /// Pending claimable balances the holder is an eligible claimant of.
    pub async fn list_claimable_balances(
        &self,
        secret: &str,
        network: Network,
    ) -> Result<Vec<ClaimableBalance>, AppError> {
        let keypair = Keypair::from_secret(secret)?;
        let account = keypair.account_id();

        let records = self
            .gateway
            .list_claimable_balances(network, account, CLAIMABLE_BALANCE_PAGE_LIMIT)
            .await?;

        Ok(records
            .into_iter()
            .filter(|record| record.is_claimable_by(account))
            .collect())
    }

    /// Non-native balance lines of the holder's account.
    pub async fn list_trustlines(
        &self,
        secret: &str,
        network: Network,
    ) -> Result<Vec<BalanceLine>, AppError> {
        let keypair = Keypair::from_secret(secret)?;
        let snapshot = self.load_account(network, keypair.account_id()).await?;
        Ok(snapshot.trustlines().cloned().collect())
    }

    /// Most recent transactions of any account, newest first.
    pub async fn transaction_history(
        &self,
        address: &str,
        network: Network,
        limit: u32,
    ) -> Result<Vec<TransactionSummary>, AppError> {
        let account = parse_account(address, "address")?;
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);

        self.gateway
            .list_transactions(network, &account, limit)
            .await
            .map_err(|err| match err {
                e @ GatewayError::NotFound(_) => {
                    AppError::resolution(format!("account {}", account), e)
                }
                other => other.into(),
            })
    }
}

/// Ledger rejections keep their codes; a payment to a missing account is
/// reported as such.
fn classify_submission_error(err: GatewayError, plan: &OperationPlan) -> AppError {
    match err {
        GatewayError::Rejected(codes) if codes.has_operation_code(OP_NO_DESTINATION) => {
            let destination = plan
                .operations()
                .iter()
                .find_map(|op| match op {
                    Operation::Payment { destination, .. } => Some(destination.to_string()),
                    _ => None,
                })
                .unwrap_or_default();
            AppError::RecipientNotFound { destination, codes }
        }
        other => other.into(),
    }
}
