use serde::Serialize;
use tracing::{info, warn};

use crate::domain::Network;
use crate::gateway::{LedgerGateway, ResultCodes};

use super::{AccountService, Action, AppError, Receipt};

/// Operation applied to every target of a bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkAction {
    /// Targets are `CODE:ISSUER` pairs
    RemoveTrustline,
    /// Targets are claimable balance ids
    Claim,
    /// Targets are claimable balance ids
    Reject,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::RemoveTrustline => "remove-trustline",
            BulkAction::Claim => "claim",
            BulkAction::Reject => "reject",
        }
    }

    /// Single action for one target. Malformed targets are caught by the
    /// service's input validation, so they fail only their own item.
    pub fn action_for(&self, target: &str) -> Action {
        match self {
            BulkAction::RemoveTrustline => {
                let (code, issuer) = target.trim().split_once(':').unwrap_or((target, ""));
                Action::RemoveTrustline {
                    asset_code: code.to_string(),
                    asset_issuer: issuer.to_string(),
                }
            }
            BulkAction::Claim => Action::ClaimBalance {
                balance_id: target.to_string(),
            },
            BulkAction::Reject => Action::RejectBalance {
                balance_id: target.to_string(),
            },
        }
    }
}

impl std::fmt::Display for BulkAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one item in a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TransactionOutcome {
    Success {
        hash: String,
    },
    Failure {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        codes: Option<ResultCodes>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOutcome {
    pub target: String,
    #[serde(flatten)]
    pub outcome: TransactionOutcome,
}

/// Aggregate of a bulk run. Every target appears exactly once, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub success_count: usize,
    /// `"<target>: <error>"`, in input order
    pub failures: Vec<String>,
    pub outcomes: Vec<TargetOutcome>,
}

impl BulkReport {
    /// Fold step: account for one more target.
    pub fn record(mut self, target: &str, result: Result<Receipt, AppError>) -> Self {
        let outcome = match result {
            Ok(receipt) => {
                self.success_count += 1;
                TransactionOutcome::Success { hash: receipt.hash }
            }
            Err(err) => {
                self.failures.push(format!("{}: {}", target, err));
                TransactionOutcome::Failure {
                    message: err.to_string(),
                    codes: err.result_codes().cloned(),
                }
            }
        };
        self.outcomes.push(TargetOutcome {
            target: target.to_string(),
            outcome,
        });
        self
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// All failure entries, one per line.
    pub fn failure_text(&self) -> String {
        self.failures.join("\n")
    }
}

/// Applies one action to many targets, strictly one after another.
///
/// A failing target never aborts the run; the next transaction is only
/// built once the previous submission has settled, so each one sees the
/// sequence number its predecessor consumed.
pub struct BulkCoordinator<'a, G> {
    service: &'a AccountService<G>,
}

impl<'a, G: LedgerGateway> BulkCoordinator<'a, G> {
    pub fn new(service: &'a AccountService<G>) -> Self {
        Self { service }
    }

    pub async fn run(
        &self,
        secret: &str,
        network: Network,
        action: BulkAction,
        targets: &[String],
    ) -> BulkReport {
        let mut report = BulkReport::default();

        for target in targets {
            let result = self
                .service
                .execute(secret, network, &action.action_for(target))
                .await;
            match &result {
                Ok(receipt) => info!(%action, %target, hash = %receipt.hash, "bulk item done"),
                Err(err) => warn!(%action, %target, error = %err, "bulk item failed"),
            }
            report = report.record(target, result);
        }

        info!(
            %action,
            total = report.total(),
            succeeded = report.success_count,
            failed = report.failure_count(),
            "bulk run finished"
        );
        report
    }
}
