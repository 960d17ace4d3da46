//! Composition of ordered operation plans for each domain action.
//!
//! Plans are pure data built from already-fetched ledger state. The order of
//! operations inside a plan is significant and is never rearranged after
//! composition.

use serde::Serialize;

use super::{
    AccountId, AccountSnapshot, Asset, BalanceId, ClaimableBalance, MAX_TRUST_LIMIT, Stroops,
    format_stroops,
};

/// A single ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Payment {
        destination: AccountId,
        asset: Asset,
        amount: Stroops,
    },
    /// Sets the trust limit for an asset. A zero limit removes the trustline.
    ChangeTrust { asset: Asset, limit: Stroops },
    ClaimClaimableBalance { balance_id: BalanceId },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Payment { .. } => OperationKind::Payment,
            Operation::ChangeTrust { limit: 0, .. } => OperationKind::RemoveTrust,
            Operation::ChangeTrust { .. } => OperationKind::EstablishTrust,
            Operation::ClaimClaimableBalance { .. } => OperationKind::Claim,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Operation::Payment {
                destination,
                asset,
                amount,
            } => format!(
                "pay {} {} to {}",
                format_stroops(*amount),
                asset.code(),
                destination.short()
            ),
            Operation::ChangeTrust { asset, limit: 0 } => format!("remove trustline {}", asset),
            Operation::ChangeTrust { asset, .. } => format!("trust {}", asset),
            Operation::ClaimClaimableBalance { balance_id } => {
                format!("claim balance {}", balance_id.short())
            }
        }
    }
}

/// Coarse classification of an operation, convenient for assertions on plan shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Payment,
    EstablishTrust,
    RemoveTrust,
    Claim,
}

/// Ordered list of operations submitted together in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OperationPlan {
    operations: Vec<Operation>,
}

impl OperationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step at the end of the plan.
    pub fn then(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn kinds(&self) -> Vec<OperationKind> {
        self.operations.iter().map(Operation::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Remove a trustline, first returning any held balance to the issuer.
///
/// The payment must precede the zero-limit change: the ledger refuses to
/// drop a trustline that still holds a balance.
pub fn remove_trustline_plan(snapshot: &AccountSnapshot, asset: &Asset) -> OperationPlan {
    let mut plan = OperationPlan::new();

    if let (Some(line), Some(issuer)) = (snapshot.balance_for(asset), asset.issuer()) {
        if line.balance > 0 {
            plan = plan.then(Operation::Payment {
                destination: issuer.clone(),
                asset: asset.clone(),
                amount: line.balance,
            });
        }
    }

    plan.then(Operation::ChangeTrust {
        asset: asset.clone(),
        limit: 0,
    })
}

/// Claim a balance, establishing trust first for non-native assets.
pub fn claim_plan(record: &ClaimableBalance) -> OperationPlan {
    let mut plan = OperationPlan::new();

    if !record.asset.is_native() {
        plan = plan.then(Operation::ChangeTrust {
            asset: record.asset.clone(),
            limit: MAX_TRUST_LIMIT,
        });
    }

    plan.then(Operation::ClaimClaimableBalance {
        balance_id: record.id.clone(),
    })
}

/// Reject a balance: claim it and pay the full amount back to the sponsor.
///
/// For non-native assets the trustline is opened before the claim and
/// closed again after the payment. All steps must land in one transaction.
pub fn reject_plan(record: &ClaimableBalance, sponsor: &AccountId) -> OperationPlan {
    let mut plan = claim_plan(record).then(Operation::Payment {
        destination: sponsor.clone(),
        asset: record.asset.clone(),
        amount: record.amount,
    });

    if !record.asset.is_native() {
        plan = plan.then(Operation::ChangeTrust {
            asset: record.asset.clone(),
            limit: 0,
        });
    }

    plan
}

/// Single payment.
pub fn payment_plan(destination: &AccountId, asset: &Asset, amount: Stroops) -> OperationPlan {
    OperationPlan::new().then(Operation::Payment {
        destination: destination.clone(),
        asset: asset.clone(),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BalanceLine;
    use super::OperationKind::*;

    const HOLDER: &str = "GAB2CB576PHBBPQ5ODORRZ2LYCMWPZGWGCN2KDK7DXOIMZASKUY3QZ6Q";
    const ISSUER: &str = "GCFIRY65OQE7DFP5KLNS2PF2LVZMUZYJX4OZIEQ36N2IQANUB5XVYOJR";
    const SPONSOR: &str = "GCATS5YOVB6ROX2WUNKGNQ2MP3GMXDMKSG2O4N5CLX3A6W4PZGZZI55U";
    const BALANCE_ID: &str =
        "00000000da0d57da7d4850e7fc10d2a9d0ebc731f7afb40574c03395b17d49149b91f5be";

    fn usdc() -> Asset {
        Asset::credit("USDC", ISSUER).unwrap()
    }

    fn snapshot_with(balance: Stroops) -> AccountSnapshot {
        AccountSnapshot {
            account_id: HOLDER.parse().unwrap(),
            sequence: 100,
            balances: vec![
                BalanceLine {
                    asset: Asset::Native,
                    balance: 50_000_000,
                    limit: None,
                },
                BalanceLine {
                    asset: usdc(),
                    balance,
                    limit: Some(MAX_TRUST_LIMIT),
                },
            ],
        }
    }

    fn record(asset: Asset) -> ClaimableBalance {
        ClaimableBalance {
            id: BalanceId::parse(BALANCE_ID).unwrap(),
            asset,
            amount: 12_345_678,
            sponsor: Some(SPONSOR.parse().unwrap()),
            claimants: vec![HOLDER.to_string()],
            unrecognized_asset: None,
        }
    }

    #[test]
    fn test_remove_trustline_with_balance_pays_issuer_first() {
        let plan = remove_trustline_plan(&snapshot_with(7_000_000), &usdc());
        assert_eq!(plan.kinds(), vec![Payment, RemoveTrust]);

        match &plan.operations()[0] {
            Operation::Payment {
                destination,
                amount,
                asset,
            } => {
                assert_eq!(destination.as_str(), ISSUER);
                assert_eq!(*amount, 7_000_000);
                assert_eq!(asset, &usdc());
            }
            other => panic!("expected payment, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_trustline_without_balance_only_drops_trust() {
        let plan = remove_trustline_plan(&snapshot_with(0), &usdc());
        assert_eq!(plan.kinds(), vec![RemoveTrust]);
    }

    #[test]
    fn test_remove_missing_trustline_still_emits_change_trust() {
        let other = Asset::credit("EURT", ISSUER).unwrap();
        let plan = remove_trustline_plan(&snapshot_with(5), &other);
        assert_eq!(plan.kinds(), vec![RemoveTrust]);
    }

    #[test]
    fn test_claim_native_is_single_step() {
        let plan = claim_plan(&record(Asset::Native));
        assert_eq!(plan.kinds(), vec![Claim]);
    }

    #[test]
    fn test_claim_credit_establishes_trust_first() {
        let plan = claim_plan(&record(usdc()));
        assert_eq!(plan.kinds(), vec![EstablishTrust, Claim]);
        assert_eq!(
            plan.operations()[0],
            Operation::ChangeTrust {
                asset: usdc(),
                limit: MAX_TRUST_LIMIT
            }
        );
    }

    #[test]
    fn test_reject_credit_is_four_steps_in_order() {
        let sponsor: AccountId = SPONSOR.parse().unwrap();
        let plan = reject_plan(&record(usdc()), &sponsor);
        assert_eq!(
            plan.kinds(),
            vec![EstablishTrust, Claim, Payment, RemoveTrust]
        );
        assert_eq!(
            plan.operations()[2],
            Operation::Payment {
                destination: sponsor,
                asset: usdc(),
                amount: 12_345_678,
            }
        );
    }

    #[test]
    fn test_reject_native_is_claim_then_payment() {
        let sponsor: AccountId = SPONSOR.parse().unwrap();
        let plan = reject_plan(&record(Asset::Native), &sponsor);
        assert_eq!(plan.kinds(), vec![Claim, Payment]);
    }

    #[test]
    fn test_describe() {
        let plan = remove_trustline_plan(&snapshot_with(10_000_000), &usdc());
        assert_eq!(
            plan.operations()[0].describe(),
            "pay 1.0000000 USDC to GCFIRY65..."
        );
        assert_eq!(
            plan.operations()[1].describe(),
            "remove trustline USDC (GCFIRY65...)"
        );
    }
}
