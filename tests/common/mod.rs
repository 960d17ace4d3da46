// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use fiducia::application::AccountService;
use fiducia::config::Settings;
use fiducia::domain::{
    AccountId, AccountSnapshot, Asset, BalanceId, BalanceLine, ClaimableBalance, Network,
    Stroops, TransactionSummary,
};
use fiducia::gateway::{GatewayError, GatewayResult, LedgerGateway, ResultCodes};

/// Secret of the account every test operates on (seed bytes all 0x01).
pub const HOLDER_SECRET: &str = "SAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQC5MY";
pub const HOLDER: &str = "GCFIRY65OQE7DFP5KLNS2PF2LVZMUZYJX4OZIEQ36N2IQANUB5XVYOJR";
pub const ISSUER: &str = "GCATS5YOVB6ROX2WUNKGNQ2MP3GMXDMKSG2O4N5CLX3A6W4PZGZZI55U";
pub const SPONSOR: &str = "GDWUSKGGFDI4FRXK5EBTRECZSVQSSWJHHJOGH6JWG3AUMFFMQ435DIAG";
pub const STRANGER: &str = "GDFJHLAXAUMHA4OWPOB4P7YO72AQR2HMIUYFOXLXE2DZGM633K7HZDQP";

pub const BALANCE_ID: &str =
    "00000000da0d57da7d4850e7fc10d2a9d0ebc731f7afb40574c03395b17d49149b91f5be";

/// Deterministic balance id whose hash is `byte` repeated.
pub fn balance_id(byte: u8) -> String {
    format!("00000000{}", hex_byte(byte).repeat(32))
}

fn hex_byte(byte: u8) -> String {
    format!("{:02x}", byte)
}

pub fn account(address: &str) -> AccountId {
    address.parse().unwrap()
}

pub fn usd() -> Asset {
    Asset::credit("USD", ISSUER).unwrap()
}

pub fn trustline(asset: Asset, balance: Stroops) -> BalanceLine {
    BalanceLine {
        asset,
        balance,
        limit: Some(1_000_000_000_000),
    }
}

pub fn native_line(balance: Stroops) -> BalanceLine {
    BalanceLine {
        asset: Asset::Native,
        balance,
        limit: None,
    }
}

pub fn holder_snapshot(sequence: i64, balances: Vec<BalanceLine>) -> AccountSnapshot {
    AccountSnapshot {
        account_id: account(HOLDER),
        sequence,
        balances,
    }
}

pub fn claimable(id: &str, asset: Asset, amount: Stroops, claimants: &[&str]) -> ClaimableBalance {
    ClaimableBalance {
        id: BalanceId::parse(id).unwrap(),
        asset,
        amount,
        sponsor: Some(account(SPONSOR)),
        claimants: claimants.iter().map(|c| c.to_string()).collect(),
        unrecognized_asset: None,
    }
}

pub fn rejection(operations: &[&str]) -> GatewayError {
    GatewayError::Rejected(ResultCodes {
        transaction: Some("tx_failed".to_string()),
        operations: operations.iter().map(|c| c.to_string()).collect(),
    })
}

/// Sequence number carried by a base64 envelope: after the envelope type,
/// the muxed source account and the fee.
pub fn envelope_sequence(envelope_base64: &str) -> i64 {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(envelope_base64)
        .unwrap();
    i64::from_be_bytes(bytes[44..52].try_into().unwrap())
}

/// In-memory ledger with scripted responses.
///
/// Records every call by name. A successful submission consumes one
/// sequence number of the holder account, as the real ledger does.
#[derive(Default)]
pub struct MockGateway {
    accounts: Mutex<HashMap<String, AccountSnapshot>>,
    balances: Mutex<HashMap<String, ClaimableBalance>>,
    transactions: Vec<TransactionSummary>,
    account_error: Option<GatewayError>,
    submit_results: Mutex<VecDeque<GatewayResult<String>>>,
    calls: Mutex<Vec<String>>,
    submitted: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, snapshot: AccountSnapshot) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(snapshot.account_id.to_string(), snapshot);
        self
    }

    pub fn with_balance(self, record: ClaimableBalance) -> Self {
        self.balances
            .lock()
            .unwrap()
            .insert(record.id.to_string(), record);
        self
    }

    pub fn with_transactions(mut self, transactions: Vec<TransactionSummary>) -> Self {
        self.transactions = transactions;
        self
    }

    /// Every account load fails with `err`.
    pub fn failing_account_load(mut self, err: GatewayError) -> Self {
        self.account_error = Some(err);
        self
    }

    /// Queue the result of the next submission. Unscripted submissions succeed.
    pub fn then_submit(self, result: GatewayResult<String>) -> Self {
        self.submit_results.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| *c == name).count()
    }

    /// Base64 envelopes in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn load_account(
        &self,
        _network: Network,
        account: &AccountId,
    ) -> GatewayResult<AccountSnapshot> {
        self.record("load_account");
        if let Some(err) = &self.account_error {
            return Err(err.clone());
        }
        self.accounts
            .lock()
            .unwrap()
            .get(account.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("account {}", account)))
    }

    async fn load_claimable_balance(
        &self,
        _network: Network,
        balance_id: &BalanceId,
    ) -> GatewayResult<ClaimableBalance> {
        self.record("load_claimable_balance");
        self.balances
            .lock()
            .unwrap()
            .get(balance_id.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("claimable balance {}", balance_id)))
    }

    async fn list_claimable_balances(
        &self,
        _network: Network,
        _claimant: &AccountId,
        limit: u32,
    ) -> GatewayResult<Vec<ClaimableBalance>> {
        self.record("list_claimable_balances");
        let mut records: Vec<_> = self.balances.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn list_transactions(
        &self,
        _network: Network,
        _account: &AccountId,
        limit: u32,
    ) -> GatewayResult<Vec<TransactionSummary>> {
        self.record("list_transactions");
        Ok(self
            .transactions
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn submit(&self, _network: Network, envelope_base64: &str) -> GatewayResult<String> {
        self.record("submit");
        self.submitted
            .lock()
            .unwrap()
            .push(envelope_base64.to_string());

        let result = self
            .submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("hash-{}", self.submitted.lock().unwrap().len())));

        if result.is_ok() {
            for snapshot in self.accounts.lock().unwrap().values_mut() {
                snapshot.sequence += 1;
            }
        }
        result
    }
}

/// Service over a mock gateway with default settings.
pub fn test_service(gateway: MockGateway) -> AccountService<MockGateway> {
    AccountService::new(gateway, Settings::default())
}
