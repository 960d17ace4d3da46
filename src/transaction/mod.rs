//! Transaction building, hashing and signing.

mod xdr;

pub use xdr::{WriteXdr, XdrWriter};

use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use xdr::Muxed;

use crate::domain::{AccountId, AccountSnapshot, Keypair, Network, OperationPlan};

const ENVELOPE_TYPE_TX: u32 = 2;
const PRECOND_TIME: u32 = 1;
const MEMO_NONE: u32 = 0;

/// Ledger cap on operations per transaction.
pub const MAX_OPERATIONS: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("transaction has no operations")]
    EmptyPlan,

    #[error("transaction has {0} operations, the ledger allows at most {MAX_OPERATIONS}")]
    TooManyOperations(usize),

    #[error("fee of {base_fee} per operation overflows for {operations} operations")]
    FeeOverflow { base_fee: u32, operations: usize },
}

/// Validity window: the ledger refuses the transaction after `max_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

impl TimeBounds {
    /// Window from "now" until `timeout_secs` later.
    pub fn expiring_after(now: DateTime<Utc>, timeout_secs: u64) -> Self {
        Self {
            min_time: 0,
            max_time: (now.timestamp().max(0) as u64).saturating_add(timeout_secs),
        }
    }
}

/// An unsigned transaction ready for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub source: AccountId,
    /// Total fee in stroops
    pub fee: u32,
    pub sequence: i64,
    pub time_bounds: TimeBounds,
    pub plan: OperationPlan,
}

impl WriteXdr for Transaction {
    fn write_xdr(&self, writer: &mut XdrWriter) {
        writer
            .write(&Muxed(&self.source))
            .u32(self.fee)
            .i64(self.sequence)
            .u32(PRECOND_TIME)
            .u64(self.time_bounds.min_time)
            .u64(self.time_bounds.max_time)
            .u32(MEMO_NONE)
            .u32(self.plan.len() as u32);
        for operation in self.plan.operations() {
            writer.write(operation);
        }
        // ext
        writer.u32(0);
    }
}

impl Transaction {
    /// Hash signed by the source account. Binds the transaction to `network`.
    pub fn hash(&self, network: Network) -> [u8; 32] {
        let mut payload = XdrWriter::new();
        payload
            .opaque_fixed(&network.network_id())
            .u32(ENVELOPE_TYPE_TX)
            .write(self);
        Sha256::digest(payload.into_bytes()).into()
    }

    /// Sign for `network` and wrap into a transaction envelope.
    pub fn sign(self, keypair: &Keypair, network: Network) -> SignedTransaction {
        let hash = self.hash(network);
        let signature = keypair.sign(&hash);

        let mut envelope = XdrWriter::new();
        envelope
            .u32(ENVELOPE_TYPE_TX)
            .write(&self)
            .u32(1)
            .opaque_fixed(&keypair.signature_hint())
            .opaque_var(&signature);

        SignedTransaction {
            hash: hex::encode(hash),
            envelope: envelope.into_bytes(),
            transaction: self,
        }
    }
}

/// Builder that derives sequence and fee from a freshly loaded account.
pub struct TransactionBuilder<'a> {
    snapshot: &'a AccountSnapshot,
    base_fee: u32,
    time_bounds: Option<TimeBounds>,
    plan: OperationPlan,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(snapshot: &'a AccountSnapshot, base_fee: u32) -> Self {
        Self {
            snapshot,
            base_fee,
            time_bounds: None,
            plan: OperationPlan::new(),
        }
    }

    pub fn with_timeout(mut self, now: DateTime<Utc>, timeout_secs: u64) -> Self {
        self.time_bounds = Some(TimeBounds::expiring_after(now, timeout_secs));
        self
    }

    pub fn with_plan(mut self, plan: OperationPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn build(self) -> Result<Transaction, BuildError> {
        let operations = self.plan.len();
        if operations == 0 {
            return Err(BuildError::EmptyPlan);
        }
        if operations > MAX_OPERATIONS {
            return Err(BuildError::TooManyOperations(operations));
        }
        let fee = self
            .base_fee
            .checked_mul(operations as u32)
            .ok_or(BuildError::FeeOverflow {
                base_fee: self.base_fee,
                operations,
            })?;

        Ok(Transaction {
            source: self.snapshot.account_id.clone(),
            fee,
            sequence: self.snapshot.next_sequence(),
            time_bounds: self.time_bounds.unwrap_or(TimeBounds {
                min_time: 0,
                max_time: 0,
            }),
            plan: self.plan,
        })
    }
}

/// A signed transaction envelope and its hash.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// Hex transaction hash, as reported by the ledger on success
    pub hash: String,
    pub envelope: Vec<u8>,
    pub transaction: Transaction,
}

impl SignedTransaction {
    /// Base64 envelope, the form the submission endpoint accepts.
    pub fn envelope_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.envelope)
    }
}
