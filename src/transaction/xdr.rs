//! Minimal XDR encoder covering the transaction subset this crate submits.
//!
//! XDR is big-endian with every item padded to a multiple of four bytes.

use crate::domain::{AccountId, Asset, BalanceId, Operation};

const PUBLIC_KEY_TYPE_ED25519: u32 = 0;
const KEY_TYPE_ED25519: u32 = 0;

const ASSET_TYPE_NATIVE: u32 = 0;
const ASSET_TYPE_CREDIT_ALPHANUM4: u32 = 1;
const ASSET_TYPE_CREDIT_ALPHANUM12: u32 = 2;

const OP_PAYMENT: u32 = 1;
const OP_CHANGE_TRUST: u32 = 6;
const OP_CLAIM_CLAIMABLE_BALANCE: u32 = 15;

const CLAIMABLE_BALANCE_ID_TYPE_V0: u32 = 0;

#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.u32(value as u32)
    }

    /// Fixed-length opaque data, zero-padded to a 4-byte boundary.
    pub fn opaque_fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self.pad(bytes.len())
    }

    /// Variable-length opaque data: length prefix, bytes, padding.
    pub fn opaque_var(&mut self, bytes: &[u8]) -> &mut Self {
        self.u32(bytes.len() as u32);
        self.opaque_fixed(bytes)
    }

    pub fn write<T: WriteXdr + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.write_xdr(self);
        self
    }

    fn pad(&mut self, len: usize) -> &mut Self {
        let padding = (4 - len % 4) % 4;
        self.buf.extend(std::iter::repeat_n(0u8, padding));
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub trait WriteXdr {
    fn write_xdr(&self, writer: &mut XdrWriter);

    fn to_xdr(&self) -> Vec<u8> {
        let mut writer = XdrWriter::new();
        self.write_xdr(&mut writer);
        writer.into_bytes()
    }
}

/// `AccountID` / `PublicKey` union.
impl WriteXdr for AccountId {
    fn write_xdr(&self, writer: &mut XdrWriter) {
        writer
            .u32(PUBLIC_KEY_TYPE_ED25519)
            .opaque_fixed(self.public_key());
    }
}

/// `MuxedAccount` union, always the plain ed25519 arm.
pub struct Muxed<'a>(pub &'a AccountId);

impl WriteXdr for Muxed<'_> {
    fn write_xdr(&self, writer: &mut XdrWriter) {
        writer.u32(KEY_TYPE_ED25519).opaque_fixed(self.0.public_key());
    }
}

/// `Asset` union. `ChangeTrustAsset` shares the same encoding for these arms.
impl WriteXdr for Asset {
    fn write_xdr(&self, writer: &mut XdrWriter) {
        match self {
            Asset::Native => {
                writer.u32(ASSET_TYPE_NATIVE);
            }
            Asset::Credit { code, issuer } => {
                let (kind, width) = if code.len() <= 4 {
                    (ASSET_TYPE_CREDIT_ALPHANUM4, 4)
                } else {
                    (ASSET_TYPE_CREDIT_ALPHANUM12, 12)
                };
                let mut padded = code.as_bytes().to_vec();
                padded.resize(width, 0);
                writer.u32(kind).opaque_fixed(&padded).write(issuer);
            }
        }
    }
}

impl WriteXdr for BalanceId {
    fn write_xdr(&self, writer: &mut XdrWriter) {
        writer
            .u32(CLAIMABLE_BALANCE_ID_TYPE_V0)
            .opaque_fixed(self.hash());
    }
}

/// `Operation` with no per-operation source account.
impl WriteXdr for Operation {
    fn write_xdr(&self, writer: &mut XdrWriter) {
        writer.bool(false);
        match self {
            Operation::Payment {
                destination,
                asset,
                amount,
            } => {
                writer
                    .u32(OP_PAYMENT)
                    .write(&Muxed(destination))
                    .write(asset)
                    .i64(*amount);
            }
            Operation::ChangeTrust { asset, limit } => {
                writer.u32(OP_CHANGE_TRUST).write(asset).i64(*limit);
            }
            Operation::ClaimClaimableBalance { balance_id } => {
                writer.u32(OP_CLAIM_CLAIMABLE_BALANCE).write(balance_id);
            }
        }
    }
}
