//! StrKey encoding: the base32 text form of ledger keys.
//!
//! A StrKey is `base32(version ‖ payload ‖ crc16)` where the checksum is
//! CRC16-XModem over `version ‖ payload`, stored little-endian.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of an encoded ed25519 StrKey.
pub const STRKEY_LEN: usize = 56;

const ALPHABET: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVersion {
    /// `G...` account ids
    AccountId,
    /// `S...` secret seeds
    SecretSeed,
}

impl KeyVersion {
    fn byte(self) -> u8 {
        match self {
            KeyVersion::AccountId => 6 << 3,
            KeyVersion::SecretSeed => 18 << 3,
        }
    }

    /// The leading character every key of this version starts with.
    pub fn prefix(self) -> char {
        match self {
            KeyVersion::AccountId => 'G',
            KeyVersion::SecretSeed => 'S',
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrKeyError {
    #[error("expected {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("key must start with '{0}'")]
    InvalidPrefix(char),

    #[error("key is not valid base32")]
    InvalidEncoding,

    #[error("unexpected version byte")]
    InvalidVersion,

    #[error("checksum mismatch")]
    InvalidChecksum,
}

/// CRC16-XModem (poly 0x1021, init 0).
const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);

fn checksum(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Encode a 32-byte payload as a StrKey of the given version.
pub fn encode(version: KeyVersion, payload: &[u8; 32]) -> String {
    let mut raw = Vec::with_capacity(35);
    raw.push(version.byte());
    raw.extend_from_slice(payload);
    let crc = checksum(&raw);
    raw.extend_from_slice(&crc.to_le_bytes());
    base32::encode(ALPHABET, &raw)
}

/// Decode a StrKey, verifying length, prefix, version byte and checksum.
pub fn decode(version: KeyVersion, input: &str) -> Result<[u8; 32], StrKeyError> {
    if input.len() != STRKEY_LEN {
        return Err(StrKeyError::InvalidLength {
            expected: STRKEY_LEN,
            actual: input.len(),
        });
    }
    if !input.starts_with(version.prefix()) {
        return Err(StrKeyError::InvalidPrefix(version.prefix()));
    }

    let raw = base32::decode(ALPHABET, input).ok_or(StrKeyError::InvalidEncoding)?;
    if raw.len() != 35 {
        return Err(StrKeyError::InvalidEncoding);
    }
    if raw[0] != version.byte() {
        return Err(StrKeyError::InvalidVersion);
    }

    let (body, stored) = raw.split_at(33);
    if stored != checksum(body).to_le_bytes() {
        return Err(StrKeyError::InvalidChecksum);
    }

    let mut payload = [0u8; 32];
    payload.copy_from_slice(&body[1..]);
    Ok(payload)
}

/// A validated `G...` account id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId {
    encoded: String,
    key: [u8; 32],
}

impl AccountId {
    pub fn from_public_key(key: &[u8; 32]) -> Self {
        Self {
            encoded: encode(KeyVersion::AccountId, key),
            key: *key,
        }
    }

    /// Raw ed25519 public key bytes.
    pub fn public_key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Shortened form for display, e.g. `GABC1234...`.
    pub fn short(&self) -> String {
        format!("{}...", &self.encoded[..8])
    }
}

impl FromStr for AccountId {
    type Err = StrKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let key = decode(KeyVersion::AccountId, s)?;
        Ok(Self {
            encoded: s.to_string(),
            key,
        })
    }
}

impl TryFrom<String> for AccountId {
    type Error = StrKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.encoded
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_ACCOUNT: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";

    #[test]
    fn test_crc16_check_value() {
        assert_eq!(checksum(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_encode_known_keys() {
        assert_eq!(encode(KeyVersion::AccountId, &[0u8; 32]), ZERO_ACCOUNT);
        assert_eq!(
            encode(KeyVersion::SecretSeed, &[0u8; 32]),
            "SAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAABSU2"
        );
    }

    #[test]
    fn test_decode_roundtrip() {
        let payload: [u8; 32] = std::array::from_fn(|i| i as u8);
        let encoded = encode(KeyVersion::SecretSeed, &payload);
        assert_eq!(
            encoded,
            "SAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6NKI"
        );
        assert_eq!(decode(KeyVersion::SecretSeed, &encoded), Ok(payload));
    }

    #[test]
    fn test_decode_rejects_wrong_version() {
        assert_eq!(
            decode(KeyVersion::SecretSeed, ZERO_ACCOUNT),
            Err(StrKeyError::InvalidPrefix('S'))
        );
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let tampered = format!("{}A", &ZERO_ACCOUNT[..55]);
        assert!(decode(KeyVersion::AccountId, &tampered).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage_body() {
        let garbage = format!("S{}", "A".repeat(55));
        assert!(decode(KeyVersion::SecretSeed, &garbage).is_err());
    }

    #[test]
    fn test_account_id_parse() {
        let id: AccountId = ZERO_ACCOUNT.parse().unwrap();
        assert_eq!(id.public_key(), &[0u8; 32]);
        assert_eq!(id.short(), "GAAAAAAA...");
        assert!("GABC".parse::<AccountId>().is_err());
    }
}
