//! Turns a held secret seed into a public identity plus signing capability.

use ed25519_dalek::{Signer as _, SigningKey};
use thiserror::Error;
use zeroize::Zeroizing;

use super::strkey::{self, AccountId, KeyVersion, STRKEY_LEN, StrKeyError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("secret key is empty")]
    Empty,

    #[error("secret key must start with 'S'")]
    WrongSigil,

    #[error("secret key must be {expected} characters, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("secret key could not be decoded: {0}")]
    Undecodable(StrKeyError),
}

/// Signing capability derived from a secret seed.
///
/// Never persisted; dropped as soon as the request that supplied it ends.
pub struct Keypair {
    signing_key: SigningKey,
    account_id: AccountId,
}

impl Keypair {
    /// Validate and decode a secret seed.
    ///
    /// Structural checks (non-empty, sigil, length) run before any decoding.
    pub fn from_secret(secret: &str) -> Result<Self, CredentialError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(CredentialError::Empty);
        }
        if !secret.starts_with(KeyVersion::SecretSeed.prefix()) {
            return Err(CredentialError::WrongSigil);
        }
        if secret.len() != STRKEY_LEN {
            return Err(CredentialError::WrongLength {
                expected: STRKEY_LEN,
                actual: secret.len(),
            });
        }

        let seed = Zeroizing::new(
            strkey::decode(KeyVersion::SecretSeed, secret).map_err(CredentialError::Undecodable)?,
        );
        let signing_key = SigningKey::from_bytes(&seed);
        let account_id = AccountId::from_public_key(&signing_key.verifying_key().to_bytes());

        Ok(Self {
            signing_key,
            account_id,
        })
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Last four bytes of the public key, used as the signature hint.
    pub fn signature_hint(&self) -> [u8; 4] {
        let key = self.account_id.public_key();
        [key[28], key[29], key[30], key[31]]
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}
