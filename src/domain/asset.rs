use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::strkey::AccountId;

/// Display code used for the native asset.
pub const NATIVE_CODE: &str = "XLM";

/// An asset identifier: the native asset, or a code issued by an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Asset {
    Native,
    Credit { code: String, issuer: AccountId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset code must be 1-12 alphanumeric characters: '{0}'")]
    InvalidCode(String),

    #[error("invalid asset issuer '{0}'")]
    InvalidIssuer(String),

    #[error("expected 'native' or 'CODE:ISSUER', got '{0}'")]
    InvalidFormat(String),
}

impl Asset {
    /// Build a credit asset, validating code and issuer.
    pub fn credit(code: &str, issuer: &str) -> Result<Self, AssetError> {
        let code = code.trim();
        if code.is_empty() || code.len() > 12 || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AssetError::InvalidCode(code.to_string()));
        }
        let issuer = issuer
            .parse::<AccountId>()
            .map_err(|_| AssetError::InvalidIssuer(issuer.trim().to_string()))?;
        Ok(Asset::Credit {
            code: code.to_string(),
            issuer,
        })
    }

    /// Strict parse of `native`, `XLM` or `CODE:ISSUER`. Used for user input.
    pub fn parse(input: &str) -> Result<Self, AssetError> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("native") || input.eq_ignore_ascii_case(NATIVE_CODE) {
            return Ok(Asset::Native);
        }
        match input.split_once(':') {
            Some((code, issuer)) if !issuer.contains(':') => Self::credit(code, issuer),
            _ => Err(AssetError::InvalidFormat(input.to_string())),
        }
    }

    /// Lenient parse used for ledger records: anything malformed is treated
    /// as the native asset instead of failing.
    pub fn parse_lenient(input: &str) -> Self {
        Self::parse(input).unwrap_or(Asset::Native)
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    pub fn code(&self) -> &str {
        match self {
            Asset::Native => NATIVE_CODE,
            Asset::Credit { code, .. } => code,
        }
    }

    pub fn issuer(&self) -> Option<&AccountId> {
        match self {
            Asset::Native => None,
            Asset::Credit { issuer, .. } => Some(issuer),
        }
    }

    /// Canonical text form: `native` or `CODE:ISSUER`.
    pub fn key(&self) -> String {
        match self {
            Asset::Native => "native".to_string(),
            Asset::Credit { code, issuer } => format!("{}:{}", code, issuer),
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Native => write!(f, "{}", NATIVE_CODE),
            Asset::Credit { code, issuer } => write!(f, "{} ({})", code, issuer.short()),
        }
    }
}
