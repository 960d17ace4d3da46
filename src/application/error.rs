use thiserror::Error;

use crate::domain::CredentialError;
use crate::gateway::{GatewayError, ResultCodes};

/// Classified failure of a single operation. Nothing else leaves the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid secret key: {0}")]
    InvalidCredentialFormat(#[from] CredentialError),

    #[error("Could not load {subject}: {reason}")]
    AccountResolution { subject: String, reason: String },

    #[error("Transaction rejected by the ledger: {0}")]
    LedgerRejection(ResultCodes),

    #[error("Recipient not found: {destination} ({codes})")]
    RecipientNotFound {
        destination: String,
        codes: ResultCodes,
    },

    #[error("Ledger network error: {0}")]
    Transport(String),
}

impl AppError {
    /// Error raised while loading state an operation depends on.
    /// Missing records and transport failures are both fatal, with distinct reasons.
    pub(crate) fn resolution(subject: impl Into<String>, err: GatewayError) -> Self {
        let reason = match err {
            GatewayError::NotFound(_) => "not found on the ledger".to_string(),
            other => other.to_string(),
        };
        AppError::AccountResolution {
            subject: subject.into(),
            reason,
        }
    }

    /// Ledger result codes, when the failure carries them.
    pub fn result_codes(&self) -> Option<&ResultCodes> {
        match self {
            AppError::LedgerRejection(codes) | AppError::RecipientNotFound { codes, .. } => {
                Some(codes)
            }
            _ => None,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected(codes) => AppError::LedgerRejection(codes),
            other => AppError::Transport(other.to_string()),
        }
    }
}
