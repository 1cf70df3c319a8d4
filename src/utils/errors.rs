use thiserror::Error;

use crate::api::ft_manager::ApiError;
use crate::models::TransferResult;
use crate::utils::encryption::CryptoError;

/// Request failed local validation
pub const VALIDATION_ERROR_CODE: i64 = -400;
/// A merge did not reduce the re-queried UTXO count
pub const NO_PROGRESS_ERROR_CODE: i64 = -409;
/// Anything raised locally that is not the request's fault
pub const INTERNAL_ERROR_CODE: i64 = -500;

/// FT service: not enough native coin in the purse to pay fees
pub const INSUFFICIENT_FEE_CODE: i64 = -200;
/// FT service: not enough tokens held by the sender
pub const INSUFFICIENT_TOKEN_CODE: i64 = -201;

/// Errors raised by one transfer invocation
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Merge failed ({code}): {message}")]
    Consolidation { code: i64, message: String },

    #[error("Transfer failed ({code}): {message}")]
    Transfer { code: i64, message: String },

    #[error("FT manager unavailable: {0}")]
    Unavailable(String),

    #[error("Credential error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Callback delivery failed: {0}")]
    Bridge(String),
}

impl TransferError {
    pub fn consolidation(err: ApiError) -> Self {
        TransferError::Consolidation {
            code: err.code(),
            message: err.message(),
        }
    }

    pub fn transfer(err: ApiError) -> Self {
        TransferError::Transfer {
            code: err.code(),
            message: err.message(),
        }
    }

    /// Code reported to the host
    pub fn code(&self) -> i64 {
        match self {
            TransferError::Validation(_) => VALIDATION_ERROR_CODE,
            TransferError::Consolidation { code, .. } | TransferError::Transfer { code, .. } => *code,
            TransferError::Unavailable(_) | TransferError::Crypto(_) | TransferError::Bridge(_) => {
                INTERNAL_ERROR_CODE
            }
        }
    }

    /// Message reported to the host
    ///
    /// Collaborator failures keep the collaborator's own message verbatim.
    pub fn message(&self) -> String {
        match self {
            TransferError::Consolidation { message, .. } | TransferError::Transfer { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Human-readable text for a wallet UI, with the well-known balance codes spelled out
    pub fn user_message(&self, token_symbol: &str) -> String {
        match self.code() {
            INSUFFICIENT_FEE_CODE => "Insufficient SPACE".to_string(),
            INSUFFICIENT_TOKEN_CODE => format!("Insufficient {}", token_symbol),
            _ => self.message(),
        }
    }
}

impl From<&TransferError> for TransferResult {
    fn from(err: &TransferError) -> Self {
        TransferResult::failure(err.code(), err.message())
    }
}
