//! Transfer outcome models, as delivered to the host

use serde::{Deserialize, Serialize};

/// Outcome of one transfer invocation
///
/// Serializes as `{code: 0, message: "OK", transactionId}` on success and
/// `{code, message}` on failure. A code-0 body without a `transactionId` is
/// rejected when parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ResultBody", try_from = "ResultBody")]
pub enum TransferResult {
    Success { transaction_id: String },
    Failure { code: i64, message: String },
}

impl TransferResult {
    pub const SUCCESS_CODE: i64 = 0;
    pub const SUCCESS_MESSAGE: &'static str = "OK";

    pub fn success(transaction_id: impl Into<String>) -> Self {
        TransferResult::Success {
            transaction_id: transaction_id.into(),
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        TransferResult::Failure {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            TransferResult::Success { .. } => Self::SUCCESS_CODE,
            TransferResult::Failure { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TransferResult::Success { .. } => Self::SUCCESS_MESSAGE,
            TransferResult::Failure { message, .. } => message,
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            TransferResult::Success { transaction_id } => Some(transaction_id),
            TransferResult::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultBody {
    code: i64,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
}

impl From<TransferResult> for ResultBody {
    fn from(result: TransferResult) -> Self {
        match result {
            TransferResult::Success { transaction_id } => ResultBody {
                code: TransferResult::SUCCESS_CODE,
                message: TransferResult::SUCCESS_MESSAGE.to_string(),
                transaction_id: Some(transaction_id),
            },
            TransferResult::Failure { code, message } => ResultBody {
                code,
                message,
                transaction_id: None,
            },
        }
    }
}

impl TryFrom<ResultBody> for TransferResult {
    type Error = String;

    fn try_from(body: ResultBody) -> Result<Self, Self::Error> {
        match (body.code, body.transaction_id) {
            (TransferResult::SUCCESS_CODE, Some(transaction_id)) => Ok(TransferResult::Success { transaction_id }),
            (TransferResult::SUCCESS_CODE, None) => Err("code 0 result without transactionId".to_string()),
            (code, _) => Ok(TransferResult::Failure {
                code,
                message: body.message,
            }),
        }
    }
}

/// The single message handed to the callback bridge per invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub request_id: String,
    pub result: TransferResult,
}

impl CallbackPayload {
    pub fn new(request_id: impl Into<String>, result: TransferResult) -> Self {
        Self {
            request_id: request_id.into(),
            result,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
impl TransferResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferResult::Success { .. })
    }
}
