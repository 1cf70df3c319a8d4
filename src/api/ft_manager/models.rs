use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Network, Receiver};

/// Body for POST /ft/merge
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest<'a> {
    pub network: Network,
    pub purse: &'a str,
    pub feeb: f64,
    pub codehash: &'a str,
    pub genesis: &'a str,
    pub owner_wif: &'a str,
}

/// Body for POST /purse/merge
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurseMergeRequest<'a> {
    pub network: Network,
    pub purse: &'a str,
    pub feeb: f64,
    pub max_unspents: u64,
}

/// Body for POST /ft/transfer
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequestBody<'a> {
    pub network: Network,
    pub purse: &'a str,
    pub feeb: f64,
    pub codehash: &'a str,
    pub genesis: &'a str,
    pub receivers: &'a [Receiver],
    pub sender_wif: &'a str,
}

/// Body for POST /ft/utxo-count
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoCountRequest<'a> {
    pub network: Network,
    pub codehash: &'a str,
    pub genesis: &'a str,
    pub owner_wif: &'a str,
}

/// Response from POST /ft/merge and /purse/merge; the txid is present when
/// a merge was broadcast
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeResponse {
    #[serde(default)]
    pub txid: Option<String>,
}

/// Response from POST /ft/transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub txid: String,
}

/// Response from POST /ft/utxo-count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoCountResponse {
    pub utxo_count: u64,
}

/// One token held by an address, as listed by the balance endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtBalance {
    pub code_hash: String,
    pub genesis: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimal: u32,
    #[serde(default)]
    pub utxo_count: u64,
    #[serde(default)]
    pub confirmed_string: String,
    #[serde(default)]
    pub unconfirmed_string: String,
}

impl FtBalance {
    /// Confirmed plus unconfirmed amount, in base units
    pub fn total_units(&self) -> Option<i128> {
        let confirmed: i128 = parse_units(&self.confirmed_string)?;
        let unconfirmed: i128 = parse_units(&self.unconfirmed_string)?;
        confirmed.checked_add(unconfirmed)
    }
}

fn parse_units(s: &str) -> Option<i128> {
    if s.is_empty() {
        Some(0)
    } else {
        s.parse().ok()
    }
}

/// Error body returned by the FT service on failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// Error type for FT service operations
///
/// Every variant maps onto the numeric code / message pair the host sees.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The service ran the operation and reported a failure
    #[error("{message} (code {code})")]
    Rejected { code: i64, message: String },
    /// Non-2xx response without a structured error body
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    /// Network/request error
    #[error("Request Error: {0}")]
    RequestError(String),
    /// Deserialization error
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
}

impl ApiError {
    pub fn code(&self) -> i64 {
        match self {
            ApiError::Rejected { code, .. } => *code,
            ApiError::HttpError(status, _) => -i64::from(*status),
            ApiError::RequestError(_) => -1,
            ApiError::DeserializationError(_) => -2,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
