//! Transfer request models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::receiver::Receiver;

/// Chain the token lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(format!("Unknown network: {}", other)),
        }
    }
}

/// A signing secret (WIF), possibly encrypted with an `enc:` prefix
///
/// Never printed: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub const ENCRYPTED_PREFIX: &'static str = "enc:";

    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn is_encrypted(&self) -> bool {
        self.0.starts_with(Self::ENCRYPTED_PREFIX)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

fn default_feeb() -> f64 {
    1.0
}

/// One token transfer as submitted by the host
///
/// Field names match the JSON the host sends (`requestId`, `senderWif`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[serde(default)]
    pub request_id: String,
    pub network: Network,
    pub purse: Credential,
    #[serde(default = "default_feeb")]
    pub feeb: f64,
    pub codehash: String,
    pub genesis: String,
    pub receivers: Vec<Receiver>,
    pub sender_wif: Credential,
    pub utxo_count: i64,
    /// Token symbol, only used to word failure logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}
