//! The FT management collaborator
//!
//! Transaction building, UTXO selection, signing and broadcast all happen on
//! the other side of this seam. A session is opened per transfer invocation
//! with the network, fee purse and fee rate fixed for its lifetime.

pub mod client;
pub mod models;

use async_trait::async_trait;

use crate::models::{Credential, Network, Receiver};

pub use client::FtApiClient;
pub use models::{ApiError, FtBalance, TransferReceipt};

/// What a session is constructed from
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub network: Network,
    pub purse: Credential,
    pub feeb: f64,
}

#[async_trait]
pub trait FtManager: Send + Sync {
    /// Fold the fee purse's unspents into one output if it holds more than
    /// `max_unspents`; returns the merge txid when one was broadcast
    async fn merge_purse(&self, max_unspents: u64) -> Result<Option<String>, ApiError>;

    /// Consolidate the owner's UTXOs of one token into fewer outputs
    async fn merge(&self, codehash: &str, genesis: &str, owner: &Credential) -> Result<(), ApiError>;

    /// Send the token to every receiver in one transaction
    async fn transfer(
        &self,
        codehash: &str,
        genesis: &str,
        receivers: &[Receiver],
        sender: &Credential,
    ) -> Result<TransferReceipt, ApiError>;

    /// Current number of the owner's UTXOs for one token
    async fn utxo_count(&self, codehash: &str, genesis: &str, owner: &Credential) -> Result<u64, ApiError>;
}

pub trait FtManagerFactory: Send + Sync {
    fn session(&self, params: SessionParams) -> Result<Box<dyn FtManager>, ApiError>;
}
