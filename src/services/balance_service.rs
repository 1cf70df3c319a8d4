use serde::Serialize;

use crate::api::ft_manager::{ApiError, FtApiClient, FtBalance};
use crate::models::Network;

/// A token balance as printed by the `balance` command
#[derive(Debug, Serialize)]
pub struct BalanceView<'a> {
    #[serde(flatten)]
    pub balance: &'a FtBalance,
    /// Confirmed plus unconfirmed, in base units; absent if the service sent garbage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
}

impl<'a> From<&'a FtBalance> for BalanceView<'a> {
    fn from(balance: &'a FtBalance) -> Self {
        Self {
            balance,
            total: balance.total_units().map(|t| t.to_string()),
        }
    }
}

/// List the tokens an address holds
pub async fn get_balances(
    client: &FtApiClient,
    network: Network,
    address: &str,
) -> Result<Vec<FtBalance>, ApiError> {
    let balances = client.balances(network, address).await?;
    tracing::debug!("{} holds {} tokens on {}", address, balances.len(), network);
    Ok(balances)
}

/// Pick one token out of a balance listing by its contract identity
pub fn find_token<'a>(balances: &'a [FtBalance], codehash: &str, genesis: &str) -> Option<&'a FtBalance> {
    balances
        .iter()
        .find(|b| b.code_hash == codehash && b.genesis == genesis)
}
