use crate::api::ft_manager::FtApiClient;
use crate::config::Config;
use crate::models::Network;
use crate::services::balance_service::{self, BalanceView};

/// `balance <network> <address> [<codehash> <genesis>]`
pub async fn execute(config: &Config, args: &[String]) -> Result<(), String> {
    if args.len() != 2 && args.len() != 4 {
        return Err("Usage: `ftsend balance <network> <address> [<codehash> <genesis>]`".to_string());
    }

    let network: Network = args[0].parse()?;
    let address = &args[1];

    let client = FtApiClient::new(&config.ft_api).map_err(|e| e.to_string())?;
    let balances = balance_service::get_balances(&client, network, address)
        .await
        .map_err(|e| format!("Failed to fetch balances: {}", e))?;

    let output = if let [_, _, codehash, genesis] = args {
        let token = balance_service::find_token(&balances, codehash, genesis)
            .ok_or_else(|| format!("{} holds no token {}/{}", address, codehash, genesis))?;
        serde_json::to_string_pretty(&BalanceView::from(token))
    } else {
        let views: Vec<BalanceView> = balances.iter().map(BalanceView::from).collect();
        serde_json::to_string_pretty(&views)
    }
    .map_err(|e| e.to_string())?;

    println!("{}", output);
    Ok(())
}
