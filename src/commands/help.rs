pub const USAGE: &str = "\
ftsend - fungible token transfer bridge

Commands:
  send                          Read JSON transfer requests from stdin (one per line),
                                write result payloads to stdout (default)
  balance <network> <address> [<codehash> <genesis>]
                                List token balances and UTXO counts for an address
  parse-receivers <decimal>     Turn `address, amount` lines on stdin into receivers JSON
  encrypt-credential [<wif>]    Encrypt a credential with CREDENTIAL_ENCRYPTION_KEY
  help                          Show this help message

Environment:
  FT_API_BASE_URL, FT_API_TOKEN, FT_API_TIMEOUT_SECS, FT_API_RATE_LIMIT,
  CONSOLIDATION_TIERS (default 5:20,12:8,*:3), MERGE_BATCH_SIZE (default 19),
  CONSOLIDATION_MODE (estimate|requery), PURSE_MAX_UNSPENTS (default 3),
  CREDENTIAL_ENCRYPTION_KEY, RUST_LOG";

pub fn execute() -> Result<(), String> {
    println!("{}", USAGE);
    Ok(())
}
