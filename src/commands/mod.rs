pub mod balance;
pub mod encrypt;
pub mod help;
pub mod receivers;
pub mod send;

use tracing::error;

use crate::config::Config;

/// Dispatch a command line (without the program name)
pub async fn run(args: &[String], config: &Config) -> Result<(), String> {
    let command = args.first().map(String::as_str).unwrap_or("send");
    let rest = args.get(1..).unwrap_or(&[]);

    let result = match command {
        "send" | "serve" => send::execute(config).await,
        "balance" | "bal" => balance::execute(config, rest).await,
        "parse-receivers" => receivers::execute(rest).await,
        "encrypt-credential" | "encrypt" => encrypt::execute(config, rest),
        "help" | "--help" | "-h" => help::execute(),
        other => Err(format!("Unknown command `{}`\n\n{}", other, help::USAGE)),
    };

    if let Err(e) = &result {
        error!("Error executing command {}: {}", command, e);
    }
    result
}
