use std::io::BufRead;

use crate::config::Config;
use crate::utils::encrypt_credential;

/// `encrypt-credential [<wif>]`; reads the secret from stdin when omitted
pub fn execute(config: &Config, args: &[String]) -> Result<(), String> {
    let key = config
        .credential_key
        .as_deref()
        .ok_or("CREDENTIAL_ENCRYPTION_KEY not set in environment".to_string())?;

    let secret = match args.first() {
        Some(secret) => secret.trim().to_string(),
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            line.trim().to_string()
        }
    };

    if secret.is_empty() {
        return Err("Nothing to encrypt".to_string());
    }

    let encrypted = encrypt_credential(&secret, key).map_err(|e| e.to_string())?;
    println!("{}", encrypted.expose());
    Ok(())
}
