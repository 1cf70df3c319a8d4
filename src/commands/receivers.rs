use tokio::io::AsyncReadExt;

use crate::models::parse_receivers;

/// `parse-receivers <decimal>`: `address, amount` lines on stdin, JSON receivers on stdout
pub async fn execute(args: &[String]) -> Result<(), String> {
    let decimal: u32 = args
        .first()
        .ok_or("Usage: `ftsend parse-receivers <decimal>`".to_string())?
        .parse()
        .map_err(|_| "❌ Invalid decimal. Please provide a whole number.".to_string())?;

    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .map_err(|e| format!("Failed to read stdin: {}", e))?;

    let receivers = parse_receivers(&text, decimal).map_err(|e| format!("❌ {}", e))?;
    let json = serde_json::to_string(&receivers).map_err(|e| e.to_string())?;

    println!("{}", json);
    Ok(())
}
