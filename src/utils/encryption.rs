use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use rand::RngCore;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;

use crate::models::Credential;

type Nonce = [u8; 12];

const FORMAT_VERSION: u8 = 0x01;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Encryption failed: {0}")]
    Encryption(String),
    #[error("Decryption failed: {0}")]
    Decryption(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Encrypted credential given but no encryption key is configured")]
    MissingKey,
}

fn cipher_from_hex(key_hex: &str) -> Result<Aes256Gcm, CryptoError> {
    let key_bytes = hex::decode(key_hex)
        .map_err(|e| CryptoError::InvalidKey(format!("not hex: {}", e)))?;

    let key: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("Encryption key must be 32 bytes (256 bits)".to_string()))?;

    Ok(Aes256Gcm::new(&key.into()))
}

/// Encrypt a credential with AES256-GCM
///
/// Output is `enc:` followed by base64 of `[version_byte][nonce(12)][ciphertext]`.
pub fn encrypt_credential(secret: &str, key_hex: &str) -> Result<Credential, CryptoError> {
    let cipher = cipher_from_hex(key_hex)?;

    let mut nonce_bytes: Nonce = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt((&nonce_bytes).into(), secret.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut encrypted_data = Vec::with_capacity(1 + 12 + ciphertext.len());
    encrypted_data.push(FORMAT_VERSION);
    encrypted_data.extend_from_slice(&nonce_bytes);
    encrypted_data.extend_from_slice(&ciphertext);

    Ok(Credential::new(format!(
        "{}{}",
        Credential::ENCRYPTED_PREFIX,
        BASE64.encode(encrypted_data)
    )))
}

/// Decrypt an `enc:` credential back to its plain form
pub fn decrypt_credential(credential: &Credential, key_hex: &str) -> Result<Credential, CryptoError> {
    let encoded = credential
        .expose()
        .strip_prefix(Credential::ENCRYPTED_PREFIX)
        .ok_or_else(|| CryptoError::InvalidData("missing `enc:` prefix".to_string()))?;

    let encrypted_data = BASE64
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidData(format!("base64: {}", e)))?;

    if encrypted_data.len() < 13 {
        return Err(CryptoError::InvalidData(
            "Encrypted data too short (need at least 1 + 12 bytes for version + nonce)".to_string(),
        ));
    }

    let version = encrypted_data[0];
    if version != FORMAT_VERSION {
        return Err(CryptoError::InvalidData(format!(
            "Unsupported encryption version: {}",
            version
        )));
    }

    let nonce: Nonce = encrypted_data[1..13]
        .try_into()
        .map_err(|_| CryptoError::InvalidData("Failed to extract nonce".to_string()))?;
    let ciphertext = &encrypted_data[13..];

    let cipher = cipher_from_hex(key_hex)?;
    let plaintext = cipher
        .decrypt((&nonce).into(), ciphertext)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;

    String::from_utf8(plaintext)
        .map(Credential::new)
        .map_err(|e| CryptoError::InvalidData(format!("utf-8: {}", e)))
}

/// Return the plain credential, decrypting it first when it is `enc:`-prefixed
pub fn resolve_credential(credential: &Credential, key_hex: Option<&str>) -> Result<Credential, CryptoError> {
    if !credential.is_encrypted() {
        return Ok(credential.clone());
    }
    let key_hex = key_hex.ok_or(CryptoError::MissingKey)?;
    decrypt_credential(credential, key_hex)
}
