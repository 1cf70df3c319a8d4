//! Runtime configuration, read from the environment (and `.env`)

use thiserror::Error;

use crate::services::consolidation::{ConsolidationMode, ConsolidationPolicy};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {name}=`{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(name: &'static str, value: &str, reason: &str) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Where and how to reach the FT management service
#[derive(Debug, Clone)]
pub struct FtApiConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    /// Requests per second
    pub rate_limit: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ft_api: FtApiConfig,
    pub policy: ConsolidationPolicy,
    /// Hex AES-256 key for `enc:` credentials
    pub credential_key: Option<String>,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:3000";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_RATE_LIMIT: usize = 20;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ft_api = FtApiConfig {
            base_url: get("FT_API_BASE_URL").unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            api_token: get("FT_API_TOKEN"),
            timeout_secs: parse_or("FT_API_TIMEOUT_SECS", get("FT_API_TIMEOUT_SECS"), Self::DEFAULT_TIMEOUT_SECS)?,
            rate_limit: parse_or("FT_API_RATE_LIMIT", get("FT_API_RATE_LIMIT"), Self::DEFAULT_RATE_LIMIT)?,
        };
        if ft_api.rate_limit == 0 {
            return Err(ConfigError::invalid("FT_API_RATE_LIMIT", "0", "must be greater than 0"));
        }

        let tiers = match get("CONSOLIDATION_TIERS") {
            Some(table) => ConsolidationPolicy::parse_tiers(&table)?,
            None => ConsolidationPolicy::default_tiers(),
        };
        let batch_size = parse_or(
            "MERGE_BATCH_SIZE",
            get("MERGE_BATCH_SIZE"),
            ConsolidationPolicy::DEFAULT_BATCH_SIZE,
        )?;
        let mode = match get("CONSOLIDATION_MODE") {
            Some(raw) => raw
                .parse::<ConsolidationMode>()
                .map_err(|reason| ConfigError::invalid("CONSOLIDATION_MODE", &raw, &reason))?,
            None => ConsolidationMode::default(),
        };
        let purse_max_unspents = parse_or(
            "PURSE_MAX_UNSPENTS",
            get("PURSE_MAX_UNSPENTS"),
            ConsolidationPolicy::DEFAULT_PURSE_MAX_UNSPENTS,
        )?;
        let policy = ConsolidationPolicy::new(tiers, batch_size, mode)?.with_purse_max_unspents(purse_max_unspents);

        Ok(Self {
            ft_api,
            policy,
            credential_key: get("CREDENTIAL_ENCRYPTION_KEY"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::invalid(name, &raw, "not a valid number")),
        None => Ok(default),
    }
}
