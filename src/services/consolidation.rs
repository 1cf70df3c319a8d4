//! UTXO consolidation policy
//!
//! Fewer receivers can live with many small UTXOs; many receivers need the
//! holder's tokens concentrated so the transfer's input count stays bounded.

use std::str::FromStr;

use crate::config::ConfigError;

/// Receiver-count bracket and the UTXO count to merge down to for it
///
/// `max_receivers: None` is the catch-all bracket and must come last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    pub max_receivers: Option<usize>,
    pub target: u64,
}

/// How the remaining UTXO count is tracked between merges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsolidationMode {
    /// Subtract the batch size after every merge
    #[default]
    Estimate,
    /// Ask the FT service for the real count after every merge
    Requery,
}

impl FromStr for ConsolidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "estimate" => Ok(ConsolidationMode::Estimate),
            "requery" => Ok(ConsolidationMode::Requery),
            other => Err(format!("expected `estimate` or `requery`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationPolicy {
    tiers: Vec<Tier>,
    batch_size: u64,
    mode: ConsolidationMode,
    purse_max_unspents: u64,
}

impl Default for ConsolidationPolicy {
    fn default() -> Self {
        Self {
            tiers: Self::default_tiers(),
            batch_size: Self::DEFAULT_BATCH_SIZE,
            mode: ConsolidationMode::Estimate,
            purse_max_unspents: Self::DEFAULT_PURSE_MAX_UNSPENTS,
        }
    }
}

impl ConsolidationPolicy {
    /// UTXOs assumed folded into one per merge call
    pub const DEFAULT_BATCH_SIZE: u64 = 19;
    pub const DEFAULT_TIERS: &'static str = "5:20,12:8,*:3";
    /// Fee purse unspents tolerated before they are merged into one
    pub const DEFAULT_PURSE_MAX_UNSPENTS: u64 = 3;

    pub fn default_tiers() -> Vec<Tier> {
        vec![
            Tier { max_receivers: Some(5), target: 20 },
            Tier { max_receivers: Some(12), target: 8 },
            Tier { max_receivers: None, target: 3 },
        ]
    }

    pub fn new(tiers: Vec<Tier>, batch_size: u64, mode: ConsolidationMode) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::invalid("MERGE_BATCH_SIZE", "0", "must be greater than 0"));
        }
        validate_tiers(&tiers)?;
        Ok(Self {
            tiers,
            batch_size,
            mode,
            purse_max_unspents: Self::DEFAULT_PURSE_MAX_UNSPENTS,
        })
    }

    pub fn with_purse_max_unspents(mut self, max: u64) -> Self {
        self.purse_max_unspents = max;
        self
    }

    pub fn purse_max_unspents(&self) -> u64 {
        self.purse_max_unspents
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn mode(&self) -> ConsolidationMode {
        self.mode
    }

    /// UTXO count to consolidate down to before sending to `receivers` receivers
    pub fn target_for(&self, receivers: usize) -> u64 {
        self.tiers
            .iter()
            .find(|tier| tier.max_receivers.map_or(true, |max| receivers <= max))
            .map(|tier| tier.target)
            // tiers always end with the catch-all
            .unwrap_or(0)
    }

    /// Merge calls the estimate mode makes to get from `utxo_count` to `target`
    pub fn merges_needed(&self, utxo_count: u64, target: u64) -> u64 {
        if utxo_count <= target {
            0
        } else {
            (utxo_count - target).div_ceil(self.batch_size)
        }
    }

    /// Parse a tier table such as `5:20,12:8,*:3`
    pub fn parse_tiers(table: &str) -> Result<Vec<Tier>, ConfigError> {
        let mut tiers = Vec::new();
        for entry in table.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (max, target) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::invalid("CONSOLIDATION_TIERS", table, "entries must be `max:target`"))?;

            let max_receivers = match max.trim() {
                "*" => None,
                n => Some(n.parse::<usize>().map_err(|_| {
                    ConfigError::invalid("CONSOLIDATION_TIERS", table, "receiver bound must be a number or `*`")
                })?),
            };
            let target = target.trim().parse::<u64>().map_err(|_| {
                ConfigError::invalid("CONSOLIDATION_TIERS", table, "target must be a number")
            })?;

            tiers.push(Tier { max_receivers, target });
        }

        validate_tiers(&tiers)?;
        Ok(tiers)
    }
}

fn validate_tiers(tiers: &[Tier]) -> Result<(), ConfigError> {
    let describe = || {
        tiers
            .iter()
            .map(|t| match t.max_receivers {
                Some(m) => format!("{}:{}", m, t.target),
                None => format!("*:{}", t.target),
            })
            .collect::<Vec<_>>()
            .join(",")
    };

    match tiers.last() {
        Some(Tier { max_receivers: None, .. }) => {}
        _ => {
            return Err(ConfigError::invalid(
                "CONSOLIDATION_TIERS",
                &describe(),
                "last tier must be the `*` catch-all",
            ))
        }
    }

    let bounds: Vec<usize> = tiers.iter().filter_map(|t| t.max_receivers).collect();
    if bounds.len() != tiers.len() - 1 || bounds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ConfigError::invalid(
            "CONSOLIDATION_TIERS",
            &describe(),
            "receiver bounds must be strictly increasing with a single `*` at the end",
        ));
    }

    Ok(())
}
