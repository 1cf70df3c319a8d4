//! Transfer receivers and the `address, amount` list format

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most receivers a single transfer may carry
pub const MAX_RECEIVERS: usize = 99;

/// One destination of a token transfer
///
/// `amount` is a string of integer base units, which is what the FT
/// management service expects on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub address: String,
    pub amount: String,
}

impl Receiver {
    pub fn new(address: impl Into<String>, amount: u128) -> Self {
        Self {
            address: address.into(),
            amount: amount.to_string(),
        }
    }

    /// Amount in base units, if the wire string is a well-formed positive integer
    pub fn base_units(&self) -> Option<u128> {
        if self.amount.is_empty() || !self.amount.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.amount.parse::<u128>().ok().filter(|v| *v > 0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReceiverParseError {
    #[error("No receivers given")]
    Empty,
    #[error("Too many receivers: {0} (max {max})", max = MAX_RECEIVERS)]
    TooMany(usize),
    #[error("Line {line}: expected `address, amount`")]
    Malformed { line: usize },
    #[error("Line {line}: invalid address `{address}`")]
    InvalidAddress { line: usize, address: String },
    #[error("Line {line}: invalid amount `{amount}` (at most {decimal} decimal places)")]
    InvalidAmount { line: usize, amount: String, decimal: u32 },
    #[error("Line {line}: amount must be greater than 0")]
    NonPositiveAmount { line: usize },
}

/// Parse a block of `address, amount` lines into receivers
///
/// Amounts are in display units and are scaled by `10^decimal`. Both the
/// ASCII comma and the full-width comma separate the columns. Blank lines
/// are ignored.
pub fn parse_receivers(text: &str, decimal: u32) -> Result<Vec<Receiver>, ReceiverParseError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(ReceiverParseError::Empty);
    }
    if lines.len() > MAX_RECEIVERS {
        return Err(ReceiverParseError::TooMany(lines.len()));
    }

    let mut receivers = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let (address, amount) = line
            .split_once(|c| c == ',' || c == '，')
            .ok_or(ReceiverParseError::Malformed { line: line_no })?;

        let address = address.trim();
        if !is_plausible_address(address) {
            return Err(ReceiverParseError::InvalidAddress {
                line: line_no,
                address: address.to_string(),
            });
        }

        let amount = amount.trim();
        let units = to_base_units(amount, decimal).ok_or_else(|| ReceiverParseError::InvalidAmount {
            line: line_no,
            amount: amount.to_string(),
            decimal,
        })?;
        if units == 0 {
            return Err(ReceiverParseError::NonPositiveAmount { line: line_no });
        }

        receivers.push(Receiver::new(address, units));
    }

    Ok(receivers)
}

/// Convert a display amount such as `12.5` into integer base units
///
/// Returns `None` for anything that is not a plain decimal number, has more
/// fractional digits than `decimal`, or overflows.
pub fn to_base_units(amount: &str, decimal: u32) -> Option<u128> {
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if amount.contains('.') && frac.is_empty() {
        return None;
    }
    if frac.len() > decimal as usize || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let scale = 10u128.checked_pow(decimal)?;
    let whole: u128 = whole.parse().ok()?;
    let frac_units: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimal as usize);
        padded.parse().ok()?
    };

    whole.checked_mul(scale)?.checked_add(frac_units)
}

/// Addresses are opaque to us; reject only what can never be one
pub fn is_plausible_address(address: &str) -> bool {
    !address.is_empty() && !address.chars().any(char::is_whitespace)
}
