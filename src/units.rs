//! Raw-unit formatting and parsing
//!
//! Token amounts are carried as raw `U256` everywhere; these helpers exist
//! only at the CLI/reporting boundary. Parsing is integer-exact, no floats.

use crate::{Error, Result};
use alloy::primitives::U256;
use std::str::FromStr;

/// Format a raw value with the given number of decimals
pub fn format_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = remainder_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

/// Parse a human-readable decimal amount into raw units
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(Error::Precondition(format!("invalid amount: {:?}", amount)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Precondition(format!("invalid amount: {:?}", amount)));
    }
    if frac.len() > decimals as usize {
        return Err(Error::Precondition(format!(
            "amount {} has more than {} decimal places",
            amount, decimals
        )));
    }

    let scale = U256::from(10).pow(U256::from(decimals));
    let whole_part = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str(whole).map_err(|e| Error::Precondition(format!("invalid amount: {}", e)))?
    };
    let frac_part = if frac.is_empty() {
        U256::ZERO
    } else {
        let padding = U256::from(10).pow(U256::from(decimals as usize - frac.len()));
        U256::from_str(frac).map_err(|e| Error::Precondition(format!("invalid amount: {}", e)))?
            * padding
    };

    whole_part
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_part))
        .ok_or_else(|| Error::Precondition(format!("amount {} overflows", amount)))
}
