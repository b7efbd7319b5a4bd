//! Exact conversion between major-unit decimal strings and wei.
//!
//! Prices cross the contract boundary as integers in the smallest currency
//! unit and are shown to the user as decimal strings in the major unit. Both
//! directions are exact: no floating point is involved anywhere.

use alloy_primitives::U256;

/// Decimal places of the native currency's smallest unit.
pub const ETH_DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount: {0}")]
    Invalid(String),

    #[error("amount has more than {ETH_DECIMALS} decimal places")]
    TooManyDecimals,

    #[error("amount is too large")]
    Overflow,
}

fn wei_per_eth() -> U256 {
    U256::from(1_000_000_000_000_000_000u64)
}

/// Parse a decimal major-unit amount (e.g. `"0.01"`) into wei.
pub fn parse_eth(input: &str) -> Result<U256, UnitsError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Invalid(input.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(UnitsError::Invalid(input.to_string()));
    }
    if frac.len() > ETH_DECIMALS {
        return Err(UnitsError::TooManyDecimals);
    }

    let whole_wei = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10)
            .map_err(|_| UnitsError::Overflow)?
            .checked_mul(wei_per_eth())
            .ok_or(UnitsError::Overflow)?
    };

    let frac_wei = if frac.is_empty() {
        U256::ZERO
    } else {
        // Right-pad to 18 digits: "01" -> 0.01 ETH -> 10^16 wei.
        let padded = format!("{frac:0<width$}", width = ETH_DECIMALS);
        U256::from_str_radix(&padded, 10).map_err(|_| UnitsError::Overflow)?
    };

    whole_wei.checked_add(frac_wei).ok_or(UnitsError::Overflow)
}

/// Format a wei amount as a major-unit decimal string, trimming trailing
/// zeros so that values produced by [`parse_eth`] round-trip exactly.
pub fn format_eth(wei: U256) -> String {
    let whole = wei / wei_per_eth();
    let frac = wei % wei_per_eth();
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac_digits = format!("{:0>width$}", frac.to_string(), width = ETH_DECIMALS);
    format!("{whole}.{}", frac_digits.trim_end_matches('0'))
}
