// Fixed-point currency amounts
//
// Every monetary value handled by the engine is an integer number of
// hundredths of the plan currency. Percentages are expressed in basis points.

use thiserror::Error;

/// Amount in hundredths of the plan currency
pub type Amount = u64;

/// Basis points (100 = 1%, 10000 = 100%)
pub type BasisPoints = u16;

// 2 decimals numbers
pub const AMOUNT_DECIMALS: u8 = 2;
// 100 to represent 1 currency unit
pub const AMOUNT_SCALE: u64 = 10u64.pow(AMOUNT_DECIMALS as u32);
// 10000 basis points = 100%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Convert a whole currency value into an `Amount`
pub const fn units(whole: u64) -> Amount {
    whole * AMOUNT_SCALE
}

/// Apply a basis point ratio to an amount, rounding half away from zero
/// to the nearest hundredth.
pub fn apply_bps(amount: Amount, bps: BasisPoints) -> Amount {
    let product = amount as u128 * bps as u128;
    let denominator = BPS_DENOMINATOR as u128;
    let rounded = (product + denominator / 2) / denominator;
    // bps is at most u16::MAX so the result fits back unless amount is close to u64::MAX
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Render an amount with its two decimals
pub fn format_amount(amount: Amount) -> String {
    format!(
        "{}.{:0width$}",
        amount / AMOUNT_SCALE,
        amount % AMOUNT_SCALE,
        width = AMOUNT_DECIMALS as usize
    )
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Empty amount")]
    Empty,

    #[error("Invalid amount '{0}'")]
    Invalid(String),

    #[error("Amount '{0}' has more than {max} decimals", max = AMOUNT_DECIMALS)]
    TooManyDecimals(String),

    #[error("Amount '{0}' is too large")]
    Overflow(String),
}

/// Parse a decimal string such as `"10000"`, `"12.5"` or `"12.50"`
pub fn parse_amount(value: &str) -> Result<Amount, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::Invalid(value.to_owned()));
    }

    if fraction.len() > AMOUNT_DECIMALS as usize {
        return Err(AmountError::TooManyDecimals(value.to_owned()));
    }

    let whole: u64 = whole
        .parse()
        .map_err(|_| AmountError::Overflow(value.to_owned()))?;

    let mut cents = 0u64;
    for (i, digit) in fraction.bytes().enumerate() {
        let weight = 10u64.pow((AMOUNT_DECIMALS as u32) - 1 - i as u32);
        cents += (digit - b'0') as u64 * weight;
    }

    whole
        .checked_mul(AMOUNT_SCALE)
        .and_then(|v| v.checked_add(cents))
        .ok_or_else(|| AmountError::Overflow(value.to_owned()))
}
