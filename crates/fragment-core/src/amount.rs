//! Fixed-point token amounts.
//!
//! Balances are carried as integer minor units together with the token's
//! decimal count. Decimal strings only appear at the boundary (parsing input
//! records, rendering output).

use std::cmp::Ordering;
use std::fmt;

use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};

/// Largest supported decimal count; `10^36` still leaves headroom in `u128`.
pub const MAX_DECIMALS: u8 = 36;

/// Resolution (decimal places) used by scoring, epsilon checks and the
/// knapsack table: one micro-token.
pub const MICRO_DECIMALS: u8 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenAmount {
    units: u128,
    decimals: u8,
}

impl TokenAmount {
    pub fn new(units: u128, decimals: u8) -> Self {
        debug_assert!(decimals <= MAX_DECIMALS);
        Self { units, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self::new(0, decimals)
    }

    /// Parses a non-negative decimal string such as `"0.0003"` or `"1e-5"`.
    ///
    /// More fractional digits than `decimals` is an error rather than a
    /// rounding.
    pub fn parse(text: &str, decimals: u8) -> anyhow::Result<Self> {
        ensure!(
            decimals <= MAX_DECIMALS,
            "decimals {decimals} exceeds maximum {MAX_DECIMALS}"
        );
        let trimmed = text.trim();
        ensure!(!trimmed.is_empty(), "empty amount");
        ensure!(
            !trimmed.starts_with('-'),
            "negative amount {trimmed:?} not allowed"
        );
        let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let (mantissa, exponent) = match trimmed.find(|c: char| c == 'e' || c == 'E') {
            Some(pos) => {
                let exp: i32 = trimmed[pos + 1..]
                    .parse()
                    .with_context(|| format!("invalid exponent in {trimmed:?}"))?;
                (&trimmed[..pos], exp)
            }
            None => (trimmed, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        ensure!(
            !(int_part.is_empty() && frac_part.is_empty()),
            "amount {trimmed:?} has no digits"
        );
        ensure!(
            int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()),
            "amount {trimmed:?} is not a decimal number"
        );

        let mut digits: String = format!("{int_part}{frac_part}");
        // Position of the decimal point counted from the right of `digits`.
        let mut scale = frac_part.len() as i64 - exponent as i64;
        if scale < 0 {
            let significant = digits.trim_start_matches('0').len();
            if significant == 0 {
                digits.clear();
            } else {
                // u128 holds at most 39 decimal digits.
                ensure!(
                    significant as i64 - scale <= 39,
                    "amount {trimmed:?} overflows"
                );
                digits.extend(std::iter::repeat('0').take((-scale) as usize));
            }
            scale = 0;
        }
        let scale = scale as usize;

        // Drop trailing zeros past the token precision; anything else is lost precision.
        let mut digits = digits.as_str();
        let mut scale = scale;
        while scale > decimals as usize && digits.ends_with('0') {
            digits = &digits[..digits.len() - 1];
            scale -= 1;
        }
        if scale > decimals as usize {
            bail!("amount {trimmed:?} has more than {decimals} fractional digits");
        }

        let digits = digits.trim_start_matches('0');
        let base: u128 = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .with_context(|| format!("amount {trimmed:?} overflows"))?
        };
        let units = base
            .checked_mul(pow10(decimals - scale as u8))
            .with_context(|| format!("amount {trimmed:?} overflows"))?;
        Ok(Self::new(units, decimals))
    }

    pub fn units(&self) -> u128 {
        self.units
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.same_scale(&other);
        self.units
            .checked_add(other.units)
            .map(|units| Self::new(units, self.decimals))
    }

    pub fn saturating_add(self, other: Self) -> Self {
        self.same_scale(&other);
        Self::new(self.units.saturating_add(other.units), self.decimals)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        self.same_scale(&other);
        Self::new(self.units.saturating_sub(other.units), self.decimals)
    }

    /// `self × bps / 10_000`, rounded down.
    pub fn mul_bps(self, bps: u32) -> Self {
        let units = self
            .units
            .checked_mul(bps as u128)
            .map(|v| v / 10_000)
            .unwrap_or_else(|| (self.units / 10_000).saturating_mul(bps as u128));
        Self::new(units, self.decimals)
    }

    /// Re-expresses the amount at `resolution` decimal places.
    pub fn to_resolution(&self, resolution: u8, round_up: bool) -> u128 {
        match self.decimals.cmp(&resolution) {
            Ordering::Equal => self.units,
            Ordering::Less => self
                .units
                .saturating_mul(pow10(resolution - self.decimals)),
            Ordering::Greater => {
                let divisor = pow10(self.decimals - resolution);
                let floor = self.units / divisor;
                if round_up && self.units % divisor != 0 {
                    floor + 1
                } else {
                    floor
                }
            }
        }
    }

    /// Amount in micro-tokens (1e-6), rounded down.
    pub fn micros(&self) -> u128 {
        self.to_resolution(MICRO_DECIMALS, false)
    }

    /// One micro-token expressed in this amount's minor units (at least 1).
    pub fn micro_unit(decimals: u8) -> u128 {
        pow10(decimals.saturating_sub(MICRO_DECIMALS))
    }

    fn same_scale(&self, other: &Self) {
        debug_assert_eq!(
            self.decimals, other.decimals,
            "mixing amounts with different decimals"
        );
    }
}

impl PartialOrd for TokenAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.decimals == other.decimals {
            Some(self.units.cmp(&other.units))
        } else {
            None
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decimals == 0 {
            return write!(f, "{}", self.units);
        }
        let divisor = pow10(self.decimals);
        let whole = self.units / divisor;
        let frac = self.units % divisor;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{:0width$}", frac, width = self.decimals as usize);
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

pub(crate) fn pow10(exp: u8) -> u128 {
    10u128.pow(exp as u32)
}
