//! # Money Module
//!
//! Provides the `Money` type (Moroccan dirham, counted in centimes) and the
//! `TaxRate` type (basis points).
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │    totalHT + totalTVA drifts away from totalTTC                         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centimes                                         │
//! │    subtotal = Σ unit × qty          (exact)                             │
//! │    tax      = round(subtotal × bps / 10000)                             │
//! │    total    = subtotal + tax        (exact, by construction)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use comptoir_core::money::Money;
//!
//! let price = Money::from_centimes(1_050); // 10,50 MAD
//! let line = price * 3;                    // 31,50 MAD
//! assert_eq!(line.centimes(), 3_150);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::format;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centimes (1 dirham = 100 centimes).
///
/// ## Where Money is Used
/// ```text
/// Product.sale_price ──► CartLine.unit_price ──► CartLine.line_total
///                                                     │
///                              Cart.totals() ◄────────┘
///                                   │
///                                   ▼
///          SalesDocument.total_ht / total_tva / total_ttc (frozen)
///                                   │
///                                   ▼
///                     metrics: invoiced, COGS, profit
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centimes.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    ///
    /// let price = Money::from_centimes(1_099);
    /// assert_eq!(price.centimes(), 1_099);
    /// ```
    #[inline]
    pub const fn from_centimes(centimes: i64) -> Self {
        Money(centimes)
    }

    /// Creates a Money value from dirhams and centimes.
    ///
    /// For negative amounts only the dirham part carries the sign:
    /// `from_dirhams(-5, 50)` is -5,50 MAD.
    #[inline]
    pub const fn from_dirhams(dirhams: i64, centimes: i64) -> Self {
        if dirhams < 0 {
            Money(dirhams * 100 - centimes)
        } else {
            Money(dirhams * 100 + centimes)
        }
    }

    /// Parses a decimal amount typed in a form.
    ///
    /// Accepts either `,` or `.` as decimal separator and at most two
    /// decimals: `"12"`, `"12,5"`, `"12.50"`, `"-3,20"`.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal_str("12,50").unwrap().centimes(), 1_250);
    /// assert!(Money::from_decimal_str("12,505").is_err());
    /// ```
    pub fn from_decimal_str(input: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, frac) = match body.find(|c: char| c == ',' || c == '.') {
            Some(pos) => (&body[..pos], &body[pos + 1..]),
            None => (body, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected digits before the decimal separator"));
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("at most two decimal digits are allowed"));
        }

        let dirhams: i64 = whole
            .parse()
            .map_err(|_| invalid("amount is too large"))?;
        let centimes: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("bad decimals"))? * 10,
            _ => frac.parse::<i64>().map_err(|_| invalid("bad decimals"))?,
        };

        let value = dirhams
            .checked_mul(100)
            .and_then(|v| v.checked_add(centimes))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -value } else { value }))
    }

    /// Returns the value in centimes.
    #[inline]
    pub const fn centimes(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dirham portion (sign preserved).
    #[inline]
    pub const fn dirhams(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centime portion (always 0-99).
    #[inline]
    pub const fn centimes_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero dirhams.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates tax on this amount, rounding half up to the centime.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 is the
    /// half-centime that makes the division round instead of truncate.
    ///
    /// ## Example
    /// ```rust
    /// use comptoir_core::money::{Money, TaxRate};
    ///
    /// let subtotal = Money::from_centimes(1_099); // 10,99 MAD
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(2000));
    /// // 10,99 × 20% = 2,198 → 2,20
    /// assert_eq!(tax.centimes(), 220);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 so large invoices cannot overflow mid-computation
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_centimes(tax as i64)
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `self / whole × 100`, or 0 when `whole` is zero.
    ///
    /// Used for margins, which are display-only percentages.
    pub fn percent_of(&self, whole: Money) -> f64 {
        if whole.is_zero() {
            return 0.0;
        }
        self.0 as f64 / whole.0 as f64 * 100.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money the way it is printed on documents: `1.234,50 MAD`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format::format_currency(*self))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. The standard Moroccan TVA of 20% is 2000 bps.
/// Settings store the rate as a fraction (0.20); it is converted once, at
/// the boundary, with [`TaxRate::from_fraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a fraction (0.20 = 20%).
    ///
    /// Negative or non-finite input yields a zero rate.
    pub fn from_fraction(fraction: f64) -> Self {
        if !fraction.is_finite() || fraction <= 0.0 {
            return TaxRate::zero();
        }
        TaxRate((fraction * 10_000.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a fraction (display and storage only).
    #[inline]
    pub fn as_fraction(&self) -> f64 {
        self.0 as f64 / 10_000.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_centimes() {
        let money = Money::from_centimes(1099);
        assert_eq!(money.centimes(), 1099);
        assert_eq!(money.dirhams(), 10);
        assert_eq!(money.centimes_part(), 99);
    }

    #[test]
    fn test_from_dirhams() {
        assert_eq!(Money::from_dirhams(10, 99).centimes(), 1099);
        assert_eq!(Money::from_dirhams(-5, 50).centimes(), -550);
    }

    #[test]
    fn test_parse_decimal_input() {
        assert_eq!(Money::from_decimal_str("12").unwrap().centimes(), 1200);
        assert_eq!(Money::from_decimal_str("12,5").unwrap().centimes(), 1250);
        assert_eq!(Money::from_decimal_str(" 12.05 ").unwrap().centimes(), 1205);
        assert_eq!(Money::from_decimal_str("-3,20").unwrap().centimes(), -320);
        assert!(Money::from_decimal_str("").is_err());
        assert!(Money::from_decimal_str(",50").is_err());
        assert!(Money::from_decimal_str("1,234").is_err());
        assert!(Money::from_decimal_str("abc").is_err());
    }

    #[test]
    fn test_display_uses_document_format() {
        assert_eq!(Money::from_centimes(123_450).to_string(), "1.234,50 MAD");
        assert_eq!(Money::from_centimes(0).to_string(), "0,00 MAD");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_centimes(1000);
        let b = Money::from_centimes(500);

        assert_eq!((a + b).centimes(), 1500);
        assert_eq!((a - b).centimes(), 500);
        assert_eq!((a * 3).centimes(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.centimes(), 2000);
    }

    #[test]
    fn test_tax_calculation_rounds_half_up() {
        let rate = TaxRate::from_bps(2000);
        assert_eq!(Money::from_centimes(1000).calculate_tax(rate).centimes(), 200);
        // 0,03 × 20% = 0,006 → 0,01
        assert_eq!(Money::from_centimes(3).calculate_tax(rate).centimes(), 1);
        // 0,02 × 20% = 0,004 → 0,00
        assert_eq!(Money::from_centimes(2).calculate_tax(rate).centimes(), 0);
    }

    #[test]
    fn test_tax_is_within_half_a_centime_of_exact() {
        let rate = TaxRate::from_bps(2000);
        for centimes in [1_i64, 7, 99, 1_234, 99_999, 1_000_001] {
            let tax = Money::from_centimes(centimes).calculate_tax(rate);
            let exact = centimes as f64 * 0.20;
            assert!((tax.centimes() as f64 - exact).abs() <= 0.5);
        }
    }

    #[test]
    fn test_percent_of() {
        let profit = Money::from_centimes(4_000);
        let sale = Money::from_centimes(10_000);
        assert!((profit.percent_of(sale) - 40.0).abs() < 1e-9);
        assert_eq!(profit.percent_of(Money::zero()), 0.0);
    }

    #[test]
    fn test_tax_rate_conversions() {
        let rate = TaxRate::from_fraction(0.20);
        assert_eq!(rate.bps(), 2000);
        assert!((rate.as_fraction() - 0.20).abs() < 1e-9);
        assert!((rate.percentage() - 20.0).abs() < 1e-9);

        assert_eq!(TaxRate::from_fraction(0.07).bps(), 700);
        assert!(TaxRate::from_fraction(-0.1).is_zero());
        assert!(TaxRate::from_fraction(f64::NAN).is_zero());
    }
}
