//! # Formatting
//!
//! Text forms of amounts and dates as they appear on quotes, delivery notes
//! and invoices.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Money::from_centimes(123_450)                                          │
//! │      │                                                                  │
//! │      ├── format_currency ──► "1.234,50 MAD"                             │
//! │      │                                                                  │
//! │      └── amount_in_words ──► "mille deux cent trente-quatre dirhams     │
//! │                               et cinquante centimes"                    │
//! │                                                                         │
//! │  2024-03-07T15:42:00Z ──► format_date ──► "07/03/2024"                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts in words follow standard French spelling: "et" before "un" and
//! "onze" in the tens up to soixante-dix, "quatre-vingts" and "cents" take
//! the plural only when they close the number, "mille" never does, and
//! "million"/"milliard" agree in number.

use chrono::{DateTime, Utc};

use crate::money::Money;

/// Currency label printed after every amount.
pub const CURRENCY_LABEL: &str = "MAD";

// =============================================================================
// Currency
// =============================================================================

/// Formats an amount as Moroccan dirhams: dot thousands separator, comma
/// decimal separator, always two decimals.
///
/// ## Example
/// ```rust
/// use comptoir_core::format::format_currency;
/// use comptoir_core::Money;
///
/// assert_eq!(format_currency(Money::from_centimes(123_450)), "1.234,50 MAD");
/// assert_eq!(format_currency(Money::from_centimes(-5)), "-0,05 MAD");
/// ```
pub fn format_currency(amount: Money) -> String {
    let sign = if amount.is_negative() { "-" } else { "" };
    let dirhams = group_thousands(amount.dirhams().unsigned_abs());
    format!(
        "{}{},{:02} {}",
        sign,
        dirhams,
        amount.centimes_part(),
        CURRENCY_LABEL
    )
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Dates
// =============================================================================

/// Formats an instant as a day/month/year display date.
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y").to_string()
}

// =============================================================================
// Amount in Words
// =============================================================================

const UNITS: [&str; 17] = [
    "zéro", "un", "deux", "trois", "quatre", "cinq", "six", "sept", "huit", "neuf", "dix", "onze",
    "douze", "treize", "quatorze", "quinze", "seize",
];

const TENS: [&str; 7] = ["", "dix", "vingt", "trente", "quarante", "cinquante", "soixante"];

/// Writes a non-negative amount in French: `"<n> dirhams et <m> centimes"`.
///
/// Centimes are the two rounded digits held by [`Money`]. Zero and one take
/// the singular ("zéro dirham", "un centime"); round millions take "de"
/// ("deux millions de dirhams"). Negative amounts are prefixed with "moins".
///
/// ## Example
/// ```rust
/// use comptoir_core::format::amount_in_words;
/// use comptoir_core::Money;
///
/// assert_eq!(
///     amount_in_words(Money::from_centimes(7_101)),
///     "soixante et onze dirhams et un centime"
/// );
/// ```
pub fn amount_in_words(amount: Money) -> String {
    let abs = amount.abs();
    let dirhams = abs.dirhams() as u64;
    let centimes = abs.centimes_part() as u64;

    let dirham_unit = if dirhams > 1 { "dirhams" } else { "dirham" };
    let centime_unit = if centimes > 1 { "centimes" } else { "centime" };
    let joiner = if dirhams >= 1_000_000 && dirhams % 1_000_000 == 0 {
        " de "
    } else {
        " "
    };

    let prefix = if amount.is_negative() { "moins " } else { "" };

    format!(
        "{}{}{}{} et {} {}",
        prefix,
        number_to_words(dirhams),
        joiner,
        dirham_unit,
        number_to_words(centimes),
        centime_unit
    )
}

/// Spells out a whole number in French.
pub fn number_to_words(n: u64) -> String {
    if n == 0 {
        return UNITS[0].to_string();
    }

    let milliards = n / 1_000_000_000;
    let millions = (n / 1_000_000) % 1_000;
    let thousands = (n / 1_000) % 1_000;
    let rest = n % 1_000;

    let mut parts: Vec<String> = Vec::new();

    if milliards > 0 {
        let unit = if milliards > 1 { "milliards" } else { "milliard" };
        parts.push(format!("{} {}", number_to_words(milliards), unit));
    }
    if millions > 0 {
        let unit = if millions > 1 { "millions" } else { "million" };
        parts.push(format!("{} {}", below_thousand(millions, true), unit));
    }
    if thousands > 0 {
        if thousands == 1 {
            parts.push("mille".to_string());
        } else {
            // "mille" is an adjective: "deux cent mille", "quatre-vingt mille"
            parts.push(format!("{} mille", below_thousand(thousands, false)));
        }
    }
    if rest > 0 {
        parts.push(below_thousand(rest, true));
    }

    parts.join(" ")
}

/// `closing` is true when nothing but a noun (or nothing at all) follows,
/// which is when "cents" and "quatre-vingts" keep their plural.
fn below_thousand(n: u64, closing: bool) -> String {
    let hundreds = n / 100;
    let rest = n % 100;

    let mut words = match hundreds {
        0 => String::new(),
        1 => "cent".to_string(),
        h if rest == 0 && closing => format!("{} cents", UNITS[h as usize]),
        h => format!("{} cent", UNITS[h as usize]),
    };

    if rest > 0 {
        if !words.is_empty() {
            words.push(' ');
        }
        words.push_str(&below_hundred(rest, closing));
    }

    words
}

fn below_hundred(n: u64, closing: bool) -> String {
    match n {
        0..=16 => UNITS[n as usize].to_string(),
        17..=19 => format!("dix-{}", UNITS[(n - 10) as usize]),
        20..=69 => {
            let tens = TENS[(n / 10) as usize];
            match n % 10 {
                0 => tens.to_string(),
                1 => format!("{} et un", tens),
                unit => format!("{}-{}", tens, UNITS[unit as usize]),
            }
        }
        71 => "soixante et onze".to_string(),
        70..=79 => format!("soixante-{}", below_hundred(n - 60, closing)),
        80 if closing => "quatre-vingts".to_string(),
        80 => "quatre-vingt".to_string(),
        _ => format!("quatre-vingt-{}", below_hundred(n - 80, closing)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
