use std::fmt;

use crate::constants::format::{AREA_SUFFIX, CURRENCY_SUFFIX};

/// One step of a formatter pipeline.
///
/// `format` receives the previous step's output; `None` means the value cannot
/// be rendered and the field degrades to empty.
pub trait ValueFormatter: Send + Sync + fmt::Debug {
    /// Stable name used in diagnostics and chain comparisons.
    fn name(&self) -> &str;
    /// Render `value`.
    fn format(&self, value: &str) -> Option<String>;
}

/// Price with two decimals, `.` thousands separator, `,` decimal mark and a euro suffix.
///
/// `250000` → `250.000,00 €`. Accepts `.` or `,` as the decimal mark on input.
#[derive(Clone, Copy, Debug, Default)]
pub struct PriceFormatter;

impl ValueFormatter for PriceFormatter {
    fn name(&self) -> &str {
        "price"
    }

    fn format(&self, value: &str) -> Option<String> {
        let amount = parse_decimal(value)?;
        Some(format!("{}{CURRENCY_SUFFIX}", amount.grouped()?))
    }
}

/// Cut everything from the first `.` or `,` (`123,00` → `123`).
#[derive(Clone, Copy, Debug, Default)]
pub struct TrimDecimals;

impl ValueFormatter for TrimDecimals {
    fn name(&self) -> &str {
        "trim_decimals"
    }

    fn format(&self, value: &str) -> Option<String> {
        let end = value.find(['.', ',']).unwrap_or(value.len());
        Some(value[..end].to_string())
    }
}

/// Append ` m²` to non-blank values.
#[derive(Clone, Copy, Debug, Default)]
pub struct SquareMeters;

impl ValueFormatter for SquareMeters {
    fn name(&self) -> &str {
        "square_meters"
    }

    fn format(&self, value: &str) -> Option<String> {
        if value.trim().is_empty() {
            return None;
        }
        Some(format!("{value}{AREA_SUFFIX}"))
    }
}

/// Append a fixed suffix.
#[derive(Clone, Debug)]
pub struct Suffix {
    name: String,
    suffix: String,
}

impl Suffix {
    /// Formatter appending `suffix`; the name is derived from it.
    pub fn new(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        Self {
            name: format!("suffix({})", suffix.trim()),
            suffix,
        }
    }
}

impl ValueFormatter for Suffix {
    fn name(&self) -> &str {
        &self.name
    }

    fn format(&self, value: &str) -> Option<String> {
        Some(format!("{value}{}", self.suffix))
    }
}

/// Decimal amount kept as its digit strings so rounding works on the written
/// value rather than on a binary approximation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecimalAmount {
    negative: bool,
    whole: String,
    fraction: String,
}

impl DecimalAmount {
    fn from_plain(text: &str) -> Option<Self> {
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !digits(whole) || !digits(fraction) {
            return None;
        }
        Some(Self {
            negative,
            whole: whole.to_string(),
            fraction: fraction.to_string(),
        })
    }

    /// Amount in cents, halves rounded away from zero.
    pub fn cents(&self) -> Option<u128> {
        let mut cents: u128 = 0;
        let fraction = self.fraction.bytes().chain(std::iter::repeat(b'0'));
        for digit in self.whole.bytes().chain(fraction.take(2)) {
            cents = cents.checked_mul(10)?.checked_add(u128::from(digit - b'0'))?;
        }
        if self.fraction.as_bytes().get(2).is_some_and(|digit| *digit >= b'5') {
            cents = cents.checked_add(1)?;
        }
        Some(cents)
    }

    /// Two decimals, `.` between thousands and `,` before the decimals.
    pub fn grouped(&self) -> Option<String> {
        let cents = self.cents()?;
        let whole = (cents / 100).to_string();
        let fraction = cents % 100;

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (idx, digit) in whole.chars().enumerate() {
            if idx > 0 && (whole.len() - idx) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }
        let sign = if self.negative && cents > 0 { "-" } else { "" };
        Some(format!("{sign}{grouped},{fraction:02}"))
    }
}

/// Parse a vendor decimal that uses either `.` or `,` as decimal mark.
///
/// When both appear, the last one is the decimal mark and the other one groups
/// thousands (`1.250,50` and `1,250.50` both read as 1250.50). Exponent
/// notation is accepted and expanded.
pub fn parse_decimal(raw: &str) -> Option<DecimalAmount> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = match (trimmed.rfind('.'), trimmed.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (None, Some(_)) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };
    DecimalAmount::from_plain(&normalized).or_else(|| {
        let value = normalized.parse::<f64>().ok().filter(|value| value.is_finite())?;
        DecimalAmount::from_plain(&value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_groups_thousands_and_appends_currency() {
        let price = PriceFormatter;
        assert_eq!(price.format("250000").as_deref(), Some("250.000,00 €"));
        assert_eq!(price.format("1234567.891").as_deref(), Some("1.234.567,89 €"));
        assert_eq!(price.format("950,5").as_deref(), Some("950,50 €"));
        assert_eq!(price.format("1.250,00").as_deref(), Some("1.250,00 €"));
        assert_eq!(price.format("0").as_deref(), Some("0,00 €"));
        assert_eq!(price.format("-1500").as_deref(), Some("-1.500,00 €"));
        assert_eq!(price.format("auf Anfrage"), None);
        assert_eq!(price.format(""), None);
    }

    #[test]
    fn price_rounds_the_written_decimal_half_away_from_zero() {
        let price = PriceFormatter;
        assert_eq!(price.format("1.005").as_deref(), Some("1,01 €"));
        assert_eq!(price.format("0,125").as_deref(), Some("0,13 €"));
        assert_eq!(price.format("-2.675").as_deref(), Some("-2,68 €"));
        assert_eq!(price.format("-0.001").as_deref(), Some("0,00 €"));
        assert_eq!(price.format("999.999").as_deref(), Some("1.000,00 €"));
        assert_eq!(price.format("1.004999").as_deref(), Some("1,00 €"));
        assert_eq!(price.format(".5").as_deref(), Some("0,50 €"));
        assert_eq!(price.format("2.5e3").as_deref(), Some("2.500,00 €"));
        assert_eq!(price.format("1.2.3"), None);
    }

    #[test]
    fn trim_cuts_at_first_separator() {
        assert_eq!(TrimDecimals.format("123,00").as_deref(), Some("123"));
        assert_eq!(TrimDecimals.format("87.5").as_deref(), Some("87"));
        assert_eq!(TrimDecimals.format("42").as_deref(), Some("42"));
        assert_eq!(TrimDecimals.format("").as_deref(), Some(""));
    }

    #[test]
    fn square_meters_skips_blank_values() {
        assert_eq!(SquareMeters.format("123").as_deref(), Some("123 m²"));
        assert_eq!(SquareMeters.format("  "), None);
    }

    #[test]
    fn suffix_names_itself_after_the_suffix() {
        let suffix = Suffix::new(" Zimmer");
        assert_eq!(suffix.name(), "suffix(Zimmer)");
        assert_eq!(suffix.format("3").as_deref(), Some("3 Zimmer"));
    }
}
