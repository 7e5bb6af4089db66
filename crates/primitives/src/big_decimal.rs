use crate::error::{AmountError, AmountResult};
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};
use std::fmt;
use std::str::FromStr;

/// Represents a token amount as an integer of smallest units plus a decimal scale.
///
/// Rendering and parsing are exact: no value ever passes through `f64`, so
/// amounts beyond 2^53 keep every digit.
#[derive(Clone, Debug)]
pub struct BigDecimal {
    value: BigInt,
    decimals: u8,
}

/// `10^decimals` as a `BigInt`.
pub(crate) fn scale_of(decimals: u8) -> BigInt {
    num_traits::pow(BigInt::from(10u8), decimals as usize)
}

impl BigDecimal {
    /// Creates a new `BigDecimal` instance.
    ///
    /// # Arguments
    ///
    /// * `value` - The amount in smallest units.
    /// * `decimals` - The number of decimal places of the token.
    pub fn new(value: BigInt, decimals: u8) -> Self {
        Self { value, decimals }
    }

    /// Consumes the decimal and returns the amount in smallest units.
    pub fn into_value(self) -> BigInt {
        self.value
    }

    /// Parses a decimal string such as `"1234.5"` into smallest units at `decimals` places.
    ///
    /// Trailing fractional zeros beyond the scale are accepted; any other
    /// digit beyond the scale is a precision loss.
    pub fn parse(text: &str, decimals: u8) -> AmountResult<Self> {
        let trimmed = text.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !is_digits(int_part)
            || !is_digits(frac_part)
        {
            return Err(AmountError::invalid(text));
        }

        let frac = frac_part.trim_end_matches('0');
        if frac.len() > decimals as usize {
            return Err(AmountError::PrecisionLoss {
                text: text.to_string(),
                decimals,
            });
        }

        let mut digits = String::with_capacity(int_part.len() + decimals as usize);
        digits.push_str(int_part);
        digits.push_str(frac);
        digits.extend(std::iter::repeat('0').take(decimals as usize - frac.len()));
        if digits.is_empty() {
            digits.push('0');
        }

        let magnitude = BigInt::from_str(&digits).map_err(|_| AmountError::invalid(text))?;
        let value = if negative { -magnitude } else { magnitude };
        Ok(Self::new(value, decimals))
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = scale_of(self.decimals);
        let magnitude = self.value.abs();
        let whole = &magnitude / &scale;
        let fraction = &magnitude % &scale;
        let sign = if self.value.sign() == Sign::Minus { "-" } else { "" };

        if fraction.is_zero() {
            return write!(f, "{sign}{whole}");
        }

        let padded = format!(
            "{:0>width$}",
            fraction.to_string(),
            width = self.decimals as usize
        );
        write!(f, "{sign}{whole}.{}", padded.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_decimal_display() {
        let bd = BigDecimal::new(BigInt::from(123456), 2);
        assert_eq!(bd.to_string(), "1234.56");
    }

    #[test]
    fn test_display_pads_leading_fraction_zeros() {
        assert_eq!(BigDecimal::new(BigInt::from(105), 2).to_string(), "1.05");
        assert_eq!(BigDecimal::new(BigInt::from(7), 7).to_string(), "0.0000007");
    }

    #[test]
    fn test_display_trims_and_signs() {
        assert_eq!(BigDecimal::new(BigInt::from(1200), 2).to_string(), "12");
        assert_eq!(BigDecimal::new(BigInt::from(1250), 2).to_string(), "12.5");
        assert_eq!(BigDecimal::new(BigInt::from(-50), 2).to_string(), "-0.5");
        assert_eq!(BigDecimal::new(BigInt::from(42), 0).to_string(), "42");
    }

    #[test]
    fn test_big_decimal_parse() {
        let parsed = |text: &str, decimals| BigDecimal::parse(text, decimals).unwrap().into_value();
        assert_eq!(parsed("1234.56", 2), BigInt::from(123456));
        assert_eq!(parsed("12.5", 2), BigInt::from(1250));
        assert_eq!(parsed(".5", 1), BigInt::from(5));
        assert_eq!(parsed("-3", 2), BigInt::from(-300));
        assert_eq!(parsed("1.500", 1), BigInt::from(15));
    }

    #[test]
    fn test_parse_rejects_garbage_and_precision_loss() {
        assert!(matches!(
            BigDecimal::parse("1.234", 2),
            Err(AmountError::PrecisionLoss { decimals: 2, .. })
        ));
        assert!(BigDecimal::parse("", 2).is_err());
        assert!(BigDecimal::parse(".", 2).is_err());
        assert!(BigDecimal::parse("1e5", 2).is_err());
        assert!(BigDecimal::parse("abc", 2).is_err());
    }
}
