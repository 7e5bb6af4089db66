//! Display quantities derived from fetched campaign values.
//!
//! Every function here is pure. The wall-clock variants (`remaining_time`,
//! `is_expired`) read `Utc::now()` on each call and must be re-evaluated per
//! render tick rather than cached.

use crate::big_decimal::{scale_of, BigDecimal};
use crate::error::AmountResult;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

/// Rendered by [`remaining_time`] once the deadline has passed.
pub const EXPIRED: &str = "Expired";

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Renders `raw` smallest units as a fixed-point decimal with `decimals` places.
///
/// Trailing fractional zeros are dropped: `format_amount(1250, 2) == "12.5"`.
pub fn format_amount(raw: &BigInt, decimals: u8) -> String {
    BigDecimal::new(raw.clone(), decimals).to_string()
}

/// Inverse of [`format_amount`].
pub fn parse_amount(text: &str, decimals: u8) -> AmountResult<BigInt> {
    BigDecimal::parse(text, decimals).map(BigDecimal::into_value)
}

/// Percentage of `denominator` reached by `numerator`, in `[0, 100]`.
///
/// Both operands are amounts at the same token scale. The quotient is computed
/// exactly with `decimals` fractional digits before conversion to `f64`.
/// A zero denominator yields `0.0`.
pub fn percentage(numerator: &BigInt, denominator: &BigInt, decimals: u8) -> f64 {
    if denominator.is_zero() {
        return 0.0;
    }

    let precision = scale_of(decimals);
    let scaled = numerator * BigInt::from(100u8) * &precision / denominator;
    if !scaled.is_positive() {
        return 0.0;
    }
    if scaled >= BigInt::from(100u8) * &precision {
        return 100.0;
    }

    match (scaled.to_f64(), precision.to_f64()) {
        (Some(value), Some(divisor)) if divisor.is_finite() && divisor > 0.0 => {
            (value / divisor).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

/// Human readable time left until `deadline` as seen at `now`.
///
/// Returns [`EXPIRED`] once `now >= deadline`. Partial seconds round up so a
/// live campaign never renders as `0s`.
pub fn remaining_time_at(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if is_expired_at(deadline, now) {
        return EXPIRED.to_string();
    }

    let millis = (deadline - now).num_milliseconds();
    let total = (millis + 999) / 1000;

    let days = total / SECONDS_PER_DAY;
    let hours = (total % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total % SECONDS_PER_MINUTE;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// [`remaining_time_at`] against the current wall clock.
pub fn remaining_time(deadline: DateTime<Utc>) -> String {
    remaining_time_at(deadline, Utc::now())
}

/// `true` iff `now >= deadline`.
pub fn is_expired_at(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= deadline
}

/// [`is_expired_at`] against the current wall clock.
pub fn is_expired(deadline: DateTime<Utc>) -> bool {
    is_expired_at(deadline, Utc::now())
}
