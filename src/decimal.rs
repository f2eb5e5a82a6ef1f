//! Fixed-point measurements: one fractional digit, stored as the value times ten.

use std::fmt;

/// A measurement scaled by ten, e.g. `-12.3` is `-123`.
pub type Scaled = i16;

/// Decodes `[-]d.d` or `[-]dd.d` into a [Scaled] value, reading positions from the end.
/// Returns `None` for any other shape.
#[inline]
pub fn parse_scaled(value: &[u8]) -> Option<Scaled> {
    let len = value.len();
    if !(3..=5).contains(&len) || value[len - 2] != b'.' {
        return None;
    }
    let fraction = digit(value[len - 1])?;
    let units = digit(value[len - 3])?;
    let mut scaled = units * 10 + fraction;
    if len == 3 {
        return Some(scaled);
    }
    match value[len - 4] {
        b'-' if len == 4 => return Some(-scaled),
        b'-' => return None,
        b => scaled += digit(b)? * 100,
    }
    match len {
        4 => Some(scaled),
        _ if value[0] == b'-' => Some(-scaled),
        _ => None,
    }
}

#[inline(always)]
fn digit(b: u8) -> Option<Scaled> {
    let d = b.wrapping_sub(b'0');
    (d < 10).then_some(d as Scaled)
}

/// Rounds `sum / count` (both in scaled units) to the nearest scaled integer, halves going
/// towards positive infinity.
pub fn mean_scaled(sum: i64, count: u64) -> i64 {
    debug_assert!(count > 0, "mean of an empty aggregate");
    (sum as f64 / count as f64 + 0.5).floor() as i64
}

/// Displays a scaled integer with exactly one fractional digit. Zero is always `0.0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decimal(pub i64);

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", abs / 10, abs % 10)
    }
}
