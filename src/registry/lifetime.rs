use crate::configuration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

/// Requested duration of a lease, in signed nanoseconds.
///
/// Zero and negative lifetimes are valid: they produce a lease that is
/// already expired when it is granted.
///
/// The textual form accepts durations such as `1m`, `1h30m`, `1.5s`, `-5s`
/// or a bare `0`. Valid units are `ns`, `us` (or `µs`/`μs`), `ms`, `s`, `m`, `h`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lifetime(i64);

impl Lifetime {
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }

    /// Monotonic deadline of a lease granted at `now`.
    ///
    /// `None` when the deadline lies past the end of the clock range: such a
    /// lease never expires. A deadline before the start of the range is
    /// clamped to `now`, which is already expired.
    pub fn expires_after(self, now: Instant) -> Option<Instant> {
        let magnitude = Duration::from_nanos(self.0.unsigned_abs());
        if self.0 < 0 {
            Some(now.checked_sub(magnitude).unwrap_or(now))
        } else {
            now.checked_add(magnitude)
        }
    }
}

impl FromStr for Lifetime {
    type Err = configuration::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || configuration::Error::InvalidLifetime(s.to_string());

        let (negative, mut rest) = if let Some(rest) = s.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = s.strip_prefix('+') {
            (false, rest)
        } else {
            (false, s)
        };

        if rest == "0" {
            return Ok(Self(0));
        }
        if rest.is_empty() {
            return Err(invalid());
        }

        let limit = if negative { 1u128 << 63 } else { (1u128 << 63) - 1 };
        let mut total: u128 = 0;

        while !rest.is_empty() {
            let (whole, tail) = split_digits(rest);
            let (fraction, tail) = match tail.strip_prefix('.') {
                Some(after_dot) => split_digits(after_dot),
                None => ("", tail),
            };
            if whole.is_empty() && fraction.is_empty() {
                return Err(invalid());
            }

            let unit_len = tail
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_len);
            let scale = match unit {
                "ns" => NANOSECOND,
                "us" | "µs" | "μs" => MICROSECOND,
                "ms" => MILLISECOND,
                "s" => SECOND,
                "m" => MINUTE,
                "h" => HOUR,
                _ => return Err(invalid()),
            };

            let whole: u128 = if whole.is_empty() {
                0
            } else {
                whole.parse().map_err(|_| invalid())?
            };
            let mut amount = whole.checked_mul(scale).ok_or_else(invalid)?;

            // sub-nanosecond precision is truncated
            let mut numerator: u128 = 0;
            let mut denominator: u128 = 1;
            for digit in fraction.bytes().take(18) {
                numerator = numerator * 10 + u128::from(digit - b'0');
                denominator *= 10;
            }
            amount = amount
                .checked_add(numerator * scale / denominator)
                .ok_or_else(invalid)?;

            total = total.checked_add(amount).ok_or_else(invalid)?;
            if total > limit {
                return Err(invalid());
            }
            rest = tail;
        }

        let total = i128::try_from(total).map_err(|_| invalid())?;
        let nanos = if negative { -total } else { total };
        i64::try_from(nanos).map(Self).map_err(|_| invalid())
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let len = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> i64 {
        s.parse::<Lifetime>()
            .unwrap_or_else(|e| panic!("failed to parse {s}: {e}"))
            .as_nanos()
    }

    #[test]
    fn test_parse_single_unit() {
        assert_eq!(parse("1m"), 60_000_000_000);
        assert_eq!(parse("10s"), 10_000_000_000);
        assert_eq!(parse("250ms"), 250_000_000);
        assert_eq!(parse("3us"), 3_000);
        assert_eq!(parse("3µs"), 3_000);
        assert_eq!(parse("3μs"), 3_000);
        assert_eq!(parse("7ns"), 7);
        assert_eq!(parse("2h"), 7_200_000_000_000);
    }

    #[test]
    fn test_parse_compound_and_fraction() {
        assert_eq!(parse("1h30m"), 5_400_000_000_000);
        assert_eq!(parse("1.5s"), 1_500_000_000);
        assert_eq!(parse(".5s"), 500_000_000);
        assert_eq!(parse("1m0.25s"), 60_250_000_000);
    }

    #[test]
    fn test_parse_sign_and_zero() {
        assert_eq!(parse("0"), 0);
        assert_eq!(parse("-0"), 0);
        assert_eq!(parse("0s"), 0);
        assert_eq!(parse("-5s"), -5_000_000_000);
        assert_eq!(parse("+5s"), 5_000_000_000);
    }

    #[test]
    fn test_parse_invalid() {
        for input in [
            "",
            "-",
            "10",
            "1x",
            "s",
            "1.s.",
            "1m-5s",
            "abc",
            "9999999999999h",
            "94522879700260684295381835.999999999999999999h",
        ] {
            assert!(
                input.parse::<Lifetime>().is_err(),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(parse("9223372036854775807ns"), i64::MAX);
        assert_eq!(parse("-9223372036854775808ns"), i64::MIN);
        assert!("9223372036854775808ns".parse::<Lifetime>().is_err());
    }

    #[test]
    fn test_parse_fraction_overflow_is_rejected() {
        // the integer part alone fits, adding the fraction does not
        let error = "94522879700260684295381835.999999999999999999h"
            .parse::<Lifetime>()
            .unwrap_err();
        assert!(matches!(error, configuration::Error::InvalidLifetime(_)));
    }

    #[test]
    fn test_expires_after() {
        let now = Instant::now();
        assert_eq!(
            Lifetime::from_secs(10).expires_after(now),
            Some(now + Duration::from_secs(10))
        );
        assert_eq!(Lifetime::from_nanos(0).expires_after(now), Some(now));

        let deadline = Lifetime::from_secs(-10).expires_after(now).unwrap();
        assert!(deadline <= now);
    }

    #[test]
    fn test_wire_representation() {
        let lifetime: Lifetime = serde_json::from_str("-1500").unwrap();
        assert_eq!(lifetime, Lifetime::from_nanos(-1500));
        assert_eq!(serde_json::to_string(&Lifetime::from_secs(1)).unwrap(), "1000000000");
    }
}
