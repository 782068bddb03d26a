//! Go-style duration strings used by the configuration file
//!
//! Supports the syntax of Go's `time.ParseDuration` ("10s", "1m10s",
//! "1h20m30s", "1.5h", "300ms"), which existing monitor configurations use.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid duration '{0}': expected format like 10s, 1m10s or 1h20m30s")]
    Invalid(String),

    #[error("unknown unit '{unit}' in duration '{input}'")]
    UnknownUnit { input: String, unit: String },

    #[error("duration '{0}' is out of range")]
    Overflow(String),
}

/// A configured duration that reads and writes Go duration syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ConfigDuration(Duration);

impl ConfigDuration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Duration> for ConfigDuration {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

impl FromStr for ConfigDuration {
    type Err = DurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || DurationError::Invalid(input.to_string());

        let s = input.strip_prefix('+').unwrap_or(input);
        if s == "0" {
            return Ok(Self::default());
        }
        if s.is_empty() || s.starts_with('-') {
            return Err(invalid());
        }

        let mut total: u128 = 0;
        let mut rest = s;
        while !rest.is_empty() {
            let whole_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            let (whole, after_whole) = rest.split_at(whole_len);

            let (fraction, after_number) = match after_whole.strip_prefix('.') {
                Some(tail) => {
                    let len = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
                    tail.split_at(len)
                }
                None => ("", after_whole),
            };
            if whole.is_empty() && fraction.is_empty() {
                return Err(invalid());
            }

            let unit_len = after_number
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(after_number.len());
            let (unit, tail) = after_number.split_at(unit_len);
            if unit.is_empty() {
                return Err(invalid());
            }
            let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
                input: input.to_string(),
                unit: unit.to_string(),
            })?;

            let whole_value: u128 = if whole.is_empty() {
                0
            } else {
                whole
                    .parse()
                    .map_err(|_| DurationError::Overflow(input.to_string()))?
            };

            // Digits beyond nanosecond precision of an hour cannot matter
            let fraction = &fraction[..fraction.len().min(18)];
            let fraction_value: u128 = if fraction.is_empty() {
                0
            } else {
                let digits: u128 = fraction.parse().map_err(|_| invalid())?;
                digits * scale / 10u128.pow(fraction.len() as u32)
            };

            total = whole_value
                .checked_mul(scale)
                .and_then(|nanos| nanos.checked_add(fraction_value))
                .and_then(|nanos| total.checked_add(nanos))
                .ok_or_else(|| DurationError::Overflow(input.to_string()))?;
            rest = tail;
        }

        let nanos = u64::try_from(total).map_err(|_| DurationError::Overflow(input.to_string()))?;
        Ok(Self(Duration::from_nanos(nanos)))
    }
}

/// Format `whole.fraction` with trailing zeros of the fraction removed
fn write_fraction(
    f: &mut fmt::Formatter<'_>,
    whole: u128,
    fraction: u128,
    digits: usize,
) -> fmt::Result {
    if fraction == 0 {
        return write!(f, "{}", whole);
    }
    let padded = format!("{:0width$}", fraction, width = digits);
    write!(f, "{}.{}", whole, padded.trim_end_matches('0'))
}

impl fmt::Display for ConfigDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();

        if nanos == 0 {
            return f.write_str("0s");
        }
        if nanos < NANOS_PER_MICRO {
            return write!(f, "{}ns", nanos);
        }
        if nanos < NANOS_PER_MILLI {
            write_fraction(f, nanos / NANOS_PER_MICRO, nanos % NANOS_PER_MICRO, 3)?;
            return f.write_str("µs");
        }
        if nanos < NANOS_PER_SECOND {
            write_fraction(f, nanos / NANOS_PER_MILLI, nanos % NANOS_PER_MILLI, 6)?;
            return f.write_str("ms");
        }

        let hours = nanos / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
        let seconds = nanos % NANOS_PER_MINUTE;

        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        write_fraction(
            f,
            seconds / NANOS_PER_SECOND,
            seconds % NANOS_PER_SECOND,
            9,
        )?;
        f.write_str("s")
    }
}

impl Serialize for ConfigDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// JSON numbers are nanoseconds, strings use Go duration syntax
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Nanos(u64),
    Fractional(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for ConfigDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Nanos(nanos) => Ok(Self(Duration::from_nanos(nanos))),
            RawDuration::Fractional(value) if value.is_finite() && value >= 0.0 => {
                Ok(Self(Duration::from_nanos(value as u64)))
            }
            RawDuration::Fractional(value) => Err(serde::de::Error::custom(format!(
                "invalid duration {}",
                value
            ))),
            RawDuration::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10s", Duration::from_secs(10))]
    #[case("1h10m50s", Duration::from_secs(3600 + 600 + 50))]
    #[case("1m10s", Duration::from_secs(70))]
    #[case("1.5h", Duration::from_secs(5400))]
    #[case("300ms", Duration::from_millis(300))]
    #[case("2us", Duration::from_micros(2))]
    #[case("2µs", Duration::from_micros(2))]
    #[case("15ns", Duration::from_nanos(15))]
    #[case(".5s", Duration::from_millis(500))]
    #[case("0", Duration::ZERO)]
    #[case("+5m", Duration::from_secs(300))]
    fn parse_accepts_go_duration_syntax(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(input.parse::<ConfigDuration>().unwrap().as_duration(), expected);
    }

    #[rstest]
    #[case("error")]
    #[case("")]
    #[case("10")]
    #[case("-1s")]
    #[case("s")]
    #[case(".s")]
    fn parse_rejects_malformed_input(#[case] input: &str) {
        assert!(matches!(
            input.parse::<ConfigDuration>(),
            Err(DurationError::Invalid(_))
        ));
    }

    #[test]
    fn parse_rejects_unknown_unit() {
        let result = "10d".parse::<ConfigDuration>();

        assert_eq!(
            result,
            Err(DurationError::UnknownUnit {
                input: "10d".to_string(),
                unit: "d".to_string(),
            })
        );
    }

    #[test]
    fn parse_rejects_overflow() {
        assert!(matches!(
            "99999999999999999999h".parse::<ConfigDuration>(),
            Err(DurationError::Overflow(_))
        ));
    }

    #[rstest]
    #[case(Duration::from_secs(3600 + 600 + 50), "1h10m50s")]
    #[case(Duration::from_secs(10), "10s")]
    #[case(Duration::from_secs(3600), "1h0m0s")]
    #[case(Duration::from_secs(60), "1m0s")]
    #[case(Duration::from_millis(1), "1ms")]
    #[case(Duration::from_millis(1500), "1.5s")]
    #[case(Duration::from_micros(1500), "1.5ms")]
    #[case(Duration::from_nanos(10), "10ns")]
    #[case(Duration::ZERO, "0s")]
    fn display_uses_go_format(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(ConfigDuration::from(duration).to_string(), expected);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&ConfigDuration::from_secs(10)).unwrap();

        assert_eq!(json, "\"10s\"");
    }

    #[test]
    fn deserializes_integer_as_nanoseconds() {
        let duration: ConfigDuration = serde_json::from_str("10").unwrap();

        assert_eq!(duration.as_duration(), Duration::from_nanos(10));
    }

    #[test]
    fn deserializes_float_by_truncating_to_nanoseconds() {
        let duration: ConfigDuration = serde_json::from_str("1.123").unwrap();

        assert_eq!(duration.as_duration(), Duration::from_nanos(1));
    }

    #[test]
    fn deserializes_duration_string() {
        let duration: ConfigDuration = serde_json::from_str("\"1ms\"").unwrap();

        assert_eq!(duration.as_duration(), Duration::from_millis(1));
    }

    #[test]
    fn deserialize_rejects_unparsable_string() {
        assert!(serde_json::from_str::<ConfigDuration>("\"soon\"").is_err());
    }
}
