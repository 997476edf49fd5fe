//! Freshness windows for cached responses.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How long a stored response stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidDuration {
    /// Never written, never read.
    Never,
    /// Readable regardless of age.
    #[default]
    Forever,
    /// Readable while `now - stored_at <= duration`.
    For(Duration),
}

impl ValidDuration {
    /// Convert from the millisecond encoding where `0` is never and any
    /// negative value is forever.
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            0 => ValidDuration::Never,
            m if m < 0 => ValidDuration::Forever,
            m => ValidDuration::For(Duration::from_millis(m as u64)),
        }
    }

    /// Inverse of [`ValidDuration::from_millis`].
    pub fn as_millis(&self) -> i64 {
        match self {
            ValidDuration::Never => 0,
            ValidDuration::Forever => -1,
            ValidDuration::For(d) => d.as_millis().min(i64::MAX as u128) as i64,
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, ValidDuration::Never)
    }

    /// Whether an entry stored at `stored_at_millis` is readable at `now_millis`.
    pub fn is_fresh(&self, stored_at_millis: i64, now_millis: i64) -> bool {
        match self {
            ValidDuration::Never => false,
            ValidDuration::Forever => true,
            ValidDuration::For(_) => now_millis.saturating_sub(stored_at_millis) <= self.as_millis(),
        }
    }
}

impl fmt::Display for ValidDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidDuration::Never => f.write_str("never"),
            ValidDuration::Forever => f.write_str("forever"),
            ValidDuration::For(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

impl FromStr for ValidDuration {
    type Err = String;

    /// Parses `never`, `forever`, or a number with an optional unit
    /// (`ms`, `s`, `m`, `h`, `d`). A bare number is seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "never" => return Ok(ValidDuration::Never),
            "forever" => return Ok(ValidDuration::Forever),
            _ => {}
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("invalid duration '{}'", s))?;
        let millis = match unit {
            "ms" => value,
            "" | "s" => value.saturating_mul(1_000),
            "m" => value.saturating_mul(60_000),
            "h" => value.saturating_mul(3_600_000),
            "d" => value.saturating_mul(86_400_000),
            other => return Err(format!("unknown duration unit '{}' in '{}'", other, s)),
        };
        if millis == 0 {
            Ok(ValidDuration::Never)
        } else {
            Ok(ValidDuration::For(Duration::from_millis(millis)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_encoding() {
        assert_eq!(ValidDuration::from_millis(0), ValidDuration::Never);
        assert_eq!(ValidDuration::from_millis(-1), ValidDuration::Forever);
        assert_eq!(
            ValidDuration::from_millis(1500),
            ValidDuration::For(Duration::from_millis(1500))
        );
        assert_eq!(ValidDuration::Forever.as_millis(), -1);
    }

    #[test]
    fn test_freshness_boundary() {
        let d = ValidDuration::For(Duration::from_millis(1_000));
        let stored = 50_000;
        assert!(d.is_fresh(stored, stored + 999));
        assert!(d.is_fresh(stored, stored + 1_000));
        assert!(!d.is_fresh(stored, stored + 1_001));
    }

    #[test]
    fn test_never_and_forever() {
        assert!(!ValidDuration::Never.is_fresh(0, 0));
        assert!(ValidDuration::Forever.is_fresh(0, i64::MAX));
    }

    #[test]
    fn test_parse() {
        assert_eq!("never".parse::<ValidDuration>().unwrap(), ValidDuration::Never);
        assert_eq!("Forever".parse::<ValidDuration>().unwrap(), ValidDuration::Forever);
        assert_eq!(
            "90".parse::<ValidDuration>().unwrap(),
            ValidDuration::For(Duration::from_secs(90))
        );
        assert_eq!(
            "2h".parse::<ValidDuration>().unwrap(),
            ValidDuration::For(Duration::from_secs(7_200))
        );
        assert_eq!(
            "250ms".parse::<ValidDuration>().unwrap(),
            ValidDuration::For(Duration::from_millis(250))
        );
        assert_eq!("0s".parse::<ValidDuration>().unwrap(), ValidDuration::Never);
        assert!("5 weeks".parse::<ValidDuration>().is_err());
        assert!("abc".parse::<ValidDuration>().is_err());
    }
}
