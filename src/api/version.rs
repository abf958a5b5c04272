//! Numeric dotted API version tokens.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A parsed API version such as `1.40`.
///
/// Ordering is component-wise; missing components compare as zero, so
/// `1.40` and `1.40.0` are equal.
#[derive(Debug, Clone)]
pub struct ApiVersion(Vec<u64>);

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ApiVersion {}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid api version token {0:?}")]
pub struct InvalidVersion(pub String);

impl FromStr for ApiVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(InvalidVersion(s.to_string()));
        }
        s.split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map(ApiVersion)
            .map_err(|_| InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_tokens() {
        assert_eq!("1.40".parse::<ApiVersion>().unwrap().to_string(), "1.40");
        assert_eq!("2".parse::<ApiVersion>().unwrap().to_string(), "2");
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert!("".parse::<ApiVersion>().is_err());
        assert!("v1.40".parse::<ApiVersion>().is_err());
        assert!("1.".parse::<ApiVersion>().is_err());
        assert!("1.x".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn orders_component_wise() {
        let v = |s: &str| s.parse::<ApiVersion>().unwrap();
        assert!(v("1.40") > v("1.12"));
        assert!(v("1.9") < v("1.12"));
        assert!(v("2.0") > v("1.99"));
        assert_eq!(v("1.40"), v("1.40.0"));
    }
}
