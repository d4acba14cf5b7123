//! Regex-backed path filters.
//!
//! Patterns are searched, not anchored, against `/`-separated paths relative
//! to the project root: `\.py$` matches `src/a.py`.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A compiled path filter. Compiles while the document is deserialized so a
/// bad pattern is reported with its position.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    /// Pattern that matches every path.
    #[must_use]
    pub fn match_all() -> Self {
        Self(Regex::new("").unwrap_or_else(|_| unreachable!("empty regex compiles")))
    }

    /// Pattern that matches no non-empty path.
    #[must_use]
    pub fn match_none() -> Self {
        Self(Regex::new("^$").unwrap_or_else(|_| unreachable!("anchor regex compiles")))
    }

    /// Whether `path` contains a match.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.0.is_match(path)
    }

    /// The source text of the pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pattern {
    type Err = regex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw)
            .map_err(|e| serde::de::Error::custom(format!("invalid regex '{raw}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_semantics() {
        let p = Pattern::new(r"\.py$").unwrap();
        assert!(p.is_match("src/a.py"));
        assert!(!p.is_match("src/a.pyc"));
    }

    #[test]
    fn test_match_all_and_none() {
        assert!(Pattern::match_all().is_match("anything/at/all"));
        assert!(!Pattern::match_none().is_match("a.py"));
    }

    #[test]
    fn test_equality_is_by_source() {
        assert_eq!(Pattern::new("^docs/").unwrap(), Pattern::new("^docs/").unwrap());
        assert_ne!(Pattern::new("^docs/").unwrap(), Pattern::new("^doc/").unwrap());
    }

    #[test]
    fn test_deserialize_rejects_bad_regex() {
        let result: Result<Pattern, _> = serde_yaml::from_str("'(unclosed'");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("invalid regex"), "got: {err}");
    }
}
