//! Tokens describing blocks the store is still missing.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;

/// Unresolved gaps, deduplicated, in insertion order.
pub type MissingSet = IndexSet<MissingToken>;

/// A single missing block, or a `first-last` sub-range requested as one
/// batch.
///
/// Range tokens come from batch requests that returned nothing: the whole
/// sub-range is unaccounted for without knowing which individual numbers
/// exist. `last` is exclusive, matching the next batch cursor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MissingToken {
    Single(u64),
    Range { first: u64, last: u64 },
}

impl fmt::Display for MissingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingToken::Single(number) => write!(f, "{number}"),
            MissingToken::Range { first, last } => write!(f, "{first}-{last}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidToken(pub String);

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid missing-block token [{}]", self.0)
    }
}

impl std::error::Error for InvalidToken {}

impl FromStr for MissingToken {
    type Err = InvalidToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((first, last)) => {
                let first = first.parse().map_err(|_| InvalidToken(s.to_string()))?;
                let last = last.parse().map_err(|_| InvalidToken(s.to_string()))?;
                Ok(MissingToken::Range { first, last })
            }
            None => s
                .parse()
                .map(MissingToken::Single)
                .map_err(|_| InvalidToken(s.to_string())),
        }
    }
}
