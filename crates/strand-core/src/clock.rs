//! Tuple logical clocks
//!
//! Every stored event carries a `created` tuple such as
//! `[millis, node_id, sequence]`. Tuples are compared element by element,
//! which gives a total order over events generated independently on
//! different replicas without relying on synchronized wall clocks.

use std::cmp::Ordering;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Compare two tuples lexicographically
///
/// Elements are compared pairwise from the left; the first difference
/// decides. When one tuple is a prefix of the other, the shorter one is
/// smaller.
pub fn compare_tuples<T: Ord>(a: &[T], b: &[T]) -> Ordering {
    for (left, right) in a.iter().zip(b.iter()) {
        match left.cmp(right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// One element of a tuple clock
///
/// Integers order before text; values of the same kind compare naturally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClockPart {
    Int(i64),
    Text(String),
}

impl Display for ClockPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for ClockPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ClockPart {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for ClockPart {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ClockPart {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The `created` logical timestamp of an event
///
/// Unique within one log; two insertions with equal tuples are the same
/// logical event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Created(Vec<ClockPart>);

impl Created {
    /// Create a tuple from its parts
    pub fn new(parts: Vec<ClockPart>) -> Self {
        Self(parts)
    }

    /// Get the tuple elements
    pub fn parts(&self) -> &[ClockPart] {
        &self.0
    }

    /// Number of elements in the tuple
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tuple has no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying parts
    pub fn into_parts(self) -> Vec<ClockPart> {
        self.0
    }
}

impl Ord for Created {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_tuples(&self.0, &other.0)
    }
}

impl PartialOrd for Created {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Created {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl From<Vec<ClockPart>> for Created {
    fn from(parts: Vec<ClockPart>) -> Self {
        Self(parts)
    }
}

impl<const N: usize> From<[i64; N]> for Created {
    fn from(values: [i64; N]) -> Self {
        Self(values.into_iter().map(ClockPart::Int).collect())
    }
}

impl FromIterator<ClockPart> for Created {
    fn from_iter<T: IntoIterator<Item = ClockPart>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
