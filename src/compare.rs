#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{convert::Infallible, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::constants::DOUBLE_EPSILON;

/// How the actual output of a run is compared with the expected output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonType {
    /// No type was given; compared as a string.
    #[default]
    Unset,
    /// Exact string equality.
    String,
    /// Case-insensitive equality.
    Boolean,
    /// Integer equality.
    Int,
    /// Floating point equality within [`DOUBLE_EPSILON`].
    Double,
    /// A type name this crate does not know; compared as a string but kept
    /// verbatim so it survives a save.
    Other(String),
}

impl FromStr for ComparisonType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "" => ComparisonType::Unset,
            "string" => ComparisonType::String,
            "boolean" => ComparisonType::Boolean,
            "int" => ComparisonType::Int,
            "double" => ComparisonType::Double,
            _ => ComparisonType::Other(trimmed.to_string()),
        })
    }
}

impl Display for ComparisonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonType::Unset => Ok(()),
            ComparisonType::String => f.write_str("String"),
            ComparisonType::Boolean => f.write_str("Boolean"),
            ComparisonType::Int => f.write_str("Int"),
            ComparisonType::Double => f.write_str("Double"),
            ComparisonType::Other(name) => f.write_str(name),
        }
    }
}

/// Returns true if `actual` matches `expected` under `kind`.
///
/// Both sides are trimmed first. A side that fails to parse as a number
/// never matches; it is not an error.
pub fn compare(actual: &str, expected: &str, kind: &ComparisonType) -> bool {
    let actual = actual.trim();
    let expected = expected.trim();

    match kind {
        ComparisonType::Boolean => actual.eq_ignore_ascii_case(expected),
        ComparisonType::Int => match (actual.parse::<i64>(), expected.parse::<i64>()) {
            (Ok(a), Ok(e)) => a == e,
            _ => false,
        },
        ComparisonType::Double => match (actual.parse::<f64>(), expected.parse::<f64>()) {
            (Ok(a), Ok(e)) => (a - e).abs() < DOUBLE_EPSILON,
            _ => false,
        },
        ComparisonType::String | ComparisonType::Unset | ComparisonType::Other(_) => {
            actual == expected
        }
    }
}
