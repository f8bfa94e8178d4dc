#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt::Display, str::FromStr, sync::Arc};

use tracing::debug;

use super::parser::SourceTree;
use crate::constants::{MAIN_METHOD_QUERY, MAIN_SIGNATURE_TOKENS};

/// Decides whether a source file is a runnable entry point.
pub trait EntryPointDetector: Send + Sync {
    /// Returns true if `source` declares a program entry point.
    fn is_entry_point(&self, source: &str) -> bool;
}

/// Accepts a file if one line holds every token of `public static void main(`.
///
/// Purely textual, so a signature inside a comment or string literal counts
/// too.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineTokenDetector;

impl EntryPointDetector for LineTokenDetector {
    fn is_entry_point(&self, source: &str) -> bool {
        source.lines().map(str::trim).any(|line| {
            MAIN_SIGNATURE_TOKENS
                .iter()
                .all(|token| line.contains(token))
        })
    }
}

/// Accepts a file if its syntax tree has a `public static void main` method.
///
/// Comments and string literals are ignored. Files that fail to parse are
/// rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxDetector;

impl EntryPointDetector for SyntaxDetector {
    fn is_entry_point(&self, source: &str) -> bool {
        let matches = match SourceTree::parse(source).and_then(|tree| tree.query(MAIN_METHOD_QUERY)) {
            Ok(matches) => matches,
            Err(e) => {
                debug!("syntax detector could not query source: {e:#}");
                return false;
            }
        };

        matches.iter().any(|m| {
            let is_main = m.get("name").is_some_and(|name| name == "main");
            let modifiers: Vec<&str> = m
                .get("modifiers")
                .map(|text| text.split_whitespace().collect())
                .unwrap_or_default();
            is_main && modifiers.contains(&"public") && modifiers.contains(&"static")
        })
    }
}

/// Which [`EntryPointDetector`] to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetectorKind {
    /// [`LineTokenDetector`]
    #[default]
    Line,
    /// [`SyntaxDetector`]
    Syntax,
}

impl DetectorKind {
    /// Builds the detector this kind names.
    pub fn detector(self) -> Arc<dyn EntryPointDetector> {
        match self {
            DetectorKind::Line => Arc::new(LineTokenDetector),
            DetectorKind::Syntax => Arc::new(SyntaxDetector),
        }
    }
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(DetectorKind::Line),
            "syntax" => Ok(DetectorKind::Syntax),
            other => Err(format!("unknown detector `{other}`, expected `line` or `syntax`")),
        }
    }
}

impl Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorKind::Line => f.write_str("line"),
            DetectorKind::Syntax => f.write_str("syntax"),
        }
    }
}
