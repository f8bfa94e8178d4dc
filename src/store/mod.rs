#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Reading and writing the line-oriented test case and suite formats.
pub mod codec;
/// The in-memory pool of test cases and catalog of suites.
pub mod workspace;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use codec::{
    Loaded, load_all, load_test_case, load_test_suite, save_test_case, save_test_suite,
    test_case_path, test_cases_dir, test_suite_path, test_suites_dir,
};
pub use workspace::Workspace;

use crate::{
    compare::ComparisonType,
    constants::{TEST_CASE_EXT, TEST_SUITE_EXT},
};

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A malformed `.testcase` or `.suite` file, or a record that cannot be
/// written in the line format.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// A test case file had fewer than the four required lines.
    #[error("{} has {found} line(s), a test case needs at least 4", path.display())]
    TooFewLines {
        /// offending file
        path:  PathBuf,
        /// number of lines actually present
        found: usize,
    },
    /// A suite file had no title line.
    #[error("{} is an empty test suite file", path.display())]
    EmptySuite {
        /// offending file
        path: PathBuf,
    },
    /// A field would span several lines and break the record layout.
    #[error("the {field} of `{title}` contains a line break, which the file format cannot hold")]
    MultilineField {
        /// title of the record being saved
        title: String,
        /// which field holds the line break
        field: &'static str,
    },
}

/// Errors raised while persisting or looking up test artifacts.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// An operation needed a save folder but none is configured.
    #[error("Save folder not set")]
    NoSaveFolder,
    /// A file did not follow the expected format.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// The filesystem refused a read or write.
    #[error("I/O error on {}", path.display())]
    Io {
        /// path being read or written
        path:   PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// No test case in the pool has this filename.
    #[error("No test case named {0}")]
    UnknownTestCase(String),
    /// No suite in the catalog has this title.
    #[error("No test suite titled {0}")]
    UnknownSuite(String),
    /// Another test case already uses this filename.
    #[error("A test case named {0} already exists")]
    DuplicateTestCase(String),
}

impl StoreError {
    /// Wraps an I/O error with the path it happened on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A named input paired with the output a correct program prints for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Title, also the source of the storage filename.
    pub title:           String,
    /// Data written to the program's standard input.
    pub input_data:      String,
    /// Output a correct program produces.
    pub expected_output: String,
    /// How actual and expected output are compared.
    pub kind:            ComparisonType,
}

impl TestCase {
    /// Creates a test case.
    pub fn new(
        title: impl Into<String>,
        input_data: impl Into<String>,
        expected_output: impl Into<String>,
        kind: ComparisonType,
    ) -> Self {
        Self {
            title: title.into(),
            input_data: input_data.into(),
            expected_output: expected_output.into(),
            kind,
        }
    }

    /// Storage filename, a pure function of the title.
    pub fn filename(&self) -> String {
        format!("{}.{TEST_CASE_EXT}", sanitize_filename(&self.title))
    }
}

/// A titled, ordered list of references to test case files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    /// Title, also the source of the storage filename.
    title:          String,
    /// Test case filenames in insertion order, without duplicates.
    test_case_refs: Vec<String>,
}

impl TestSuite {
    /// Creates an empty suite.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title:          title.into(),
            test_case_refs: Vec::new(),
        }
    }

    /// Returns the suite title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Storage filename, a pure function of the title.
    pub fn filename(&self) -> String {
        format!("{}.{TEST_SUITE_EXT}", sanitize_filename(&self.title))
    }

    /// Referenced test case filenames, in order.
    pub fn test_case_refs(&self) -> &[String] {
        &self.test_case_refs
    }

    /// Appends a reference. Empty and already present filenames are ignored.
    ///
    /// Returns true if the reference was added.
    pub fn add_test_case_ref(&mut self, filename: impl Into<String>) -> bool {
        let filename = filename.into();
        if filename.is_empty() || self.contains(&filename) {
            return false;
        }
        self.test_case_refs.push(filename);
        true
    }

    /// Removes a reference, returning true if it was present.
    pub fn remove_test_case_ref(&mut self, filename: &str) -> bool {
        let before = self.test_case_refs.len();
        self.test_case_refs.retain(|r| r != filename);
        before != self.test_case_refs.len()
    }

    /// Points a reference at a new filename, keeping its position.
    ///
    /// If `to` is already referenced the old entry is dropped instead.
    pub fn replace_test_case_ref(&mut self, from: &str, to: &str) -> bool {
        let Some(index) = self.test_case_refs.iter().position(|r| r == from) else {
            return false;
        };
        if self.contains(to) {
            self.test_case_refs.remove(index);
        } else {
            self.test_case_refs[index] = to.to_string();
        }
        true
    }

    /// Returns true if `filename` is referenced.
    pub fn contains(&self, filename: &str) -> bool {
        self.test_case_refs.iter().any(|r| r == filename)
    }

    /// Looks each reference up in `pool`, in suite order.
    ///
    /// References with no matching test case are skipped.
    pub fn resolve<'a>(&self, pool: &'a [TestCase]) -> Vec<&'a TestCase> {
        self.test_case_refs
            .iter()
            .filter_map(|filename| {
                let case = pool.iter().find(|c| &c.filename() == filename);
                if case.is_none() {
                    tracing::debug!("suite {} refers to missing test case {filename}", self.title);
                }
                case
            })
            .collect()
    }
}
