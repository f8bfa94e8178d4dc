#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::{FormatError, StoreError, TestCase, TestSuite};
use crate::constants::{TEST_CASE_EXT, TEST_CASES_DIR, TEST_SUITE_EXT, TEST_SUITES_DIR};

/// Everything found under a save folder.
#[derive(Debug, Default)]
pub struct Loaded {
    /// Test cases, ordered by filename.
    pub test_cases: Vec<TestCase>,
    /// Suites, ordered by filename.
    pub suites:     Vec<TestSuite>,
}

/// The test case folder under `base_dir`: an existing one matched ignoring
/// case, else the canonical `test-cases/`.
pub fn test_cases_dir(base_dir: &Path) -> PathBuf {
    find_dir_case_insensitive(base_dir, TEST_CASES_DIR)
        .unwrap_or_else(|| base_dir.join(TEST_CASES_DIR))
}

/// The suite folder under `base_dir`: an existing one matched ignoring case,
/// else the canonical `test-suites/`.
pub fn test_suites_dir(base_dir: &Path) -> PathBuf {
    find_dir_case_insensitive(base_dir, TEST_SUITES_DIR)
        .unwrap_or_else(|| base_dir.join(TEST_SUITES_DIR))
}

/// Where `case` is stored under `base_dir`.
pub fn test_case_path(case: &TestCase, base_dir: &Path) -> PathBuf {
    test_cases_dir(base_dir).join(case.filename())
}

/// Where `suite` is stored under `base_dir`.
pub fn test_suite_path(suite: &TestSuite, base_dir: &Path) -> PathBuf {
    test_suites_dir(base_dir).join(suite.filename())
}

/// Rejects values that would spill into the next line of a record.
fn single_line(title: &str, field: &'static str, value: &str) -> Result<(), FormatError> {
    if value.contains(['\n', '\r']) {
        Err(FormatError::MultilineField {
            title: title.to_string(),
            field,
        })
    } else {
        Ok(())
    }
}

/// Writes `lines` newline-terminated to `path`, creating its parent folder.
fn write_lines<'a>(path: &Path, lines: impl IntoIterator<Item = &'a str>) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut contents = String::new();
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }

    fs::write(path, contents).map_err(|e| StoreError::io(path, e))
}

/// Saves `case` as a four line record: title, type, input, expected output.
///
/// Returns the path written.
pub fn save_test_case(case: &TestCase, base_dir: &Path) -> Result<PathBuf, StoreError> {
    single_line(&case.title, "title", &case.title)?;
    single_line(&case.title, "input", &case.input_data)?;
    single_line(&case.title, "expected output", &case.expected_output)?;

    let path = test_case_path(case, base_dir);
    let kind = case.kind.to_string();
    write_lines(
        &path,
        [
            case.title.as_str(),
            kind.as_str(),
            case.input_data.as_str(),
            case.expected_output.as_str(),
        ],
    )?;

    debug!("saved test case {} to {}", case.title, path.display());
    Ok(path)
}

/// Loads a test case record. Lines past the fourth are ignored.
pub fn load_test_case(path: &Path) -> Result<TestCase, StoreError> {
    let contents = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let lines: Vec<&str> = contents.lines().collect();

    if lines.len() < 4 {
        return Err(FormatError::TooFewLines {
            path:  path.to_path_buf(),
            found: lines.len(),
        }
        .into());
    }

    Ok(TestCase {
        title:           lines[0].to_string(),
        kind:            lines[1].parse().unwrap_or_default(),
        input_data:      lines[2].to_string(),
        expected_output: lines[3].to_string(),
    })
}

/// Saves `suite` as its title followed by one test case filename per line.
///
/// Returns the path written.
pub fn save_test_suite(suite: &TestSuite, base_dir: &Path) -> Result<PathBuf, StoreError> {
    single_line(suite.title(), "title", suite.title())?;

    let path = test_suite_path(suite, base_dir);
    write_lines(
        &path,
        std::iter::once(suite.title()).chain(suite.test_case_refs().iter().map(String::as_str)),
    )?;

    debug!("saved test suite {} to {}", suite.title(), path.display());
    Ok(path)
}

/// Loads a suite file. Blank reference lines are ignored.
pub fn load_test_suite(path: &Path) -> Result<TestSuite, StoreError> {
    let contents = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let mut lines = contents.lines();

    let Some(title) = lines.next() else {
        return Err(FormatError::EmptySuite {
            path: path.to_path_buf(),
        }
        .into());
    };

    let mut suite = TestSuite::new(title);
    for line in lines {
        suite.add_test_case_ref(line.trim());
    }

    Ok(suite)
}

/// Finds the child folder of `parent` whose name equals `name` ignoring case.
fn find_dir_case_insensitive(parent: &Path, name: &str) -> Option<PathBuf> {
    let exact = parent.join(name);
    if exact.is_dir() {
        return Some(exact);
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(parent)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    dirs.into_iter().find(|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    })
}

/// Lists files in `dir` ending in `.{extension}`, sorted by name.
fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("could not read {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == extension))
        .collect();
    files.sort();
    files
}

/// Loads every test case and suite under `base_dir`.
///
/// A malformed or unreadable file is logged and skipped; it never fails the
/// whole scan. Missing folders simply yield nothing.
pub fn load_all(base_dir: &Path) -> Loaded {
    let mut loaded = Loaded::default();

    match find_dir_case_insensitive(base_dir, TEST_CASES_DIR) {
        Some(dir) => {
            for path in files_with_extension(&dir, TEST_CASE_EXT) {
                match load_test_case(&path) {
                    Ok(case) => loaded.test_cases.push(case),
                    Err(e) => warn!("Error loading test case: {} - {e}", path.display()),
                }
            }
        }
        None => debug!("no {TEST_CASES_DIR} folder under {}", base_dir.display()),
    }

    match find_dir_case_insensitive(base_dir, TEST_SUITES_DIR) {
        Some(dir) => {
            for path in files_with_extension(&dir, TEST_SUITE_EXT) {
                match load_test_suite(&path) {
                    Ok(suite) => loaded.suites.push(suite),
                    Err(e) => warn!("Error loading test suite: {} - {e}", path.display()),
                }
            }
        }
        None => debug!("no {TEST_SUITES_DIR} folder under {}", base_dir.display()),
    }

    loaded
}
