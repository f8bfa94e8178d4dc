#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use super::{StoreError, TestCase, TestSuite, codec};

/// The global pool of test cases and the catalog of suites, optionally backed
/// by a save folder.
///
/// Suites hold filenames, not copies, so one test case may be shared by many
/// suites. The pool is single-writer; the last write wins.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    /// Folder holding `test-cases/` and `test-suites/`.
    save_folder: Option<PathBuf>,
    /// Every known test case.
    test_cases:  Vec<TestCase>,
    /// Every known suite.
    suites:      Vec<TestSuite>,
}

impl Workspace {
    /// Opens `save_folder`, eagerly loading every test case and suite in it.
    pub fn open(save_folder: impl Into<PathBuf>) -> Self {
        let save_folder = save_folder.into();
        let loaded = codec::load_all(&save_folder);
        info!(
            "loaded {} test case(s) and {} suite(s) from {}",
            loaded.test_cases.len(),
            loaded.suites.len(),
            save_folder.display()
        );

        let mut workspace = Self {
            save_folder: Some(save_folder),
            ..Self::default()
        };
        for case in loaded.test_cases {
            workspace.insert_test_case(case);
        }
        for suite in loaded.suites {
            workspace.add_suite(suite);
        }
        workspace
    }

    /// The configured save folder, if any.
    pub fn save_folder(&self) -> Option<&Path> {
        self.save_folder.as_deref()
    }

    /// Returns the save folder or [`StoreError::NoSaveFolder`].
    fn require_save_folder(&self) -> Result<&Path, StoreError> {
        self.save_folder().ok_or(StoreError::NoSaveFolder)
    }

    /// Adds `case` to the pool, replacing one with the same filename.
    fn insert_test_case(&mut self, case: TestCase) {
        let filename = case.filename();
        match self.test_cases.iter().position(|c| c.filename() == filename) {
            Some(index) => self.test_cases[index] = case,
            None => self.test_cases.push(case),
        }
    }

    /// Persists `case` and adds it to the pool.
    pub fn save_test_case(&mut self, case: TestCase) -> Result<PathBuf, StoreError> {
        let path = codec::save_test_case(&case, self.require_save_folder()?)?;
        self.insert_test_case(case);
        Ok(path)
    }

    /// All test cases in the pool.
    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    /// Looks a test case up by storage filename.
    pub fn test_case_by_filename(&self, filename: &str) -> Option<&TestCase> {
        self.test_cases.iter().find(|c| c.filename() == filename)
    }

    /// Looks a test case up by title.
    pub fn test_case_by_title(&self, title: &str) -> Option<&TestCase> {
        self.test_cases.iter().find(|c| c.title == title)
    }

    /// Filenames of every test case in the pool.
    pub fn available_test_case_filenames(&self) -> Vec<String> {
        self.test_cases.iter().map(TestCase::filename).collect()
    }

    /// Removes a test case from the pool and deletes its file.
    ///
    /// Suites keep referencing the filename; resolving it simply fails from
    /// now on.
    pub fn remove_test_case(&mut self, filename: &str) -> Result<TestCase, StoreError> {
        let index = self
            .test_cases
            .iter()
            .position(|c| c.filename() == filename)
            .ok_or_else(|| StoreError::UnknownTestCase(filename.to_string()))?;
        let case = self.test_cases.remove(index);

        if let Some(folder) = self.save_folder() {
            remove_if_present(&codec::test_case_path(&case, folder))?;
        }
        Ok(case)
    }

    /// Gives a test case a new title.
    ///
    /// Since the filename follows the title, the record is moved: the new file
    /// is written, the old one deleted, and every suite referring to the old
    /// filename is updated in place and saved again. A title whose filename
    /// belongs to another test case is rejected before anything is written.
    ///
    /// Returns the new filename.
    pub fn rename_test_case(
        &mut self,
        filename: &str,
        new_title: impl Into<String>,
    ) -> Result<String, StoreError> {
        let mut case = self
            .test_case_by_filename(filename)
            .cloned()
            .ok_or_else(|| StoreError::UnknownTestCase(filename.to_string()))?;
        case.title = new_title.into();
        let new_filename = case.filename();

        if new_filename != filename && self.test_case_by_filename(&new_filename).is_some() {
            return Err(StoreError::DuplicateTestCase(new_filename));
        }

        if let Some(folder) = self.save_folder.clone() {
            codec::save_test_case(&case, &folder)?;
            if new_filename != filename {
                remove_if_present(&codec::test_cases_dir(&folder).join(filename))?;
            }
        }

        self.test_cases.retain(|c| c.filename() != filename);
        self.insert_test_case(case);

        if new_filename != filename {
            let mut touched = Vec::new();
            for suite in &mut self.suites {
                if suite.replace_test_case_ref(filename, &new_filename) {
                    touched.push(suite.clone());
                }
            }
            if let Some(folder) = self.save_folder() {
                for suite in &touched {
                    codec::save_test_suite(suite, folder)?;
                }
            }
            debug!("renamed {filename} to {new_filename} in {} suite(s)", touched.len());
        }

        Ok(new_filename)
    }

    /// Adds a suite unless one with the same title exists.
    ///
    /// Returns true if it was added.
    pub fn add_suite(&mut self, suite: TestSuite) -> bool {
        if self.suite_by_title(suite.title()).is_some() {
            return false;
        }
        self.suites.push(suite);
        true
    }

    /// Creates an empty suite and adds it to the catalog. An existing suite
    /// with the same title is returned as is.
    pub fn create_test_suite(&mut self, title: impl Into<String>) -> &mut TestSuite {
        let title = title.into();
        let index = match self.suites.iter().position(|s| s.title() == title) {
            Some(index) => index,
            None => {
                self.suites.push(TestSuite::new(title));
                self.suites.len() - 1
            }
        };
        &mut self.suites[index]
    }

    /// Persists the suite with the given title.
    pub fn save_test_suite(&self, title: &str) -> Result<PathBuf, StoreError> {
        let folder = self.require_save_folder()?;
        let suite = self
            .suite_by_title(title)
            .ok_or_else(|| StoreError::UnknownSuite(title.to_string()))?;
        codec::save_test_suite(suite, folder)
    }

    /// All suites.
    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    /// Looks a suite up by title.
    pub fn suite_by_title(&self, title: &str) -> Option<&TestSuite> {
        self.suites.iter().find(|s| s.title() == title)
    }

    /// Mutable access to a suite, for editing its references.
    pub fn suite_mut(&mut self, title: &str) -> Option<&mut TestSuite> {
        self.suites.iter_mut().find(|s| s.title() == title)
    }

    /// Removes a suite and deletes its file. Test cases are left alone.
    pub fn remove_suite(&mut self, title: &str) -> Result<TestSuite, StoreError> {
        let index = self
            .suites
            .iter()
            .position(|s| s.title() == title)
            .ok_or_else(|| StoreError::UnknownSuite(title.to_string()))?;
        let suite = self.suites.remove(index);

        if let Some(folder) = self.save_folder() {
            remove_if_present(&codec::test_suite_path(&suite, folder))?;
        }
        Ok(suite)
    }

    /// Resolves a suite's references against the pool, in suite order.
    pub fn resolve(&self, suite: &TestSuite) -> Vec<TestCase> {
        suite.resolve(&self.test_cases).into_iter().cloned().collect()
    }
}

/// Deletes `path`, treating "already gone" as success.
fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
