#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use tracing::info;

use super::{GradeError, Orchestrator, TestResult};
use crate::{
    process::CancelToken,
    store::{TestSuite, Workspace},
};

/// What a grading session is pointed at: the workspace of test artifacts,
/// the folder of submissions, and the suite to run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Test cases and suites.
    workspace:     Workspace,
    /// Folder holding one subfolder per submission.
    root_folder:   Option<PathBuf>,
    /// Path inside each submission where sources live.
    code_path:     String,
    /// Title of the selected suite.
    current_suite: Option<String>,
}

impl Session {
    /// Starts a session over `workspace`.
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            ..Self::default()
        }
    }

    /// The test cases and suites.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Mutable access to the test cases and suites.
    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    /// Switches to another save folder and reloads everything from it.
    pub fn set_save_folder(&mut self, save_folder: impl Into<PathBuf>) {
        self.workspace = Workspace::open(save_folder);
    }

    /// The folder of submissions, if set.
    pub fn root_folder(&self) -> Option<&Path> {
        self.root_folder.as_deref()
    }

    /// Sets the folder of submissions.
    pub fn set_root_folder(&mut self, root_folder: impl Into<PathBuf>) {
        self.root_folder = Some(root_folder.into());
    }

    /// Path inside each submission where sources live.
    pub fn code_path(&self) -> &str {
        &self.code_path
    }

    /// Sets the path inside each submission where sources live.
    pub fn set_code_path(&mut self, code_path: impl Into<String>) {
        self.code_path = code_path.into();
    }

    /// Creates a suite (or finds the one with this title) and selects it.
    pub fn create_test_suite(&mut self, title: impl Into<String>) -> &mut TestSuite {
        let title = title.into();
        self.current_suite = Some(title.clone());
        self.workspace.create_test_suite(title)
    }

    /// Selects an existing suite.
    pub fn select_suite(&mut self, title: &str) -> Result<(), GradeError> {
        if self.workspace.suite_by_title(title).is_none() {
            return Err(GradeError::UnknownSuite(title.to_string()));
        }
        self.current_suite = Some(title.to_string());
        Ok(())
    }

    /// Selects the first suite of the workspace, if there is one.
    pub fn select_first_suite(&mut self) -> Option<&TestSuite> {
        let suite = self.workspace.suites().first()?;
        self.current_suite = Some(suite.title().to_string());
        Some(suite)
    }

    /// The selected suite, if it exists.
    pub fn current_suite(&self) -> Option<&TestSuite> {
        self.workspace.suite_by_title(self.current_suite.as_deref()?)
    }

    /// Runs the selected suite on every submission under the root folder.
    ///
    /// Configuration is checked first, in order: a suite is selected and
    /// exists, a root folder is set and is a directory. Then discovery must
    /// find a submission and the suite must resolve to a test case.
    pub async fn execute_current_suite(
        &self,
        orchestrator: &Orchestrator,
        cancel: &CancelToken,
    ) -> Result<Vec<TestResult>, GradeError> {
        let title = self
            .current_suite
            .as_deref()
            .ok_or(GradeError::NoSuiteSelected)?;
        let suite = self
            .workspace
            .suite_by_title(title)
            .ok_or_else(|| GradeError::UnknownSuite(title.to_string()))?;
        let root = self.root_folder().ok_or(GradeError::NoRootFolder)?;
        if !root.is_dir() {
            return Err(GradeError::RootNotDirectory(root.to_path_buf()));
        }

        let discovery = orchestrator.discover(root, &self.code_path).await?;
        let results = orchestrator
            .run_suite(suite, self.workspace.test_cases(), &discovery, cancel)
            .await?;
        info!("suite {title} finished with {} result(s)", results.len());
        Ok(results)
    }
}
