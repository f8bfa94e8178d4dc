#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Runs suites against batches of submissions.
pub mod orchestrator;
/// Rendering results for people and machines.
pub mod report;
/// Result rows and their statuses.
pub mod results;
/// The selected suite, save folder and root folder.
pub mod session;

use std::path::PathBuf;

pub use orchestrator::{Orchestrator, ResultStore};
pub use results::{RunSummary, TestResult, TestStatus};
pub use session::Session;

use crate::{discovery::DiscoveryError, exec::ExecError};

/// Why a run could not start or finish. Per-submission failures are
/// statuses, not errors.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    /// No suite has been selected.
    #[error("No test suite selected")]
    NoSuiteSelected,
    /// The selected suite does not exist.
    #[error("No test suite titled {0}")]
    UnknownSuite(String),
    /// No root folder has been set.
    #[error("Root folder not set")]
    NoRootFolder,
    /// The root folder is missing or not a directory.
    #[error("Root folder {} does not exist or is not a directory", .0.display())]
    RootNotDirectory(PathBuf),
    /// Discovery found nothing to grade.
    #[error("No valid submissions found")]
    NoSubmissions,
    /// The suite refers to no test case in the pool.
    #[error("Test suite {0} has no test cases")]
    NoTestCases(String),
    /// The run was cancelled before it finished.
    #[error("Run cancelled")]
    Cancelled,
}

impl From<DiscoveryError> for GradeError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::RootNotDirectory(path) => GradeError::RootNotDirectory(path),
        }
    }
}

impl From<ExecError> for GradeError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Cancelled => GradeError::Cancelled,
        }
    }
}
