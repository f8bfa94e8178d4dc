#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::constants::NOT_APPLICABLE;

/// Outcome of one submission on one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    /// Output matched.
    Passed,
    /// Output did not match.
    Failed,
    /// The submission did not build.
    CompileError,
    /// The program could not be started or exited with a nonzero status.
    RuntimeError,
    /// The program was killed at its deadline.
    TimedOut,
    /// The submission has no entry point.
    Skipped,
}

impl TestStatus {
    /// Every status, in reporting order.
    pub const ALL: [TestStatus; 6] = [
        TestStatus::Passed,
        TestStatus::Failed,
        TestStatus::CompileError,
        TestStatus::RuntimeError,
        TestStatus::TimedOut,
        TestStatus::Skipped,
    ];
}

impl Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
            TestStatus::CompileError => "COMPILE_ERROR",
            TestStatus::RuntimeError => "RUNTIME_ERROR",
            TestStatus::TimedOut => "TIMED_OUT",
            TestStatus::Skipped => "SKIPPED",
        })
    }
}

/// One row of a run: a submission, a test case, and what happened.
#[derive(Tabled, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Submission folder name.
    #[tabled(rename = "Submission")]
    pub submission_name: String,
    /// Test case title, or `N/A` for skipped submissions.
    #[tabled(rename = "Test case")]
    pub test_case_title: String,
    /// Outcome.
    #[tabled(rename = "Status")]
    pub status:          TestStatus,
    /// What the program (or compiler) printed.
    #[tabled(skip)]
    pub actual_output:   String,
    /// What the test case expected.
    #[tabled(skip)]
    pub expected_output: String,
}

impl TestResult {
    /// The entry recorded for a submission without an entry point.
    pub fn skipped(submission_name: impl Into<String>) -> Self {
        Self {
            submission_name: submission_name.into(),
            test_case_title: NOT_APPLICABLE.to_string(),
            status:          TestStatus::Skipped,
            actual_output:   String::new(),
            expected_output: String::new(),
        }
    }

    /// `name | title | STATUS`
    pub fn display_line(&self) -> String {
        format!(
            "{} | {} | {}",
            self.submission_name, self.test_case_title, self.status
        )
    }
}

/// Number of results per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// results with [`TestStatus::Passed`]
    pub passed:         usize,
    /// results with [`TestStatus::Failed`]
    pub failed:         usize,
    /// results with [`TestStatus::CompileError`]
    pub compile_errors: usize,
    /// results with [`TestStatus::RuntimeError`]
    pub runtime_errors: usize,
    /// results with [`TestStatus::TimedOut`]
    pub timed_out:      usize,
    /// results with [`TestStatus::Skipped`]
    pub skipped:        usize,
}

impl RunSummary {
    /// Tallies `results`.
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            *summary.count_mut(result.status) += 1;
        }
        summary
    }

    /// Count for one status.
    pub fn count(&self, status: TestStatus) -> usize {
        match status {
            TestStatus::Passed => self.passed,
            TestStatus::Failed => self.failed,
            TestStatus::CompileError => self.compile_errors,
            TestStatus::RuntimeError => self.runtime_errors,
            TestStatus::TimedOut => self.timed_out,
            TestStatus::Skipped => self.skipped,
        }
    }

    /// Mutable count for one status.
    fn count_mut(&mut self, status: TestStatus) -> &mut usize {
        match status {
            TestStatus::Passed => &mut self.passed,
            TestStatus::Failed => &mut self.failed,
            TestStatus::CompileError => &mut self.compile_errors,
            TestStatus::RuntimeError => &mut self.runtime_errors,
            TestStatus::TimedOut => &mut self.timed_out,
            TestStatus::Skipped => &mut self.skipped,
        }
    }

    /// Total number of results.
    pub fn total(&self) -> usize {
        TestStatus::ALL.iter().map(|s| self.count(*s)).sum()
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = TestStatus::ALL
            .iter()
            .filter(|s| self.count(**s) > 0)
            .map(|s| format!("{} {s}", self.count(*s)))
            .collect();

        if parts.is_empty() {
            f.write_str("no results")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
