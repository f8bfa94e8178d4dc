#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use futures::{StreamExt, stream};
use tracing::{info, warn};

use super::{GradeError, TestResult, TestStatus};
use crate::{
    compare::compare,
    discovery::{self, Discovery, EntryPointDetector, LineTokenDetector, Submission},
    exec::{ExecError, Execution, Executor},
    process::CancelToken,
    store::{TestCase, TestSuite},
};

/// The results of the last completed run.
///
/// Replaced whole once per run; readers get a shared snapshot that later
/// runs never change.
#[derive(Debug)]
pub struct ResultStore(RwLock<Arc<[TestResult]>>);

impl Default for ResultStore {
    fn default() -> Self {
        Self(RwLock::new(Arc::from(Vec::new())))
    }
}

impl ResultStore {
    /// Swaps in the results of a finished run.
    fn replace(&self, results: Vec<TestResult>) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::from(results);
    }

    /// The results of the last run.
    pub fn snapshot(&self) -> Arc<[TestResult]> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Maps an execution of `case` to its result row.
fn classify(submission: &Submission, case: &TestCase, execution: Execution) -> TestResult {
    let status = if !execution.compiled {
        TestStatus::CompileError
    } else if execution.timed_out {
        TestStatus::TimedOut
    } else if execution.exit_code != Some(0) {
        TestStatus::RuntimeError
    } else if compare(&execution.output, &case.expected_output, &case.kind) {
        TestStatus::Passed
    } else {
        TestStatus::Failed
    };

    TestResult {
        submission_name: submission.name.clone(),
        test_case_title: case.title.clone(),
        status,
        actual_output: execution.output,
        expected_output: case.expected_output.clone(),
    }
}

/// Runs suites against every discovered submission.
pub struct Orchestrator {
    /// Builds and runs one submission.
    executor: Executor,
    /// Decides which file of a submission is its entry point.
    detector: Arc<dyn EntryPointDetector>,
    /// How many submissions are graded at once.
    jobs:     usize,
    /// Results of the last completed run.
    last_run: ResultStore,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("executor", &self.executor)
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator grading one submission at a time with the
    /// line based detector.
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            detector: Arc::new(LineTokenDetector),
            jobs: 1,
            last_run: ResultStore::default(),
        }
    }

    /// Grades up to `jobs` submissions concurrently. Zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Uses `detector` to find entry points.
    pub fn with_detector(mut self, detector: Arc<dyn EntryPointDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// The executor in use.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Lists the submissions under `root` with this orchestrator's detector.
    ///
    /// The folder walk and file reads run on the blocking pool.
    pub async fn discover(
        &self,
        root: &Path,
        code_sub_path: &str,
    ) -> Result<Discovery, GradeError> {
        let root = root.to_path_buf();
        let code_sub_path = code_sub_path.to_string();
        let source_ext = self.executor.toolchain().source_ext().to_string();
        let detector = Arc::clone(&self.detector);

        let handle = tokio::task::spawn_blocking(move || {
            discovery::discover(&root, &code_sub_path, &source_ext, detector.as_ref())
        });
        match handle.await {
            Ok(discovery) => Ok(discovery?),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!("discovery task did not finish: {e}");
                Err(GradeError::Cancelled)
            }
        }
    }

    /// Builds one submission and runs it on every case.
    async fn grade_submission(
        &self,
        submission: &Submission,
        cases: &[&TestCase],
        cancel: &CancelToken,
    ) -> Result<Vec<TestResult>, ExecError> {
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        info!("grading {}", submission.name);

        let compilation = self.executor.compile(submission, cancel).await?;
        if !compilation.compiled {
            warn!("{} did not compile", submission.name);
            return Ok(cases
                .iter()
                .map(|case| classify(submission, case, compilation.clone().into()))
                .collect());
        }

        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            let execution = self
                .executor
                .run(submission, &case.input_data, cancel)
                .await?;
            results.push(classify(submission, case, execution));
        }
        Ok(results)
    }

    /// Runs every test case of `suite` against every submission of
    /// `discovery`, then records one skipped entry per skipped folder.
    ///
    /// Test case references are looked up in `pool`. On success the results
    /// become the last run; on failure the previous last run is kept.
    pub async fn run_suite(
        &self,
        suite: &TestSuite,
        pool: &[TestCase],
        discovery: &Discovery,
        cancel: &CancelToken,
    ) -> Result<Vec<TestResult>, GradeError> {
        if discovery.submissions.is_empty() {
            return Err(GradeError::NoSubmissions);
        }
        let cases = suite.resolve(pool);
        if cases.is_empty() {
            return Err(GradeError::NoTestCases(suite.title().to_string()));
        }

        info!(
            "running suite {} ({} test case(s)) on {} submission(s) with {} job(s)",
            suite.title(),
            cases.len(),
            discovery.submissions.len(),
            self.jobs
        );

        let graded: Vec<Result<Vec<TestResult>, ExecError>> =
            stream::iter(discovery.submissions.iter())
                .map(|submission| self.grade_submission(submission, &cases, cancel))
                .buffered(self.jobs)
                .collect()
                .await;

        let mut results = Vec::new();
        for outcome in graded {
            results.extend(outcome?);
        }
        if cancel.is_cancelled() {
            return Err(GradeError::Cancelled);
        }

        results.extend(discovery.skipped.iter().map(TestResult::skipped));

        self.last_run.replace(results.clone());
        Ok(results)
    }

    /// Results of the last completed run.
    pub fn last_run(&self) -> Arc<[TestResult]> {
        self.last_run.snapshot()
    }

    /// Looks up one entry of the last run.
    pub fn result_for(&self, submission_name: &str, test_case_title: &str) -> Option<TestResult> {
        self.last_run
            .snapshot()
            .iter()
            .find(|r| r.submission_name == submission_name && r.test_case_title == test_case_title)
            .cloned()
    }

    /// Names of the submissions skipped in the last run.
    pub fn skipped_in_last_run(&self) -> Vec<String> {
        self.last_run
            .snapshot()
            .iter()
            .filter(|r| r.status == TestStatus::Skipped)
            .map(|r| r.submission_name.clone())
            .collect()
    }
}
