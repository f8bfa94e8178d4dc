#![cfg(unix)]

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use autograde::{
    CancelToken, ComparisonType, Executor, Orchestrator, Session, TestCase, TestResult,
    TestStatus, TestSuite, Toolchain, Workspace,
    discovery::{Discovery, LineTokenDetector, discover},
    grade::GradeError,
};
use uuid::Uuid;

const MAIN: &str = "public class Main {\n    public static void main(String[] args) {}\n}\n";
const HELPER: &str = "public class Helper {}\n";

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("autograde-grading-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn write(path: PathBuf, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, contents).expect("write");
}

/// `A` has an entry point, `B` only a helper class.
fn submissions_root() -> PathBuf {
    let root = temp_root();
    write(root.join("A").join("Main.java"), MAIN);
    write(root.join("B").join("Helper.java"), HELPER);
    root
}

/// Compiles with `compiler` and runs `sh -c script <Class>`.
fn toolchain(compiler: &str, script: &str) -> Toolchain {
    Toolchain::builder()
        .compiler(compiler)
        .runner("sh")
        .runner_args(vec!["-c".into(), script.into()])
        .run_timeout(Duration::from_secs(5))
        .build()
}

fn orchestrator(compiler: &str, script: &str) -> Orchestrator {
    Orchestrator::new(Executor::new(toolchain(compiler, script)))
}

fn discover_all(root: &Path) -> Discovery {
    discover(root, "", "java", &LineTokenDetector).expect("discover")
}

fn suite_of(cases: &[TestCase]) -> TestSuite {
    let mut suite = TestSuite::new("S");
    for case in cases {
        suite.add_test_case_ref(case.filename());
    }
    suite
}

fn statuses(results: &[TestResult]) -> Vec<(String, String, TestStatus)> {
    results
        .iter()
        .map(|r| {
            (
                r.submission_name.clone(),
                r.test_case_title.clone(),
                r.status,
            )
        })
        .collect()
}

fn row(name: &str, title: &str, status: TestStatus) -> (String, String, TestStatus) {
    (name.to_string(), title.to_string(), status)
}

#[tokio::test]
async fn matching_output_passes_and_folders_without_main_are_skipped() {
    let root = submissions_root();
    let pool = vec![TestCase::new("echo", "hello", "hello", ComparisonType::String)];
    let suite = suite_of(&pool);

    let results = orchestrator("true", "cat")
        .run_suite(&suite, &pool, &discover_all(&root), &CancelToken::new())
        .await
        .expect("run");

    assert_eq!(
        statuses(&results),
        [
            row("A", "echo", TestStatus::Passed),
            row("B", "N/A", TestStatus::Skipped),
        ]
    );
    assert_eq!(results[0].actual_output, "hello");
    assert_eq!(results[0].expected_output, "hello");
    assert_eq!(results[1].actual_output, "");
    assert_eq!(results[1].display_line(), "B | N/A | SKIPPED");

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn mismatched_output_fails() {
    let root = submissions_root();
    let pool = vec![TestCase::new("echo", "hello", "goodbye", ComparisonType::String)];

    let results = orchestrator("true", "cat")
        .run_suite(&suite_of(&pool), &pool, &discover_all(&root), &CancelToken::new())
        .await
        .expect("run");

    assert_eq!(results[0].status, TestStatus::Failed);
    assert_eq!(results[0].actual_output, "hello");
    assert_eq!(results[0].expected_output, "goodbye");

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn compile_failure_marks_every_case_and_never_runs() {
    let root = submissions_root();
    let pool = vec![
        TestCase::new("one", "1", "1", ComparisonType::Int),
        TestCase::new("two", "2", "2", ComparisonType::Int),
    ];

    let results = orchestrator("false", "touch ran")
        .run_suite(&suite_of(&pool), &pool, &discover_all(&root), &CancelToken::new())
        .await
        .expect("run");

    assert_eq!(
        statuses(&results),
        [
            row("A", "one", TestStatus::CompileError),
            row("A", "two", TestStatus::CompileError),
            row("B", "N/A", TestStatus::Skipped),
        ]
    );
    assert!(!root.join("A").join("ran").exists());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn missing_compiler_is_a_compile_error_with_an_error_message() {
    let root = submissions_root();
    let pool = vec![TestCase::new("one", "", "", ComparisonType::String)];

    let results = orchestrator("/nonexistent/autograde-compiler", "cat")
        .run_suite(&suite_of(&pool), &pool, &discover_all(&root), &CancelToken::new())
        .await
        .expect("run");

    assert_eq!(results[0].status, TestStatus::CompileError);
    assert!(results[0].actual_output.starts_with("ERROR: "));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn nonzero_exit_and_missing_runner_are_runtime_errors() {
    let root = submissions_root();
    let pool = vec![TestCase::new("one", "", "", ComparisonType::String)];
    let suite = suite_of(&pool);
    let discovery = discover_all(&root);

    let exited = orchestrator("true", "echo boom 1>&2; exit 3")
        .run_suite(&suite, &pool, &discovery, &CancelToken::new())
        .await
        .expect("run");
    assert_eq!(exited[0].status, TestStatus::RuntimeError);
    assert_eq!(exited[0].actual_output, "boom");

    let missing = Orchestrator::new(Executor::new(
        Toolchain::builder()
            .compiler("true")
            .runner("/nonexistent/autograde-runner")
            .build(),
    ))
    .run_suite(&suite, &pool, &discovery, &CancelToken::new())
    .await
    .expect("run");
    assert_eq!(missing[0].status, TestStatus::RuntimeError);
    assert!(missing[0].actual_output.starts_with("ERROR: "));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn slow_programs_time_out() {
    let root = submissions_root();
    let pool = vec![TestCase::new("slow", "", "", ComparisonType::String)];
    let toolchain = toolchain("true", "sleep 5").with_run_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let results = Orchestrator::new(Executor::new(toolchain))
        .run_suite(&suite_of(&pool), &pool, &discover_all(&root), &CancelToken::new())
        .await
        .expect("run");

    assert_eq!(results[0].status, TestStatus::TimedOut);
    assert!(results[0].actual_output.starts_with("ERROR: "));
    assert!(started.elapsed() < Duration::from_secs(4));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn stdout_comes_before_stderr_and_numbers_compare_by_type() {
    let root = submissions_root();
    let pool = vec![
        TestCase::new("double", "", "3.0", ComparisonType::Double),
        TestCase::new("bool", "", "TRUE", ComparisonType::Boolean),
    ];
    let suite = suite_of(&pool);
    let discovery = discover_all(&root);

    let merged = orchestrator("true", "echo err 1>&2; echo out")
        .run_suite(&suite, &pool, &discovery, &CancelToken::new())
        .await
        .expect("run");
    assert_eq!(merged[0].actual_output, "out\nerr");

    let double = orchestrator("true", "echo 3.00001")
        .run_suite(&suite, &pool, &discovery, &CancelToken::new())
        .await
        .expect("run");
    assert_eq!(double[0].status, TestStatus::Passed);
    assert_eq!(double[1].status, TestStatus::Failed);

    let boolean = orchestrator("true", "echo true")
        .run_suite(&suite, &pool, &discovery, &CancelToken::new())
        .await
        .expect("run");
    assert_eq!(boolean[1].status, TestStatus::Passed);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn concurrent_runs_keep_submission_and_suite_order() {
    let root = temp_root();
    for name in ["d", "b", "a", "c"] {
        write(root.join(name).join("Main.java"), MAIN);
    }
    let pool = vec![
        TestCase::new("x", "x", "x", ComparisonType::String),
        TestCase::new("y", "y", "y", ComparisonType::String),
    ];
    let mut suite = TestSuite::new("S");
    suite.add_test_case_ref("y.testcase");
    suite.add_test_case_ref("x.testcase");

    let results = orchestrator("true", "cat")
        .with_jobs(4)
        .run_suite(&suite, &pool, &discover_all(&root), &CancelToken::new())
        .await
        .expect("run");

    let order: Vec<_> = results
        .iter()
        .map(|r| format!("{}{}", r.submission_name, r.test_case_title))
        .collect();
    assert_eq!(order, ["ay", "ax", "by", "bx", "cy", "cx", "dy", "dx"]);
    assert!(results.iter().all(|r| r.status == TestStatus::Passed));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn identical_runs_give_identical_results() {
    let root = submissions_root();
    let pool = vec![
        TestCase::new("pass", "hi", "hi", ComparisonType::String),
        TestCase::new("fail", "hi", "bye", ComparisonType::String),
    ];
    let suite = suite_of(&pool);
    let discovery = discover_all(&root);
    let orchestrator = orchestrator("true", "cat");

    let first = orchestrator
        .run_suite(&suite, &pool, &discovery, &CancelToken::new())
        .await
        .expect("first run");
    let second = orchestrator
        .run_suite(&suite, &pool, &discovery, &CancelToken::new())
        .await
        .expect("second run");

    assert_eq!(first, second);
    assert_eq!(orchestrator.last_run().as_ref(), second.as_slice());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn last_run_lookups() {
    let root = submissions_root();
    let pool = vec![TestCase::new("echo", "hi", "hi", ComparisonType::String)];
    let orchestrator = orchestrator("true", "cat");
    assert!(orchestrator.last_run().is_empty());

    orchestrator
        .run_suite(&suite_of(&pool), &pool, &discover_all(&root), &CancelToken::new())
        .await
        .expect("run");

    let hit = orchestrator.result_for("A", "echo").expect("result for A");
    assert_eq!(hit.status, TestStatus::Passed);
    assert!(orchestrator.result_for("A", "missing").is_none());
    assert_eq!(orchestrator.skipped_in_last_run(), ["B"]);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn preconditions_fail_without_touching_the_last_run() {
    let root = submissions_root();
    let pool = vec![TestCase::new("echo", "hi", "hi", ComparisonType::String)];
    let suite = suite_of(&pool);
    let orchestrator = orchestrator("true", "cat");

    let first = orchestrator
        .run_suite(&suite, &pool, &discover_all(&root), &CancelToken::new())
        .await
        .expect("run");

    let empty = Discovery {
        submissions: Vec::new(),
        skipped:     vec!["B".into()],
    };
    assert!(matches!(
        orchestrator
            .run_suite(&suite, &pool, &empty, &CancelToken::new())
            .await,
        Err(GradeError::NoSubmissions)
    ));

    let mut dangling = TestSuite::new("D");
    dangling.add_test_case_ref("ghost.testcase");
    assert!(matches!(
        orchestrator
            .run_suite(&dangling, &pool, &discover_all(&root), &CancelToken::new())
            .await,
        Err(GradeError::NoTestCases(title)) if title == "D"
    ));

    assert_eq!(orchestrator.last_run().as_ref(), first.as_slice());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn cancelled_runs_keep_the_previous_results() {
    let root = submissions_root();
    let pool = vec![TestCase::new("echo", "hi", "hi", ComparisonType::String)];
    let suite = suite_of(&pool);
    let discovery = discover_all(&root);
    let orchestrator = orchestrator("true", "cat");

    let first = orchestrator
        .run_suite(&suite, &pool, &discovery, &CancelToken::new())
        .await
        .expect("run");

    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        orchestrator.run_suite(&suite, &pool, &discovery, &cancel).await,
        Err(GradeError::Cancelled)
    ));
    assert_eq!(orchestrator.last_run().as_ref(), first.as_slice());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn cancelling_kills_running_programs() {
    let root = submissions_root();
    let pool = vec![TestCase::new("slow", "", "", ComparisonType::String)];
    let toolchain = toolchain("true", "sleep 5").with_run_timeout(Duration::from_secs(30));
    let orchestrator = Orchestrator::new(Executor::new(toolchain));

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = orchestrator
        .run_suite(&suite_of(&pool), &pool, &discover_all(&root), &cancel)
        .await;

    assert!(matches!(outcome, Err(GradeError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(orchestrator.last_run().is_empty());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn orchestrator_discovers_off_the_runtime_threads() {
    let root = submissions_root();
    let orchestrator = orchestrator("true", "cat");

    let discovery = orchestrator.discover(&root, "").await.expect("discover");
    let names: Vec<_> = discovery.submissions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["A"]);
    assert_eq!(discovery.skipped, ["B"]);

    let missing = root.join("missing");
    assert!(matches!(
        orchestrator.discover(&missing, "").await,
        Err(GradeError::RootNotDirectory(path)) if path == missing
    ));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn executor_short_circuits_on_compile_failure() {
    let root = submissions_root();
    let discovery = discover_all(&root);
    let submission = &discovery.submissions[0];
    let cancel = CancelToken::new();

    let failed = Executor::new(toolchain("false", "cat"))
        .execute(submission, "hi", &cancel)
        .await
        .expect("execute");
    assert!(!failed.compiled);
    assert_eq!(failed.exit_code, None);
    assert!(!failed.succeeded());

    let ok = Executor::new(toolchain("true", "cat"))
        .execute(submission, "hi", &cancel)
        .await
        .expect("execute");
    assert!(ok.compiled);
    assert_eq!(ok.output, "hi");
    assert_eq!(ok.exit_code, Some(0));
    assert!(ok.succeeded());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn session_checks_configuration_in_order() {
    let root = submissions_root();
    let orchestrator = orchestrator("true", "cat");
    let cancel = CancelToken::new();
    let mut session = Session::new(Workspace::default());

    assert!(matches!(
        session.execute_current_suite(&orchestrator, &cancel).await,
        Err(GradeError::NoSuiteSelected)
    ));
    assert!(matches!(
        session.select_suite("nope"),
        Err(GradeError::UnknownSuite(_))
    ));

    session
        .create_test_suite("S")
        .add_test_case_ref("echo.testcase");
    assert_eq!(session.current_suite().map(TestSuite::title), Some("S"));
    assert!(matches!(
        session.execute_current_suite(&orchestrator, &cancel).await,
        Err(GradeError::NoRootFolder)
    ));

    session.set_root_folder(root.join("missing"));
    assert!(matches!(
        session.execute_current_suite(&orchestrator, &cancel).await,
        Err(GradeError::RootNotDirectory(_))
    ));

    session.set_root_folder(root.join("B"));
    assert!(matches!(
        session.execute_current_suite(&orchestrator, &cancel).await,
        Err(GradeError::NoSubmissions)
    ));

    session.set_root_folder(&root);
    assert!(matches!(
        session.execute_current_suite(&orchestrator, &cancel).await,
        Err(GradeError::NoTestCases(_))
    ));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn session_runs_the_selected_suite_from_a_save_folder() {
    let root = submissions_root();
    let save = temp_root();

    let mut workspace = Workspace::open(&save);
    workspace
        .save_test_case(TestCase::new("echo", "hi", "hi", ComparisonType::String))
        .expect("save case");
    workspace
        .create_test_suite("Week 1")
        .add_test_case_ref("echo.testcase");
    workspace.save_test_suite("Week 1").expect("save suite");

    let mut session = Session::default();
    session.set_save_folder(&save);
    assert_eq!(
        session.select_first_suite().map(TestSuite::title),
        Some("Week 1")
    );
    session.set_root_folder(&root);

    let orchestrator = orchestrator("true", "cat");
    let results = session
        .execute_current_suite(&orchestrator, &CancelToken::new())
        .await
        .expect("run");
    assert_eq!(
        statuses(&results),
        [
            row("A", "echo", TestStatus::Passed),
            row("B", "N/A", TestStatus::Skipped),
        ]
    );

    let _ = fs::remove_dir_all(root);
    let _ = fs::remove_dir_all(save);
}
