/// Folder under the save folder holding `.testcase` files.
pub const TEST_CASES_DIR: &str = "test-cases";

/// Folder under the save folder holding `.suite` files.
pub const TEST_SUITES_DIR: &str = "test-suites";

/// Extension of a persisted test case.
pub const TEST_CASE_EXT: &str = "testcase";

/// Extension of a persisted test suite.
pub const TEST_SUITE_EXT: &str = "suite";

/// Default extension of student source files.
pub const DEFAULT_SOURCE_EXT: &str = "java";

/// Default compiler, looked up on `PATH`.
pub const DEFAULT_COMPILER: &str = "javac";

/// Default runner, looked up on `PATH`.
pub const DEFAULT_RUNNER: &str = "java";

/// Tolerance used when comparing `Double` outputs.
pub const DOUBLE_EPSILON: f64 = 1e-4;

/// Prefix of the output recorded when a process could not be spawned or read.
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Test case title recorded for skipped submissions.
pub const NOT_APPLICABLE: &str = "N/A";

/// Tokens that must all appear on one line for the line based detector to
/// accept a file as an entry point.
pub const MAIN_SIGNATURE_TOKENS: [&str; 4] = ["public", "static", "void", "main("];

/// Tree-sitter query matching `void main(...)` method declarations.
/// * `modifiers`: the method's modifier list
/// * `name`: the method name, always `main`
pub const MAIN_METHOD_QUERY: &str = include_str!("queries/main_method.scm");

/// Most bytes kept from each of a child's stdout and stderr.
pub const MAX_CAPTURED_BYTES: u64 = 1024 * 1024;
