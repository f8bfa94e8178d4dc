//! # autograde
//!
//! A batch autograder for folders of student submissions. Each submission's
//! entry point is discovered, compiled and run against every test case of a
//! suite, and the outcomes are collected for review.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Comparison of actual and expected program output
pub mod compare;
/// Environment driven configuration
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// For discovering submissions and their entry points
pub mod discovery;
/// Compiling and running a single submission
pub mod exec;
/// For all things related to grading
pub mod grade;
/// Spawning child processes with deadlines and cancellation
pub mod process;
/// Test case and test suite persistence
pub mod store;

pub use compare::{ComparisonType, compare};
pub use discovery::{Discovery, EntryPointDetector, LineTokenDetector, Submission, SyntaxDetector};
pub use exec::{Execution, Executor, Toolchain};
pub use grade::{Orchestrator, Session, TestResult, TestStatus};
pub use process::CancelToken;
pub use store::{TestCase, TestSuite, Workspace};
