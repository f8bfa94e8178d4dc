#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{ffi::OsString, path::PathBuf, time::Duration};

use tracing::warn;
use which::which;

use crate::{
    constants::{DEFAULT_COMPILER, DEFAULT_RUNNER, DEFAULT_SOURCE_EXT},
    exec::Toolchain,
};

/// Compiler program, looked up on `PATH` when it is a bare name.
pub const COMPILER_ENV: &str = "AUTOGRADE_COMPILER";
/// Extra compiler arguments, split on whitespace.
pub const COMPILER_ARGS_ENV: &str = "AUTOGRADE_COMPILER_ARGS";
/// Runner program, looked up on `PATH` when it is a bare name.
pub const RUNNER_ENV: &str = "AUTOGRADE_RUNNER";
/// Extra runner arguments, split on whitespace.
pub const RUNNER_ARGS_ENV: &str = "AUTOGRADE_RUNNER_ARGS";
/// Source file extension.
pub const SOURCE_EXT_ENV: &str = "AUTOGRADE_SOURCE_EXT";
/// Compile deadline in seconds.
pub const COMPILE_TIMEOUT_ENV: &str = "AUTOGRADE_COMPILE_TIMEOUT_SECS";
/// Run deadline in seconds.
pub const RUN_TIMEOUT_ENV: &str = "AUTOGRADE_RUN_TIMEOUT_SECS";
/// Number of submissions graded at once.
pub const JOBS_ENV: &str = "AUTOGRADE_JOBS";
/// Folder holding test cases and suites.
pub const SAVE_FOLDER_ENV: &str = "AUTOGRADE_SAVE_FOLDER";

/// Default compile deadline.
const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 30;
/// Default run deadline.
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 10;

/// Settings for a grading run, read from the environment.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Program that builds an entry point.
    compiler:        OsString,
    /// Arguments placed before the entry point file.
    compiler_args:   Vec<OsString>,
    /// Program that runs a built class.
    runner:          OsString,
    /// Arguments placed before the class name.
    runner_args:     Vec<OsString>,
    /// Extension of source files.
    source_ext:      String,
    /// Deadline for compiling.
    compile_timeout: Duration,
    /// Deadline for each run.
    run_timeout:     Duration,
    /// Submissions graded at once.
    jobs:            usize,
    /// Folder holding test cases and suites.
    save_folder:     Option<PathBuf>,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            compiler:        DEFAULT_COMPILER.into(),
            compiler_args:   Vec::new(),
            runner:          DEFAULT_RUNNER.into(),
            runner_args:     Vec::new(),
            source_ext:      DEFAULT_SOURCE_EXT.to_string(),
            compile_timeout: Duration::from_secs(DEFAULT_COMPILE_TIMEOUT_SECS),
            run_timeout:     Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            jobs:            default_jobs(),
            save_folder:     None,
        }
    }
}

impl GraderConfig {
    /// Reads every setting from the environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            compiler:        resolve_tool(COMPILER_ENV, DEFAULT_COMPILER),
            compiler_args:   read_args(COMPILER_ARGS_ENV),
            runner:          resolve_tool(RUNNER_ENV, DEFAULT_RUNNER),
            runner_args:     read_args(RUNNER_ARGS_ENV),
            source_ext:      read_nonempty(SOURCE_EXT_ENV)
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or_else(|| DEFAULT_SOURCE_EXT.to_string()),
            compile_timeout: read_timeout_secs(COMPILE_TIMEOUT_ENV, DEFAULT_COMPILE_TIMEOUT_SECS),
            run_timeout:     read_timeout_secs(RUN_TIMEOUT_ENV, DEFAULT_RUN_TIMEOUT_SECS),
            jobs:            read_nonempty(JOBS_ENV)
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|jobs| *jobs > 0)
                .unwrap_or_else(default_jobs),
            save_folder:     read_nonempty(SAVE_FOLDER_ENV).map(PathBuf::from),
        }
    }

    /// Overrides the run deadline.
    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    /// Overrides the number of concurrent submissions. Zero is ignored.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        if jobs > 0 {
            self.jobs = jobs;
        }
        self
    }

    /// Overrides the save folder.
    pub fn with_save_folder(mut self, save_folder: impl Into<PathBuf>) -> Self {
        self.save_folder = Some(save_folder.into());
        self
    }

    /// Submissions graded at once.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Deadline for each run.
    pub fn run_timeout(&self) -> Duration {
        self.run_timeout
    }

    /// Folder holding test cases and suites, if configured.
    pub fn save_folder(&self) -> Option<&PathBuf> {
        self.save_folder.as_ref()
    }

    /// Extension of source files.
    pub fn source_ext(&self) -> &str {
        &self.source_ext
    }

    /// The build and run commands these settings describe.
    pub fn toolchain(&self) -> Toolchain {
        Toolchain::builder()
            .compiler(self.compiler.clone())
            .compiler_args(self.compiler_args.clone())
            .runner(self.runner.clone())
            .runner_args(self.runner_args.clone())
            .source_ext(self.source_ext.clone())
            .compile_timeout(self.compile_timeout)
            .run_timeout(self.run_timeout)
            .build()
    }
}

/// Number of CPUs, or one if that cannot be determined.
fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
}

/// Reads `env`, treating blank values as unset.
fn read_nonempty(env: &str) -> Option<String> {
    std::env::var(env)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads a whitespace separated argument list from `env`.
fn read_args(env: &str) -> Vec<OsString> {
    read_nonempty(env)
        .map(|value| value.split_whitespace().map(OsString::from).collect())
        .unwrap_or_default()
}

/// Reads a duration in whole seconds from `env`.
fn read_timeout_secs(env: &str, default_secs: u64) -> Duration {
    read_nonempty(env)
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

/// Picks the program named by `env`, or `default`, and resolves it on `PATH`.
///
/// An unresolvable name is kept as is; spawning it later fails per
/// submission instead of here.
fn resolve_tool(env: &str, default: &str) -> OsString {
    let name = read_nonempty(env).unwrap_or_else(|| default.to_string());
    match which(&name) {
        Ok(path) => path.into_os_string(),
        Err(e) => {
            warn!("Cannot find {name} on path ({e}), using it as given");
            name.into()
        }
    }
}
