#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{ffi::OsString, time::Duration};

use bon::Builder;
use tracing::{debug, warn};

use crate::{
    constants::{DEFAULT_SOURCE_EXT, ERROR_PREFIX},
    discovery::Submission,
    process::{CancelToken, CommandSpec, ProcessError, StdinSource, run_collect},
};

/// Errors that stop an execution outright. Everything else is reported in
/// the [`Execution`] itself.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// The batch was cancelled while this submission was being built or run.
    #[error("execution cancelled")]
    Cancelled,
}

/// The build and run commands for the target language.
#[derive(Debug, Clone, Builder)]
#[builder(on(OsString, into))]
pub struct Toolchain {
    /// Program that builds an entry point, e.g. `javac`.
    compiler:        OsString,
    /// Arguments placed before the entry point file name.
    #[builder(default)]
    compiler_args:   Vec<OsString>,
    /// Program that runs a built class, e.g. `java`.
    runner:          OsString,
    /// Arguments placed before the class name.
    #[builder(default)]
    runner_args:     Vec<OsString>,
    /// Extension of source files, without the dot.
    #[builder(default = DEFAULT_SOURCE_EXT.to_string(), into)]
    source_ext:      String,
    /// Deadline for the build step.
    #[builder(default = Duration::from_secs(30))]
    compile_timeout: Duration,
    /// Deadline for each run.
    #[builder(default = Duration::from_secs(10))]
    run_timeout:     Duration,
}

impl Toolchain {
    /// Extension of source files, without the dot.
    pub fn source_ext(&self) -> &str {
        &self.source_ext
    }

    /// Deadline for the build step.
    pub fn compile_timeout(&self) -> Duration {
        self.compile_timeout
    }

    /// Deadline for each run.
    pub fn run_timeout(&self) -> Duration {
        self.run_timeout
    }

    /// Returns a copy with a different run deadline.
    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }
}

/// Outcome of building one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    /// Whether the compiler exited with status 0.
    pub compiled:  bool,
    /// Compiler stdout then stderr, or an `ERROR: ` message.
    pub output:    String,
    /// Whether the compiler was killed at its deadline.
    pub timed_out: bool,
}

/// Outcome of building and running one submission on one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Whether the build step succeeded. When false, `output` holds the
    /// compiler's output and nothing was run.
    pub compiled:  bool,
    /// Program stdout then stderr, or an `ERROR: ` message.
    pub output:    String,
    /// Whether a step was killed at its deadline.
    pub timed_out: bool,
    /// Exit code of the run. `None` when it never ran, failed to start, was
    /// killed, or ended by a signal.
    pub exit_code: Option<i32>,
}

impl Execution {
    /// Returns true if the run exited on its own with status 0.
    pub fn succeeded(&self) -> bool {
        self.compiled && !self.timed_out && self.exit_code == Some(0)
    }
}

impl From<Compilation> for Execution {
    fn from(compilation: Compilation) -> Self {
        Self {
            compiled:  compilation.compiled,
            output:    compilation.output,
            timed_out: compilation.timed_out,
            exit_code: None,
        }
    }
}

/// Formats a failure the way it appears in an output field.
fn error_output(message: impl std::fmt::Display) -> String {
    format!("{ERROR_PREFIX}{message}")
}

/// Builds and runs submissions with a [`Toolchain`].
#[derive(Debug, Clone)]
pub struct Executor {
    /// Commands and deadlines used for every submission.
    toolchain: Toolchain,
}

impl Executor {
    /// Creates an executor for `toolchain`.
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    /// The toolchain in use.
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Compiles the submission's entry point in its own folder.
    pub async fn compile(
        &self,
        submission: &Submission,
        cancel: &CancelToken,
    ) -> Result<Compilation, ExecError> {
        let mut args = self.toolchain.compiler_args.clone();
        args.push(submission.entry_file_name());

        let spec = CommandSpec::builder()
            .program(self.toolchain.compiler.clone())
            .args(args)
            .cwd(submission.working_dir().to_path_buf())
            .build();

        debug!("compiling {}", submission.entry_point.display());
        match run_collect(
            &spec,
            StdinSource::Null,
            Some(self.toolchain.compile_timeout),
            cancel,
        )
        .await
        {
            Ok(collected) => Ok(Compilation {
                compiled:  collected.status.success(),
                output:    collected.merged_output(),
                timed_out: false,
            }),
            Err(ProcessError::Cancelled) => Err(ExecError::Cancelled),
            Err(e @ ProcessError::TimedOut(_)) => {
                warn!("compiling {} {e}", submission.name);
                Ok(Compilation {
                    compiled:  false,
                    output:    error_output(format_args!("compiler {e}")),
                    timed_out: true,
                })
            }
            Err(e) => Ok(Compilation {
                compiled:  false,
                output:    error_output(e),
                timed_out: false,
            }),
        }
    }

    /// Runs an already compiled submission with `input` on stdin.
    pub async fn run(
        &self,
        submission: &Submission,
        input: &str,
        cancel: &CancelToken,
    ) -> Result<Execution, ExecError> {
        let mut args = self.toolchain.runner_args.clone();
        args.push(submission.class_name().into());

        let spec = CommandSpec::builder()
            .program(self.toolchain.runner.clone())
            .args(args)
            .cwd(submission.working_dir().to_path_buf())
            .build();

        let stdin = if input.is_empty() {
            StdinSource::Null
        } else {
            StdinSource::Bytes(input.as_bytes().to_vec())
        };

        match run_collect(&spec, stdin, Some(self.toolchain.run_timeout), cancel).await {
            Ok(collected) => Ok(Execution {
                compiled:  true,
                output:    collected.merged_output(),
                timed_out: false,
                exit_code: collected.status.code(),
            }),
            Err(ProcessError::Cancelled) => Err(ExecError::Cancelled),
            Err(e @ ProcessError::TimedOut(_)) => {
                warn!("{} {e}", submission.name);
                Ok(Execution {
                    compiled:  true,
                    output:    error_output(format_args!("program {e}")),
                    timed_out: true,
                    exit_code: None,
                })
            }
            Err(e) => Ok(Execution {
                compiled:  true,
                output:    error_output(e),
                timed_out: false,
                exit_code: None,
            }),
        }
    }

    /// Compiles the submission and, if that succeeds, runs it on `input`.
    pub async fn execute(
        &self,
        submission: &Submission,
        input: &str,
        cancel: &CancelToken,
    ) -> Result<Execution, ExecError> {
        let compilation = self.compile(submission, cancel).await?;
        if !compilation.compiled {
            return Ok(compilation.into());
        }
        self.run(submission, input, cancel).await
    }
}
