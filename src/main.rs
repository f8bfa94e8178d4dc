#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # autograde
//!
//! Grades a folder of student submissions against a suite of test cases.
//!
//! Test cases and suites live in a save folder (`--save-folder` or
//! `AUTOGRADE_SAVE_FOLDER`) and are managed with the `case` and `suite`
//! commands. `run` compiles and runs every submission under a root folder
//! and prints one row per submission and test case.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use autograde::{
    CancelToken, ComparisonType, Executor, Orchestrator, Session, TestCase, Workspace,
    config::GraderConfig,
    discovery::DetectorKind,
    grade::report,
};
use bpaf::*;
use dotenvy::dotenv;
use tracing::{Level, metadata::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Fields of a new test case.
#[derive(Debug, Clone)]
struct NewCase {
    /// title of the test case
    title:    String,
    /// comparison type name
    kind:     String,
    /// data fed to stdin
    input:    String,
    /// expected output
    expected: String,
}

/// Test case subcommands.
#[derive(Debug, Clone)]
enum CaseCmd {
    /// List every test case
    List,
    /// Print one test case
    Show(String),
    /// Create or overwrite a test case
    Add(NewCase),
    /// Delete a test case
    Remove(String),
    /// Give a test case a new title
    Rename(String, String),
}

/// Test suite subcommands.
#[derive(Debug, Clone)]
enum SuiteCmd {
    /// List every suite
    List,
    /// Print one suite
    Show(String),
    /// Create an empty suite
    Create(String),
    /// Add a test case to a suite
    Add(String, String),
    /// Drop a test case from a suite
    Drop(String, String),
    /// Delete a suite
    Remove(String),
}

/// Where to look for submissions.
#[derive(Debug, Clone)]
struct DiscoverArgs {
    /// folder holding one subfolder per submission
    root:      PathBuf,
    /// path inside each submission where sources live
    code_path: String,
    /// entry point detector
    detector:  DetectorKind,
}

/// Options of a grading run.
#[derive(Debug, Clone)]
struct RunArgs {
    /// suite to run
    suite:   String,
    /// submissions to grade
    target:  DiscoverArgs,
    /// submissions graded at once
    jobs:    Option<usize>,
    /// run deadline in seconds
    timeout: Option<u64>,
    /// print JSON instead of a table
    json:    bool,
    /// print an output comparison for every result that did not pass
    details: bool,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Test case management
    Case(CaseCmd),
    /// Test suite management
    Suite(SuiteCmd),
    /// List submissions and entry points
    Discover(DiscoverArgs),
    /// Grade submissions
    Run(RunArgs),
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Opts {
    /// log at debug level
    verbose:     bool,
    /// folder holding test cases and suites
    save_folder: Option<PathBuf>,
    /// what to do
    cmd:         Cmd,
}

/// Parse the command line arguments and return the options
fn options() -> Opts {
    /// parses a test case file name
    fn file() -> impl Parser<String> {
        positional("FILE").help("Test case file name, e.g. tc1.testcase")
    }

    /// parses a title
    fn title() -> impl Parser<String> {
        positional("TITLE").help("Title")
    }

    /// parses the submission folder options shared by `discover` and `run`
    fn target() -> impl Parser<DiscoverArgs> {
        let root = long("root")
            .short('r')
            .help("Folder with one subfolder per submission")
            .argument::<PathBuf>("DIR");
        let code_path = long("code-path")
            .help("Path inside each submission where sources live")
            .argument::<String>("PATH")
            .fallback(String::new());
        let detector = long("detector")
            .help("Entry point detector: line or syntax")
            .argument::<DetectorKind>("KIND")
            .fallback(DetectorKind::Line);
        construct!(DiscoverArgs {
            root,
            code_path,
            detector
        })
    }

    let case_list = pure(CaseCmd::List)
        .to_options()
        .command("list")
        .help("List test cases");

    let case_show = construct!(CaseCmd::Show(file()))
        .to_options()
        .command("show")
        .help("Print a test case");

    let case_add = {
        let title = positional::<String>("TITLE").help("Title of the test case");
        let kind = long("type")
            .help("Comparison type: String, Boolean, Int or Double")
            .argument::<String>("TYPE")
            .fallback(String::new());
        let input = long("input")
            .help("Data written to standard input")
            .argument::<String>("INPUT")
            .fallback(String::new());
        let expected = long("expected")
            .help("Expected output")
            .argument::<String>("OUTPUT");
        construct!(NewCase {
            kind,
            input,
            expected,
            title
        })
        .map(CaseCmd::Add)
        .to_options()
        .command("add")
        .help("Create or overwrite a test case")
    };

    let case_remove = construct!(CaseCmd::Remove(file()))
        .to_options()
        .command("remove")
        .help("Delete a test case");

    let case_rename = construct!(CaseCmd::Rename(file(), title()))
        .to_options()
        .command("rename")
        .help("Give a test case a new title and update suites referring to it");

    let case = construct!([case_list, case_show, case_add, case_remove, case_rename])
        .to_options()
        .command("case")
        .help("Manage test cases")
        .map(Cmd::Case);

    let suite_list = pure(SuiteCmd::List)
        .to_options()
        .command("list")
        .help("List test suites");

    let suite_show = construct!(SuiteCmd::Show(title()))
        .to_options()
        .command("show")
        .help("Print a test suite");

    let suite_create = construct!(SuiteCmd::Create(title()))
        .to_options()
        .command("create")
        .help("Create an empty test suite");

    let suite_add = construct!(SuiteCmd::Add(title(), file()))
        .to_options()
        .command("add")
        .help("Add a test case to a suite");

    let suite_drop = construct!(SuiteCmd::Drop(title(), file()))
        .to_options()
        .command("drop")
        .help("Drop a test case from a suite");

    let suite_remove = construct!(SuiteCmd::Remove(title()))
        .to_options()
        .command("remove")
        .help("Delete a test suite");

    let suite = construct!([
        suite_list,
        suite_show,
        suite_create,
        suite_add,
        suite_drop,
        suite_remove
    ])
    .to_options()
    .command("suite")
    .help("Manage test suites")
    .map(Cmd::Suite);

    let discover = construct!(Cmd::Discover(target()))
        .to_options()
        .command("discover")
        .help("List submissions and their entry points");

    let run = {
        let suite = long("suite")
            .short('s')
            .help("Title of the suite to run")
            .argument::<String>("TITLE");
        let jobs = long("jobs")
            .short('j')
            .help("Submissions graded at once")
            .argument::<usize>("N")
            .optional();
        let timeout = long("timeout")
            .help("Run deadline in seconds")
            .argument::<u64>("SECS")
            .optional();
        let json = long("json").help("Print results as JSON").switch();
        let details = long("details")
            .help("Compare expected and actual output of every result that did not pass")
            .switch();
        let target = target();
        construct!(RunArgs {
            suite,
            target,
            jobs,
            timeout,
            json,
            details
        })
        .map(Cmd::Run)
        .to_options()
        .command("run")
        .help("Grade every submission against a suite")
    };

    let verbose = short('v')
        .long("verbose")
        .help("Log at debug level")
        .switch();
    let save_folder = long("save-folder")
        .help("Folder holding test-cases/ and test-suites/")
        .argument::<PathBuf>("DIR")
        .optional();
    let cmd = construct!([case, suite, discover, run]);

    construct!(Opts {
        verbose,
        save_folder,
        cmd
    })
    .to_options()
    .descr("Batch autograder for folders of student submissions")
    .run()
}

/// Handles `case` subcommands.
fn case_cmd(workspace: &mut Workspace, cmd: CaseCmd) -> Result<()> {
    match cmd {
        CaseCmd::List => {
            for case in workspace.test_cases() {
                println!("{}\t{}\t{}", case.filename(), case.title, case.kind);
            }
        }
        CaseCmd::Show(file) => {
            let case = workspace
                .test_case_by_filename(&file)
                .with_context(|| format!("No test case named {file}"))?;
            println!("Title:    {}", case.title);
            println!("Type:     {}", case.kind);
            println!("Input:    {}", case.input_data);
            println!("Expected: {}", case.expected_output);
        }
        CaseCmd::Add(new) => {
            let kind: ComparisonType = new.kind.parse().unwrap_or_default();
            let case = TestCase::new(new.title, new.input, new.expected, kind);
            let path = workspace.save_test_case(case)?;
            println!("Saved {}", path.display());
        }
        CaseCmd::Remove(file) => {
            let case = workspace.remove_test_case(&file)?;
            println!("Removed {}", case.title);
        }
        CaseCmd::Rename(file, title) => {
            let renamed = workspace.rename_test_case(&file, title)?;
            println!("Renamed {file} to {renamed}");
        }
    }
    Ok(())
}

/// Handles `suite` subcommands.
fn suite_cmd(workspace: &mut Workspace, cmd: SuiteCmd) -> Result<()> {
    match cmd {
        SuiteCmd::List => {
            for suite in workspace.suites() {
                println!("{}\t{} test case(s)", suite.title(), suite.test_case_refs().len());
            }
        }
        SuiteCmd::Show(title) => {
            let suite = workspace
                .suite_by_title(&title)
                .with_context(|| format!("No test suite titled {title}"))?;
            println!("{}", suite.title());
            for file in suite.test_case_refs() {
                let marker = if workspace.test_case_by_filename(file).is_some() {
                    ""
                } else {
                    " (missing)"
                };
                println!("  {file}{marker}");
            }
        }
        SuiteCmd::Create(title) => {
            workspace.create_test_suite(title.as_str());
            let path = workspace.save_test_suite(&title)?;
            println!("Saved {}", path.display());
        }
        SuiteCmd::Add(title, file) => {
            if workspace.test_case_by_filename(&file).is_none() {
                bail!("No test case named {file}");
            }
            let suite = workspace
                .suite_mut(&title)
                .with_context(|| format!("No test suite titled {title}"))?;
            if !suite.add_test_case_ref(file.as_str()) {
                warn!("{title} already contains {file}");
            }
            workspace.save_test_suite(&title)?;
        }
        SuiteCmd::Drop(title, file) => {
            let suite = workspace
                .suite_mut(&title)
                .with_context(|| format!("No test suite titled {title}"))?;
            if !suite.remove_test_case_ref(&file) {
                warn!("{title} does not contain {file}");
            }
            workspace.save_test_suite(&title)?;
        }
        SuiteCmd::Remove(title) => {
            workspace.remove_suite(&title)?;
            println!("Removed {title}");
        }
    }
    Ok(())
}

/// Handles `discover`.
async fn discover_cmd(config: &GraderConfig, args: DiscoverArgs) -> Result<()> {
    let orchestrator = Orchestrator::new(Executor::new(config.toolchain()))
        .with_detector(args.detector.detector());
    let discovery = orchestrator.discover(&args.root, &args.code_path).await?;

    for submission in &discovery.submissions {
        println!("{}\t{}", submission.name, submission.entry_point.display());
    }
    for name in &discovery.skipped {
        println!("{name}\tSKIPPED - NO MAIN METHOD");
    }
    Ok(())
}

/// Handles `run`.
async fn run_cmd(mut session: Session, config: GraderConfig, args: RunArgs) -> Result<()> {
    let mut config = config;
    if let Some(jobs) = args.jobs {
        config = config.with_jobs(jobs);
    }
    if let Some(secs) = args.timeout {
        config = config.with_run_timeout(Duration::from_secs(secs));
    }

    let orchestrator = Orchestrator::new(Executor::new(config.toolchain()))
        .with_jobs(config.jobs())
        .with_detector(args.target.detector.detector());

    session.select_suite(&args.suite)?;
    session.set_root_folder(args.target.root);
    session.set_code_path(args.target.code_path);

    let cancel = CancelToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancelling run");
                cancel.cancel();
            }
        })
    };
    let outcome = session.execute_current_suite(&orchestrator, &cancel).await;
    ctrl_c.abort();
    let results = outcome?;

    if args.json {
        println!("{}", report::to_json(&args.suite, &results)?);
    } else {
        eprintln!("{}", report::results_table(&results));
        if args.details {
            for detail in report::failure_details(&results, true) {
                eprintln!("{detail}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let level = if opts.verbose { Level::DEBUG } else { Level::INFO };
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let mut config = GraderConfig::from_env();
    if let Some(folder) = opts.save_folder {
        config = config.with_save_folder(folder);
    }

    let mut session = Session::default();
    if let Some(folder) = config.save_folder() {
        session.set_save_folder(folder.clone());
    }

    match opts.cmd {
        Cmd::Case(cmd) => case_cmd(session.workspace_mut(), cmd)?,
        Cmd::Suite(cmd) => suite_cmd(session.workspace_mut(), cmd)?,
        Cmd::Discover(args) => discover_cmd(&config, args).await?,
        Cmd::Run(args) => run_cmd(session, config, args).await?,
    }

    Ok(())
}
