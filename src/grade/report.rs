#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use similar::{Algorithm, ChangeTag, utils::diff_unicode_words};
use tabled::{
    Table,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use super::{RunSummary, TestResult, TestStatus};

/// Renders a run as a table with a summary footer.
pub fn results_table(results: &[TestResult]) -> String {
    let summary = RunSummary::from_results(results);

    Table::new(results)
        .with(Panel::header("Grading Overview"))
        .with(Panel::footer(summary.to_string()))
        .with(Modify::new(Rows::new(1..)).with(Width::wrap(24).keep_words(true)))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(
            Modify::new(Rows::last())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// Shows expected and actual output of `result` side by side, marking the
/// words that differ.
///
/// With `color`, words missing from the actual output are red and extra
/// words green; otherwise both outputs are printed as is.
pub fn comparison(result: &TestResult, color: bool) -> String {
    let expected = result.expected_output.trim();
    let actual = result.actual_output.trim();

    let (expected, actual) = if color {
        let mut colored_expected = String::new();
        let mut colored_actual = String::new();

        for (change, value) in diff_unicode_words(Algorithm::Patience, expected, actual) {
            match change {
                ChangeTag::Equal => {
                    colored_expected.push_str(value);
                    colored_actual.push_str(value);
                }
                ChangeTag::Insert => colored_actual.push_str(&format!("{}", value.green())),
                ChangeTag::Delete => colored_expected.push_str(&format!("{}", value.red())),
            }
        }
        (colored_expected, colored_actual)
    } else {
        (expected.to_string(), actual.to_string())
    };

    format!(
        "{} on {} ({}):\nExpected:\n{expected}\nActual:\n{actual}\n",
        result.submission_name, result.test_case_title, result.status
    )
}

/// Comparisons for every result that ran but did not pass.
pub fn failure_details(results: &[TestResult], color: bool) -> Vec<String> {
    results
        .iter()
        .filter(|r| {
            matches!(
                r.status,
                TestStatus::Failed
                    | TestStatus::CompileError
                    | TestStatus::RuntimeError
                    | TestStatus::TimedOut
            )
        })
        .map(|r| comparison(r, color))
        .collect()
}

/// Machine readable form of a run.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    /// Title of the suite that was run.
    suite:   &'a str,
    /// Counts per status.
    summary: RunSummary,
    /// Every result, in run order.
    results: &'a [TestResult],
}

/// Serializes a run of `suite` as pretty JSON.
pub fn to_json(suite: &str, results: &[TestResult]) -> Result<String> {
    let report = RunReport {
        suite,
        summary: RunSummary::from_results(results),
        results,
    };
    serde_json::to_string_pretty(&report).context("Failed to serialize run results")
}
