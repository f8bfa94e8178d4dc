use autograde::{
    TestResult, TestStatus,
    grade::{RunSummary, report},
};

fn result(name: &str, title: &str, status: TestStatus, actual: &str, expected: &str) -> TestResult {
    TestResult {
        submission_name: name.into(),
        test_case_title: title.into(),
        status,
        actual_output: actual.into(),
        expected_output: expected.into(),
    }
}

fn sample() -> Vec<TestResult> {
    vec![
        result("alice", "sum", TestStatus::Passed, "5", "5"),
        result("bob", "sum", TestStatus::Failed, "the sum is 6", "the sum is 5"),
        result("carol", "sum", TestStatus::TimedOut, "ERROR: program timed out after 10s", "5"),
        TestResult::skipped("dave"),
    ]
}

#[test]
fn summary_counts_each_status() {
    let summary = RunSummary::from_results(&sample());
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.timed_out, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.compile_errors, 0);
    assert_eq!(summary.total(), 4);
    assert_eq!(summary.to_string(), "1 PASSED, 1 FAILED, 1 TIMED_OUT, 1 SKIPPED");
    assert_eq!(RunSummary::from_results(&[]).to_string(), "no results");
}

#[test]
fn table_lists_every_row_under_a_header() {
    let table = report::results_table(&sample());
    assert!(table.contains("Grading Overview"));
    for needle in ["alice", "bob", "carol", "dave", "PASSED", "TIMED_OUT", "N/A"] {
        assert!(table.contains(needle), "missing {needle} in\n{table}");
    }
}

#[test]
fn plain_comparison_shows_both_outputs() {
    let results = sample();
    let text = report::comparison(&results[1], false);
    assert_eq!(
        text,
        "bob on sum (FAILED):\nExpected:\nthe sum is 5\nActual:\nthe sum is 6\n"
    );
}

#[test]
fn failure_details_skip_passes_and_skips() {
    let details = report::failure_details(&sample(), false);
    assert_eq!(details.len(), 2);
    assert!(details[0].starts_with("bob on sum"));
    assert!(details[1].starts_with("carol on sum"));
}

#[test]
fn json_report_uses_status_names() {
    let json = report::to_json("Week 1", &sample()).expect("json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("parse");

    assert_eq!(value["suite"], "Week 1");
    assert_eq!(value["summary"]["passed"], 1);
    assert_eq!(value["results"][0]["status"], "PASSED");
    assert_eq!(value["results"][2]["status"], "TIMED_OUT");
    assert_eq!(value["results"][3]["test_case_title"], "N/A");
}

#[test]
fn display_line_matches_the_listing_format() {
    assert_eq!(sample()[0].display_line(), "alice | sum | PASSED");
}
