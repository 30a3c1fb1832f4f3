//! Conversion of runner outcomes into TestRail case results.

use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use railhook_client::{CaseId, CaseResult, CaseStatus, ProjectId, SuiteId};

use crate::model::{ExecutionStatus, ReportedTest, TestOutcome};
use crate::tags::{parse_step_case_ids, parse_test_tags};

lazy_static! {
    /// ANSI escape sequences and other terminal control characters, stripped
    /// from error output before it is sent to TestRail.
    static ref CONTROL_CHARS: Regex =
        Regex::new(r"\x1b\[[0-9;]*[A-Za-z]|[\x00-\x08\x0b\x0c\x0e-\x1f\x7f]").unwrap();
}

/// File paths captured during one test, associated with one case ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentData {
    pub case_id: CaseId,
    pub files: Vec<PathBuf>,
}

/// Map a runner status onto a TestRail case status.
///
/// TestRail has no analog for "timed out" or "interrupted"; both degrade to
/// failed, since either way the test did not complete successfully. This
/// mapping is fixed, not configurable.
pub fn convert_test_status(status: ExecutionStatus) -> CaseStatus {
    match status {
        ExecutionStatus::Passed => CaseStatus::Passed,
        ExecutionStatus::Failed | ExecutionStatus::TimedOut | ExecutionStatus::Interrupted => {
            CaseStatus::Failed
        }
        ExecutionStatus::Skipped => CaseStatus::Blocked,
        ExecutionStatus::Unknown => CaseStatus::Untested,
    }
}

/// Format a millisecond duration as TestRail elapsed time: whole seconds,
/// rounded up so a 1ms test is never reported as "0s".
pub fn format_elapsed(ms: u64) -> String {
    let secs = ms.div_ceil(1000);
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Elapsed field for a result: omitted entirely for zero/unknown durations.
fn elapsed_field(ms: u64) -> Option<String> {
    (ms > 0).then(|| format_elapsed(ms))
}

/// Strip ANSI escapes and control characters from error output.
fn sanitize(message: &str) -> String {
    CONTROL_CHARS.replace_all(message, "").into_owned()
}

/// Human-readable execution summary for one test.
///
/// Failures concatenate every captured error message, numbered when there is
/// more than one.
pub fn generate_comment(test: &ReportedTest, outcome: &TestOutcome) -> String {
    let elapsed = format_elapsed(outcome.duration_ms);
    match outcome.status {
        ExecutionStatus::Passed => format!("{} passed in {}", test.title, elapsed),
        ExecutionStatus::Failed => {
            let messages: Vec<String> = outcome
                .errors
                .iter()
                .filter_map(|e| e.message.as_deref())
                .map(sanitize)
                .collect();
            match messages.len() {
                0 => format!("{} failed: Unknown error", test.title),
                1 => format!("{} failed: {}", test.title, messages[0]),
                _ => {
                    let numbered: Vec<String> = messages
                        .iter()
                        .enumerate()
                        .map(|(i, m)| format!("{}. {}", i + 1, m))
                        .collect();
                    format!("{} failed:\n{}", test.title, numbered.join("\n"))
                }
            }
        }
        ExecutionStatus::TimedOut => format!("{} timed out in {}", test.title, elapsed),
        ExecutionStatus::Interrupted => format!("{} interrupted", test.title),
        ExecutionStatus::Skipped => format!("{} skipped", test.title),
        ExecutionStatus::Unknown => format!("{} status unknown", test.title),
    }
}

/// Convert one finished test into per-case results.
///
/// Every case ID the test's tags resolve to gets the test-level
/// status/comment/elapsed. Steps whose titles carry step-grammar case IDs
/// then override their own case's entry: a clean step inside an otherwise
/// failing test is reported as passed with the step's duration and comment.
/// An errored step never overrides; the test-level failure wins.
pub fn convert_test_result(
    test: &ReportedTest,
    outcome: &TestOutcome,
    default_project_id: Option<ProjectId>,
    default_suite_id: Option<SuiteId>,
) -> Vec<CaseResult> {
    let Some(combos) = parse_test_tags(&test.tags, default_project_id, default_suite_id) else {
        return Vec::new();
    };

    let status = convert_test_status(outcome.status);
    let comment = generate_comment(test, outcome);
    let elapsed = elapsed_field(outcome.duration_ms);

    let mut results: Vec<CaseResult> = combos
        .iter()
        .flat_map(|combo| combo.case_ids.iter().copied())
        .map(|case_id| CaseResult {
            case_id,
            status_id: status,
            comment: comment.clone(),
            elapsed: elapsed.clone(),
        })
        .collect();

    for step in &outcome.steps {
        for case_id in parse_step_case_ids(&step.title) {
            if step.error.is_some() {
                debug!(case_id, step = %step.title, "errored step does not override test result");
                continue;
            }
            match results.iter_mut().find(|r| r.case_id == case_id) {
                Some(result) => {
                    result.status_id = CaseStatus::Passed;
                    result.comment = match elapsed_field(step.duration_ms) {
                        Some(ref e) => format!("{} passed in {}", sanitize(&step.title), e),
                        None => format!("{} passed", sanitize(&step.title)),
                    };
                    result.elapsed = elapsed_field(step.duration_ms);
                }
                None => {
                    debug!(case_id, step = %step.title, "step case ID not among test tags, ignored");
                }
            }
        }
    }

    results
}

/// Collect attachment file paths and replicate them across every case ID the
/// test's tags resolve to.
pub fn extract_attachment_data(
    test: &ReportedTest,
    outcome: &TestOutcome,
    default_project_id: Option<ProjectId>,
    default_suite_id: Option<SuiteId>,
) -> Vec<AttachmentData> {
    let files: Vec<PathBuf> = outcome
        .attachments
        .iter()
        .filter_map(|a| a.path.clone())
        .collect();
    if files.is_empty() {
        return Vec::new();
    }

    let Some(combos) = parse_test_tags(&test.tags, default_project_id, default_suite_id) else {
        return Vec::new();
    };

    combos
        .iter()
        .flat_map(|combo| combo.case_ids.iter().copied())
        .map(|case_id| AttachmentData {
            case_id,
            files: files.clone(),
        })
        .collect()
}
