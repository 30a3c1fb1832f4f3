//! Grouping results into runs and collapsing duplicate case results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use railhook_client::{CaseId, CaseResult, ProjectId, ResultId, RunId, SuiteId};

use crate::results::AttachmentData;

/// A (project, suite) combo with its remotely created run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCreated {
    pub run_id: RunId,
    pub project_id: ProjectId,
    pub suite_id: SuiteId,
    pub case_ids: Vec<CaseId>,
    /// Run URL, when the server reported one.
    #[serde(default)]
    pub url: Option<String>,
}

/// All results destined for one run, after grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResult {
    pub run_id: RunId,
    pub case_results: Vec<CaseResult>,
}

/// Maps a submitted case result to the result ID the server assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseResultMatch {
    pub case_id: CaseId,
    pub result_id: ResultId,
}

/// One file to upload to one submitted result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPayload {
    pub result_id: ResultId,
    pub file: PathBuf,
}

/// Assign every accumulated case result to the run whose case set contains
/// it. A run that matches nothing is still emitted, so the caller reports it
/// instead of silently skipping it.
pub fn group_test_results(results: &[CaseResult], runs: &[RunCreated]) -> Vec<FinalResult> {
    runs.iter()
        .map(|run| {
            let case_results: Vec<CaseResult> = results
                .iter()
                .filter(|result| run.case_ids.contains(&result.case_id))
                .cloned()
                .collect();

            if case_results.is_empty() {
                warn!(run_id = run.run_id, "no matching case results for run");
            }

            FinalResult {
                run_id: run.run_id,
                case_results,
            }
        })
        .collect()
}

/// Collapse duplicate results for the same case into one, keeping the
/// highest-priority status (passed > failed > skipped > blocked > untested).
///
/// When the same case is exercised by several tests (retries, parameterized
/// variants), the most conclusive outcome represents it; a later untested or
/// blocked duplicate never masks a definitive pass or fail. Ties keep the
/// first-seen entry, which makes the operation idempotent.
pub fn filter_duplicating_cases(result: FinalResult) -> FinalResult {
    let mut seen_case_ids: Vec<CaseId> = Vec::new();
    let mut kept: Vec<CaseResult> = Vec::new();

    for candidate in result.case_results {
        match seen_case_ids.iter().position(|&id| id == candidate.case_id) {
            None => {
                seen_case_ids.push(candidate.case_id);
                kept.push(candidate);
            }
            Some(index) => {
                warn!(case_id = candidate.case_id, "multiple results for case, keeping highest priority");
                if candidate.status_id.priority() > kept[index].status_id.priority() {
                    kept[index] = candidate;
                }
            }
        }
    }

    FinalResult {
        run_id: result.run_id,
        case_results: kept,
    }
}

/// Join accumulated attachments against submitted results by case ID,
/// flattening to per-file upload payloads. Attachments whose case never got
/// a submitted result are reported and dropped.
pub fn group_attachments(
    attachments: &[AttachmentData],
    matches: &[CaseResultMatch],
) -> Vec<AttachmentPayload> {
    if attachments.is_empty() || matches.is_empty() {
        return Vec::new();
    }

    let mut payloads = Vec::new();
    for attachment in attachments {
        match matches.iter().find(|m| m.case_id == attachment.case_id) {
            Some(matched) => {
                payloads.extend(attachment.files.iter().map(|file| AttachmentPayload {
                    result_id: matched.result_id,
                    file: file.clone(),
                }));
            }
            None => {
                error!(
                    case_id = attachment.case_id,
                    "no matching submitted result for attachments"
                );
            }
        }
    }

    payloads
}
