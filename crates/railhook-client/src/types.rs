//! Wire types for the TestRail API.

use serde::{Deserialize, Serialize};

/// TestRail project ID.
pub type ProjectId = u64;
/// TestRail suite ID.
pub type SuiteId = u64;
/// TestRail case ID.
pub type CaseId = u64;
/// TestRail run ID.
pub type RunId = u64;
/// TestRail result ID.
pub type ResultId = u64;

/// TestRail case statuses, by their numeric status IDs.
///
/// TestRail has no built-in "skipped" status; this reporter repurposes the
/// otherwise unused retest slot (4) for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum CaseStatus {
    Passed,
    Blocked,
    Untested,
    Skipped,
    Failed,
}

impl CaseStatus {
    /// Rank used when collapsing duplicate results for one case: the most
    /// conclusive outcome wins. Fixed total order, no other statuses ranked.
    pub fn priority(self) -> u8 {
        match self {
            Self::Passed => 5,
            Self::Failed => 4,
            Self::Skipped => 3,
            Self::Blocked => 2,
            Self::Untested => 1,
        }
    }
}

impl From<CaseStatus> for u8 {
    fn from(status: CaseStatus) -> Self {
        match status {
            CaseStatus::Passed => 1,
            CaseStatus::Blocked => 2,
            CaseStatus::Untested => 3,
            CaseStatus::Skipped => 4,
            CaseStatus::Failed => 5,
        }
    }
}

impl From<u8> for CaseStatus {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Passed,
            2 => Self::Blocked,
            4 => Self::Skipped,
            5 => Self::Failed,
            _ => Self::Untested,
        }
    }
}

/// One case result as submitted to `add_results_for_cases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: CaseId,
    pub status_id: CaseStatus,
    pub comment: String,
    /// Formatted duration ("45s", "1m 5s"). Omitted entirely when the
    /// duration is zero or unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
}

/// Payload for `add_run/{project_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct AddRunPayload {
    pub suite_id: SuiteId,
    pub name: String,
    pub case_ids: Vec<CaseId>,
    pub include_all: bool,
}

/// A test run as returned by `add_run` / `get_run`.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub name: String,
    pub project_id: ProjectId,
    pub suite_id: SuiteId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
}

/// A suite as returned by `get_suite`.
#[derive(Debug, Clone, Deserialize)]
pub struct Suite {
    pub id: SuiteId,
    pub name: String,
}

/// One test entry of an existing run, as returned by `get_tests`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunTest {
    pub id: u64,
    pub case_id: CaseId,
    #[serde(default)]
    pub status_id: Option<CaseStatus>,
}

/// One result record as returned by `add_results_for_cases`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultCreated {
    pub id: ResultId,
    #[serde(default)]
    pub status_id: Option<CaseStatus>,
}

/// Response of `add_attachment_to_result`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentAdded {
    pub attachment_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_status_ids() {
        for status in [
            CaseStatus::Passed,
            CaseStatus::Blocked,
            CaseStatus::Untested,
            CaseStatus::Skipped,
            CaseStatus::Failed,
        ] {
            assert_eq!(CaseStatus::from(u8::from(status)), status);
        }
    }

    #[test]
    fn unknown_status_id_decodes_to_untested() {
        assert_eq!(CaseStatus::from(9), CaseStatus::Untested);
        assert_eq!(CaseStatus::from(0), CaseStatus::Untested);
    }

    #[test]
    fn elapsed_is_omitted_when_none() {
        let result = CaseResult {
            case_id: 333,
            status_id: CaseStatus::Passed,
            comment: "ok".into(),
            elapsed: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("elapsed").is_none());
        assert_eq!(json["status_id"], 1);
    }

    #[test]
    fn elapsed_is_serialized_when_present() {
        let result = CaseResult {
            case_id: 333,
            status_id: CaseStatus::Failed,
            comment: "boom".into(),
            elapsed: Some("2s".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["elapsed"], "2s");
        assert_eq!(json["status_id"], 5);
    }
}
