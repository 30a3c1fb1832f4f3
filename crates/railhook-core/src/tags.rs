//! Tag grammars: mapping free-form test tags onto TestRail identifiers.
//!
//! Tags are advisory, not contractual: anything that does not match one of
//! the known shapes is silently ignored.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::error;

use railhook_client::{CaseId, ProjectId, SuiteId};

lazy_static! {
    /// Full shape: `110-374-13082` or `110-374-R13082`.
    static ref TAG_FULL: Regex = Regex::new(r"(\d+)-(\d+)-\D?(\d+)").unwrap();
    /// Suite-case shape: `S374-13082` or `S374-R13082` (needs a default project).
    static ref TAG_SUITE_CASE: Regex = Regex::new(r"S(\d+)-\D?(\d+)").unwrap();
    /// Case-only shape: `C13082` (needs default project and suite).
    static ref TAG_CASE_ONLY: Regex = Regex::new(r"C(\d+)").unwrap();
    /// Step-title shape: `@13082` or `@R13082`, any number of occurrences.
    static ref TAG_STEP: Regex = Regex::new(r"@\D?(\d+)").unwrap();
}

/// TestRail identifiers extracted from one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTag {
    pub project_id: ProjectId,
    pub suite_id: SuiteId,
    pub case_id: CaseId,
}

/// All case IDs of one (project, suite) pairing, deduplicated in
/// first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSuiteCombo {
    pub project_id: ProjectId,
    pub suite_id: SuiteId,
    pub case_ids: Vec<CaseId>,
}

/// Parse one tag, trying the three shapes in order.
///
/// The case segment may carry a single leading non-digit marker ("R13082",
/// "C13082"), stripped before parsing. Returns `None` when nothing matches
/// or a shape's required defaults are absent.
pub fn parse_single_tag(
    tag: &str,
    default_project_id: Option<ProjectId>,
    default_suite_id: Option<SuiteId>,
) -> Option<ParsedTag> {
    if let Some(caps) = TAG_FULL.captures(tag) {
        return Some(ParsedTag {
            project_id: parse_id(&caps[1])?,
            suite_id: parse_id(&caps[2])?,
            case_id: parse_id(&caps[3])?,
        });
    }

    if let Some(caps) = TAG_SUITE_CASE.captures(tag) {
        if let Some(project_id) = default_project_id {
            return Some(ParsedTag {
                project_id,
                suite_id: parse_id(&caps[1])?,
                case_id: parse_id(&caps[2])?,
            });
        }
    }

    if let Some(caps) = TAG_CASE_ONLY.captures(tag) {
        if let (Some(project_id), Some(suite_id)) = (default_project_id, default_suite_id) {
            return Some(ParsedTag {
                project_id,
                suite_id,
                case_id: parse_id(&caps[1])?,
            });
        }
    }

    None
}

/// Parse every tag independently and group the survivors by
/// (project, suite), deduplicating case IDs within each group.
///
/// Returns `None` when zero tags matched, never an empty vec, so callers can
/// distinguish "nothing to report" from "one empty group".
pub fn parse_test_tags(
    tags: &[String],
    default_project_id: Option<ProjectId>,
    default_suite_id: Option<SuiteId>,
) -> Option<Vec<ProjectSuiteCombo>> {
    let parsed: Vec<ParsedTag> = tags
        .iter()
        .filter_map(|tag| parse_single_tag(tag, default_project_id, default_suite_id))
        .collect();

    if parsed.is_empty() {
        return None;
    }

    let mut combos: Vec<ProjectSuiteCombo> = Vec::new();
    for tag in parsed {
        match combos
            .iter_mut()
            .find(|c| c.project_id == tag.project_id && c.suite_id == tag.suite_id)
        {
            Some(combo) => {
                if !combo.case_ids.contains(&tag.case_id) {
                    combo.case_ids.push(tag.case_id);
                }
            }
            None => combos.push(ProjectSuiteCombo {
                project_id: tag.project_id,
                suite_id: tag.suite_id,
                case_ids: vec![tag.case_id],
            }),
        }
    }

    Some(combos)
}

/// Extract every step-grammar case ID from a step title.
///
/// An ID that cannot be parsed as an integer is reported as a processing
/// error and skipped: a marker that looks like a case reference but isn't
/// one indicates an authoring mistake in the step title.
pub fn parse_step_case_ids(title: &str) -> Vec<CaseId> {
    TAG_STEP
        .captures_iter(title)
        .filter_map(|caps| {
            let digits = &caps[1];
            match digits.parse::<CaseId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    error!(step = title, value = digits, error = %e, "invalid case ID in step title");
                    None
                }
            }
        })
        .collect()
}

fn parse_id(digits: &str) -> Option<u64> {
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_tag_extracts_all_three_ids() {
        assert_eq!(
            parse_single_tag("110-374-13082", None, None),
            Some(ParsedTag {
                project_id: 110,
                suite_id: 374,
                case_id: 13082
            })
        );
    }

    #[test]
    fn case_marker_is_stripped() {
        let expected = Some(ParsedTag {
            project_id: 110,
            suite_id: 374,
            case_id: 13082,
        });
        assert_eq!(parse_single_tag("110-374-R13082", None, None), expected);
        assert_eq!(parse_single_tag("110-374-C13082", None, None), expected);
    }

    #[test]
    fn runner_tag_prefix_is_tolerated() {
        assert_eq!(
            parse_single_tag("@111-222-333", None, None),
            Some(ParsedTag {
                project_id: 111,
                suite_id: 222,
                case_id: 333
            })
        );
    }

    #[test]
    fn suite_case_shape_requires_default_project() {
        assert_eq!(parse_single_tag("S374-13082", None, None), None);
        assert_eq!(
            parse_single_tag("S374-R13082", Some(110), None),
            Some(ParsedTag {
                project_id: 110,
                suite_id: 374,
                case_id: 13082
            })
        );
    }

    #[test]
    fn case_only_shape_requires_both_defaults() {
        assert_eq!(parse_single_tag("C13082", Some(110), None), None);
        assert_eq!(parse_single_tag("C13082", None, Some(374)), None);
        assert_eq!(
            parse_single_tag("C13082", Some(110), Some(374)),
            Some(ParsedTag {
                project_id: 110,
                suite_id: 374,
                case_id: 13082
            })
        );
    }

    #[test]
    fn malformed_tags_are_ignored() {
        assert_eq!(parse_single_tag("smoke", None, None), None);
        assert_eq!(parse_single_tag("abc-def-ghi", None, None), None);
        assert_eq!(parse_single_tag("", None, None), None);
    }

    fn tags(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn no_matching_tags_yields_none_not_empty() {
        assert_eq!(parse_test_tags(&tags(&["smoke", "slow"]), None, None), None);
        assert_eq!(parse_test_tags(&[], None, None), None);
    }

    #[test]
    fn tags_group_by_project_suite_in_first_seen_order() {
        let combos = parse_test_tags(
            &tags(&["110-374-1", "111-500-7", "110-374-2"]),
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            combos,
            vec![
                ProjectSuiteCombo {
                    project_id: 110,
                    suite_id: 374,
                    case_ids: vec![1, 2]
                },
                ProjectSuiteCombo {
                    project_id: 111,
                    suite_id: 500,
                    case_ids: vec![7]
                },
            ]
        );
    }

    #[test]
    fn duplicate_case_ids_are_coalesced_once() {
        let combos =
            parse_test_tags(&tags(&["110-374-13082", "110-374-R13082"]), None, None).unwrap();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].case_ids, vec![13082]);
    }

    #[test]
    fn unmatched_tags_are_discarded_from_groups() {
        let combos =
            parse_test_tags(&tags(&["smoke", "110-374-13082", "flaky"]), None, None).unwrap();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].case_ids, vec![13082]);
    }

    #[test]
    fn step_case_ids_are_extracted_globally() {
        assert_eq!(parse_step_case_ids("Check login @R123 and @456"), vec![123, 456]);
        assert_eq!(parse_step_case_ids("no markers here"), Vec::<u64>::new());
    }

    #[test]
    fn overflowing_step_case_id_is_skipped() {
        // 21 digits, past u64::MAX
        assert_eq!(
            parse_step_case_ids("@999999999999999999999 then @12"),
            vec![12]
        );
    }
}
