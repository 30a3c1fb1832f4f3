//! Result-aggregation and tag-resolution pipeline for reporting test runs
//! to TestRail.
//!
//! The pipeline consumes per-test events from a test runner (through the
//! narrow [`model`] interface), resolves TestRail identifiers from free-form
//! tags, aggregates and deduplicates case results per logical run, and
//! submits everything through a retrying, chunked HTTP client.
//!
//! # Tag shapes
//!
//! | Shape | Example | Requires |
//! |-------|---------|----------|
//! | full | `110-374-13082`, `110-374-R13082` | — |
//! | suite-case | `S374-13082` | `defaultProjectId` |
//! | case-only | `C13082` | `defaultProjectId` + `defaultSuiteId` |
//!
//! Step titles may additionally carry `@13082`-style markers; a clean step
//! overrides its case's result inside an otherwise failing test.
//!
//! # Quick Start
//!
//! ```no_run
//! use railhook_core::{Reporter, ReporterOptions};
//! use railhook_core::model::{ExecutionStatus, ReportedTest, RunStatus, TestOutcome};
//!
//! # async fn example() {
//! let mut reporter = Reporter::new(ReporterOptions::new(
//!     "https://acme.testrail.io",
//!     "user@example.com",
//!     "api-key",
//! ));
//!
//! let test = ReportedTest {
//!     title: "Login works".into(),
//!     tags: vec!["110-374-13082".into()],
//! };
//! reporter.on_begin(std::slice::from_ref(&test));
//! reporter.on_test_end(&test, &TestOutcome::with_status(ExecutionStatus::Passed));
//! reporter.on_end(RunStatus::Passed).await;
//! # }
//! ```

pub mod chunk;
pub mod config;
pub mod group;
pub mod model;
pub mod reporter;
pub mod results;
pub mod run_name;
pub mod tags;

pub use chunk::resolve_in_chunks;
pub use config::{ConfigError, ReporterOptions};
pub use group::{
    filter_duplicating_cases, group_attachments, group_test_results, AttachmentPayload,
    CaseResultMatch, FinalResult, RunCreated,
};
pub use model::{
    ExecutionStatus, ReportedTest, RunStatus, TestAttachment, TestError, TestOutcome, TestStep,
};
pub use reporter::{Reporter, RunMetadata};
pub use results::{
    convert_test_result, convert_test_status, extract_attachment_data, format_elapsed,
    generate_comment, AttachmentData,
};
pub use run_name::{format_run_name, TEMPLATE_DATE, TEMPLATE_SUITE, TEMPLATE_TIMESTAMP};
pub use tags::{parse_single_tag, parse_step_case_ids, parse_test_tags, ParsedTag, ProjectSuiteCombo};

// Wire-level types come from the client crate.
pub use railhook_client::{CaseResult, CaseStatus};
