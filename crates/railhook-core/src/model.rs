//! Upstream test-runner event model.
//!
//! The reporter does not depend on any concrete runner; an adapter over the
//! actual event source fills these structs from its own test/result shapes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Execution status of a single test, as reported by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    Passed,
    Failed,
    TimedOut,
    Interrupted,
    Skipped,
    /// Runner states this reporter does not model.
    #[serde(other)]
    Unknown,
}

/// Final status of the overall test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Passed,
    Failed,
    Interrupted,
    TimedOut,
}

/// Identity of one test: what the reporter needs to know before it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedTest {
    pub title: String,
    /// Free-form tags; the ones encoding TestRail identifiers are picked up,
    /// everything else is ignored.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One error captured during a test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestError {
    #[serde(default)]
    pub message: Option<String>,
}

/// One named step inside a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    pub title: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<TestError>,
}

/// One attachment captured during a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAttachment {
    pub name: String,
    /// Attachments without a backing file (inline buffers) carry no path and
    /// are never uploaded.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Outcome of one finished test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub errors: Vec<TestError>,
    #[serde(default)]
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub attachments: Vec<TestAttachment>,
}

impl TestOutcome {
    /// Outcome with the given status and no further detail.
    pub fn with_status(status: ExecutionStatus) -> Self {
        Self {
            status,
            duration_ms: 0,
            errors: Vec::new(),
            steps: Vec::new(),
            attachments: Vec::new(),
        }
    }
}
