//! TestRail API client for the railhook reporter.
//!
//! Wraps the TestRail HTTP API behind a fixed base path with basic
//! credentials and a fixed retry policy: up to 3 retries with exponential
//! backoff, retrying on network errors, 429 responses and any 5xx response.
//!
//! # Quick Start
//!
//! ```no_run
//! use railhook_client::{AddRunPayload, ClientConfig, TestRailClient};
//!
//! # async fn example() -> Result<(), railhook_client::ClientError> {
//! let client = TestRailClient::new(ClientConfig::new(
//!     "https://acme.testrail.io",
//!     "user@example.com",
//!     "api-key",
//! ))?;
//!
//! let run = client
//!     .add_run(110, &AddRunPayload {
//!         suite_id: 374,
//!         name: "Nightly run".into(),
//!         case_ids: vec![13082],
//!         include_all: false,
//!     })
//!     .await?;
//! println!("created run {}", run.id);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::TestRailClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use types::{
    AddRunPayload, AttachmentAdded, CaseId, CaseResult, CaseStatus, ProjectId, ResultCreated,
    ResultId, Run, RunId, RunTest, Suite, SuiteId,
};
