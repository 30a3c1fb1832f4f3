//! HTTP client for the TestRail API.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::types::{
    AddRunPayload, AttachmentAdded, CaseResult, ProjectId, ResultCreated, ResultId, Run, RunId,
    RunTest, Suite, SuiteId,
};

/// User agent for TestRail requests.
const USER_AGENT_VALUE: &str = concat!("railhook/", env!("CARGO_PKG_VERSION"));

/// TestRail API client.
///
/// All operations share one fixed policy: up to `max_retries` retries with
/// exponential backoff, triggered by network errors, 429 responses (honouring
/// `Retry-After`) and any 5xx response.
#[derive(Debug, Clone)]
pub struct TestRailClient {
    /// HTTP client.
    client: reqwest::Client,

    /// Base URL including the TestRail API prefix.
    base_url: String,

    /// Configuration.
    config: ClientConfig,
}

/// `get_tests` responses come either paginated (TestRail 6.7+) or as a bare
/// array (older instances).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TestsResponse {
    Paged { tests: Vec<RunTest> },
    Plain(Vec<RunTest>),
}

impl TestRailClient {
    /// Create a new client.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ClientError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        // TestRail serves its API behind index.php
        let base_url = format!(
            "{}/index.php?/api/v2",
            config.domain.trim_end_matches('/')
        );

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Create a test run for one project/suite combo.
    pub async fn add_run(&self, project_id: ProjectId, payload: &AddRunPayload) -> ClientResult<Run> {
        let url = format!("{}/add_run/{}", self.base_url, project_id);
        debug!(project_id, suite_id = payload.suite_id, name = %payload.name, "creating test run");

        let body = serde_json::to_value(payload).map_err(|e| ClientError::InvalidResponse {
            message: format!("failed to encode add_run payload: {}", e),
        })?;

        let response = self.request(&url, Some(body)).await?;
        let run: Run = decode(response, "add_run").await?;
        debug!(run_id = run.id, "run created");
        Ok(run)
    }

    /// Submit case results to an existing run.
    ///
    /// Returns one created-result record per submitted case, in submission
    /// order. The caller is expected to cross-check the returned count.
    pub async fn add_results_for_cases(
        &self,
        run_id: RunId,
        results: &[CaseResult],
    ) -> ClientResult<Vec<ResultCreated>> {
        let url = format!("{}/add_results_for_cases/{}", self.base_url, run_id);
        debug!(run_id, count = results.len(), "adding results to run");

        let body = serde_json::json!({ "results": results });
        let response = self.request(&url, Some(body)).await?;
        let created: Vec<ResultCreated> = decode(response, "add_results_for_cases").await?;
        debug!(run_id, count = created.len(), "results added");
        Ok(created)
    }

    /// Close a run. Closed runs can no longer accept results.
    pub async fn close_run(&self, run_id: RunId) -> ClientResult<()> {
        let url = format!("{}/close_run/{}", self.base_url, run_id);
        debug!(run_id, "closing run");

        self.request(&url, Some(serde_json::json!({}))).await?;
        debug!(run_id, "run closed");
        Ok(())
    }

    /// Upload one attachment file to one submitted result.
    pub async fn add_attachment_to_result(
        &self,
        result_id: ResultId,
        path: &Path,
    ) -> ClientResult<AttachmentAdded> {
        let url = format!("{}/add_attachment_to_result/{}", self.base_url, result_id);

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Attachment {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        debug!(result_id, file = %file_name, size = bytes.len(), "uploading attachment");

        // Multipart bodies cannot be reused across attempts, so the form is
        // rebuilt from the buffered bytes on every retry.
        let response = self
            .send_with_retry(&url, || {
                let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                let form = multipart::Form::new().part("attachment", part);
                self.client
                    .post(&url)
                    .basic_auth(&self.config.username, Some(&self.config.password))
                    .multipart(form)
            })
            .await?;

        decode(response, "add_attachment_to_result").await
    }

    /// Fetch an existing run.
    pub async fn get_run(&self, run_id: RunId) -> ClientResult<Run> {
        let url = format!("{}/get_run/{}", self.base_url, run_id);
        debug!(run_id, "fetching run");

        let response = self.request(&url, None).await?;
        decode(response, "get_run").await
    }

    /// Fetch the test entries of an existing run (one per included case).
    pub async fn get_tests(&self, run_id: RunId) -> ClientResult<Vec<RunTest>> {
        let url = format!("{}/get_tests/{}", self.base_url, run_id);
        debug!(run_id, "fetching run tests");

        let response = self.request(&url, None).await?;
        let tests: TestsResponse = decode(response, "get_tests").await?;
        Ok(match tests {
            TestsResponse::Paged { tests } | TestsResponse::Plain(tests) => tests,
        })
    }

    /// Fetch a suite, e.g. to resolve its name for run-name templating.
    pub async fn get_suite(&self, suite_id: SuiteId) -> ClientResult<Suite> {
        let url = format!("{}/get_suite/{}", self.base_url, suite_id);
        debug!(suite_id, "fetching suite");

        let response = self.request(&url, None).await?;
        decode(response, "get_suite").await
    }

    /// Issue a JSON request (GET when `body` is `None`, POST otherwise) with
    /// the standard retry policy.
    async fn request(
        &self,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<reqwest::Response> {
        self.send_with_retry(url, || {
            let builder = match &body {
                Some(json) => self
                    .client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .json(json),
                None => self.client.get(url),
            };
            builder.basic_auth(&self.config.username, Some(&self.config.password))
        })
        .await
    }

    /// Run one request builder through the retry loop.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> ClientResult<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            let result = send_once(build(), url).await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;

                    let backoff = match &e {
                        ClientError::RateLimited { retry_after } => {
                            retry_after.unwrap_or(Duration::from_secs(1 << retries))
                        }
                        _ => Duration::from_secs(1 << retries),
                    };

                    // Cap at 30 seconds
                    let backoff = backoff.min(Duration::from_secs(30));

                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries,
                        backoff_secs = backoff.as_secs(),
                        url,
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Send a single request and map the status code, without retrying.
async fn send_once(builder: reqwest::RequestBuilder, url: &str) -> ClientResult<reqwest::Response> {
    let response = builder.send().await?;
    let status = response.status();

    match status.as_u16() {
        200..=299 => Ok(response),

        401 | 403 => Err(ClientError::Unauthorized {
            message: "invalid credentials or insufficient permissions".to_string(),
        }),

        404 => Err(ClientError::NotFound {
            resource: url.to_string(),
        }),

        429 => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);

            Err(ClientError::RateLimited { retry_after })
        }

        code => {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::Api {
                status: code,
                message,
            })
        }
    }
}

/// Decode a JSON response body, mapping decode failures to `InvalidResponse`.
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    operation: &str,
) -> ClientResult<T> {
    response
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse {
            message: format!("failed to parse {} response: {}", operation, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_includes_api_prefix_and_strips_trailing_slash() {
        let client =
            TestRailClient::new(ClientConfig::new("https://acme.testrail.io/", "u", "p")).unwrap();
        assert_eq!(
            client.base_url(),
            "https://acme.testrail.io/index.php?/api/v2"
        );
    }
}
