//! The reporter: sequences the pipeline from "test run finished" to
//! "TestRail updated".

use tracing::{debug, error, info, warn};

use railhook_client::{AddRunPayload, CaseResult, ProjectId, RunId, SuiteId, TestRailClient};

use crate::chunk::resolve_in_chunks;
use crate::config::ReporterOptions;
use crate::group::{
    filter_duplicating_cases, group_attachments, group_test_results, CaseResultMatch, FinalResult,
    RunCreated,
};
use crate::model::{ReportedTest, RunStatus, TestOutcome};
use crate::results::{convert_test_result, extract_attachment_data, AttachmentData};
use crate::run_name::{format_run_name, TEMPLATE_SUITE};
use crate::tags::{parse_test_tags, ProjectSuiteCombo};

/// Where one combo's results ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub project_id: ProjectId,
    pub suite_id: SuiteId,
    pub run_id: RunId,
    pub url: Option<String>,
}

/// Accumulates per-test output during a run and submits everything to
/// TestRail once the run finishes.
///
/// Per-test handlers are synchronous and only append to reporter-owned
/// state; all network work happens in [`Reporter::on_end`], chunked to the
/// configured concurrency. The reporter completes its lifecycle exactly
/// once; further `on_end` calls are no-ops.
pub struct Reporter {
    options: ReporterOptions,
    options_valid: bool,
    client: Option<TestRailClient>,

    test_runs: Option<Vec<ProjectSuiteCombo>>,
    test_results: Vec<CaseResult>,
    attachments: Vec<AttachmentData>,

    run_metadata: Vec<RunMetadata>,
    completed: bool,
}

impl Reporter {
    /// Create a reporter. Invalid options are reported once, here, and make
    /// every later stage a no-op.
    pub fn new(options: ReporterOptions) -> Self {
        let options_valid = match options.validate() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "reporter options are not valid, no test runs will be created");
                false
            }
        };

        let client = if options_valid {
            match TestRailClient::new(options.client_config()) {
                Ok(client) => Some(client),
                Err(e) => {
                    error!(error = %e, "failed to set up TestRail client");
                    None
                }
            }
        } else {
            None
        };

        debug!(
            include_all_cases = options.include_all_cases,
            include_attachments = options.include_attachments,
            close_runs = options.close_runs,
            api_chunk_size = options.api_chunk_size,
            run_name_template = %options.run_name_template,
            default_project_id = ?options.default_project_id,
            default_suite_id = ?options.default_suite_id,
            use_existing_run = ?options.use_existing_run,
            "reporter options"
        );

        Self {
            options,
            options_valid,
            client,
            test_runs: None,
            test_results: Vec::new(),
            attachments: Vec::new(),
            run_metadata: Vec::new(),
            completed: false,
        }
    }

    /// Parse every tag of the full test list into run buckets.
    pub fn on_begin(&mut self, tests: &[ReportedTest]) {
        let all_tags: Vec<String> = tests.iter().flat_map(|t| t.tags.iter().cloned()).collect();
        self.test_runs = parse_test_tags(
            &all_tags,
            self.options.default_project_id,
            self.options.default_suite_id,
        );
        debug!(runs = ?self.test_runs, "runs to create");

        if self.test_runs.is_none() {
            warn!("no tags in expected format found, no test runs will be created");
        }
    }

    /// Record one finished test.
    pub fn on_test_end(&mut self, test: &ReportedTest, outcome: &TestOutcome) {
        debug!(test = %test.title, status = ?outcome.status, "test finished");
        self.test_results.extend(convert_test_result(
            test,
            outcome,
            self.options.default_project_id,
            self.options.default_suite_id,
        ));
        self.attachments.extend(extract_attachment_data(
            test,
            outcome,
            self.options.default_project_id,
            self.options.default_suite_id,
        ));
    }

    /// Resolve runs, compile and submit results, then handle attachments and
    /// run closing. Each stage may short-circuit with a logged reason; the
    /// worst outcome is "no runs updated", never a crash.
    pub async fn on_end(&mut self, status: RunStatus) {
        if self.completed {
            warn!("reporter already completed, ignoring repeated on_end");
            return;
        }
        self.completed = true;

        if !self.should_submit(status) {
            return;
        }
        let Some(client) = self.client.clone() else {
            return;
        };

        let runs_created = match self.options.use_existing_run {
            Some(run_id) => self.use_existing_test_run(&client, run_id).await,
            None => self.create_test_runs(&client).await,
        };

        self.run_metadata = runs_created
            .iter()
            .map(|run| RunMetadata {
                project_id: run.project_id,
                suite_id: run.suite_id,
                run_id: run.run_id,
                url: run.url.clone(),
            })
            .collect();

        let final_results = compile_final_results(&self.test_results, &runs_created);
        debug!(runs = final_results.len(), "test runs to update");

        if final_results.is_empty() {
            warn!("no test runs to update");
            return;
        }

        let matches = self.add_results_to_runs(&client, final_results.clone()).await;

        if self.options.include_attachments {
            self.add_attachments(&client, &matches).await;
        }

        let closing = self.options.close_runs && self.options.use_existing_run.is_none();
        if closing {
            let run_ids: Vec<RunId> = final_results.iter().map(|r| r.run_id).collect();
            self.close_test_runs(&client, run_ids).await;
        }

        if closing {
            info!("all test runs have been updated and closed");
        } else {
            info!("all test runs have been updated");
        }
        for meta in &self.run_metadata {
            if let Some(url) = &meta.url {
                info!(
                    project_id = meta.project_id,
                    suite_id = meta.suite_id,
                    run_id = meta.run_id,
                    url = %url,
                    "test run URL"
                );
            }
        }
    }

    /// URL of the first resolved run, when the server reported one.
    pub fn run_url(&self) -> Option<&str> {
        self.run_metadata.iter().find_map(|m| m.url.as_deref())
    }

    /// Per-combo run IDs and URLs, in creation order.
    pub fn run_metadata(&self) -> &[RunMetadata] {
        &self.run_metadata
    }

    fn should_submit(&self, status: RunStatus) -> bool {
        if !self.options_valid || self.client.is_none() {
            error!("reporter is not set up correctly, no test runs will be created");
            return false;
        }

        match status {
            RunStatus::Interrupted => {
                warn!("test run was interrupted, no test runs will be created");
                return false;
            }
            RunStatus::TimedOut => {
                warn!("test run was timed out, no test runs will be created");
                return false;
            }
            RunStatus::Passed | RunStatus::Failed => {}
        }

        if self.test_runs.is_none() && self.options.use_existing_run.is_none() {
            warn!("no test runs to create due to absence of tags in expected format");
            return false;
        }

        true
    }

    /// Resolve the externally supplied run: fetch it and the case IDs it
    /// already tracks. Mutually exclusive with per-combo creation.
    async fn use_existing_test_run(
        &self,
        client: &TestRailClient,
        run_id: RunId,
    ) -> Vec<RunCreated> {
        info!(run_id, "using existing test run");

        let run = match client.get_run(run_id).await {
            Ok(run) => run,
            Err(e) => {
                error!(run_id, error = %e, "failed to get existing test run");
                return Vec::new();
            }
        };

        let case_ids = match client.get_tests(run_id).await {
            Ok(tests) => tests.into_iter().map(|t| t.case_id).collect(),
            Err(e) => {
                error!(run_id, error = %e, "failed to list tests of existing run");
                return Vec::new();
            }
        };

        vec![RunCreated {
            run_id,
            project_id: run.project_id,
            suite_id: run.suite_id,
            case_ids,
            url: run.url,
        }]
    }

    /// Create one run per parsed combo, chunked.
    async fn create_test_runs(&self, client: &TestRailClient) -> Vec<RunCreated> {
        let combos = self.test_runs.clone().unwrap_or_default();
        debug!(count = combos.len(), "creating test runs");

        let template = self.options.run_name_template.clone();
        let template_needs_suite = template.contains(TEMPLATE_SUITE);
        let include_all = self.options.include_all_cases;

        resolve_in_chunks(combos, self.options.api_chunk_size, |combo| {
            let client = client.clone();
            let template = template.clone();
            async move {
                info!(
                    project_id = combo.project_id,
                    suite_id = combo.suite_id,
                    "creating a test run"
                );

                // The suite name is only worth a round trip when the
                // template actually references it.
                let suite_name = if template_needs_suite {
                    match client.get_suite(combo.suite_id).await {
                        Ok(suite) => Some(suite.name),
                        Err(e) => {
                            warn!(suite_id = combo.suite_id, error = %e, "failed to resolve suite name");
                            None
                        }
                    }
                } else {
                    None
                };

                let payload = AddRunPayload {
                    suite_id: combo.suite_id,
                    name: format_run_name(&template, suite_name.as_deref()),
                    case_ids: combo.case_ids.clone(),
                    include_all,
                };

                match client.add_run(combo.project_id, &payload).await {
                    Ok(run) => Some(RunCreated {
                        run_id: run.id,
                        project_id: combo.project_id,
                        suite_id: combo.suite_id,
                        case_ids: combo.case_ids,
                        url: run.url,
                    }),
                    Err(e) => {
                        error!(
                            project_id = combo.project_id,
                            suite_id = combo.suite_id,
                            error = %e,
                            "failed to create a test run"
                        );
                        None
                    }
                }
            }
        })
        .await
    }

    /// Submit each run's results, chunked, cross-checking the returned
    /// record count. A mismatch means partial remote failure: the run is
    /// treated as failed and contributes no matches.
    async fn add_results_to_runs(
        &self,
        client: &TestRailClient,
        final_results: Vec<FinalResult>,
    ) -> Vec<CaseResultMatch> {
        let matches: Vec<Vec<CaseResultMatch>> =
            resolve_in_chunks(final_results, self.options.api_chunk_size, |run| {
                let client = client.clone();
                async move {
                    if run.case_results.is_empty() {
                        warn!(run_id = run.run_id, "no results to submit for run");
                        return None;
                    }
                    info!(run_id = run.run_id, count = run.case_results.len(), "adding results to run");

                    match client.add_results_for_cases(run.run_id, &run.case_results).await {
                        Ok(created) => {
                            if created.len() != run.case_results.len() {
                                error!(
                                    run_id = run.run_id,
                                    sent = run.case_results.len(),
                                    received = created.len(),
                                    "number of results does not match number of cases"
                                );
                                return None;
                            }
                            // Request payload and response pair up by index.
                            Some(
                                run.case_results
                                    .iter()
                                    .zip(created)
                                    .map(|(result, record)| CaseResultMatch {
                                        case_id: result.case_id,
                                        result_id: record.id,
                                    })
                                    .collect::<Vec<_>>(),
                            )
                        }
                        Err(e) => {
                            error!(run_id = run.run_id, error = %e, "failed to add results to run");
                            None
                        }
                    }
                }
            })
            .await;

        matches.into_iter().flatten().collect()
    }

    /// Upload every grouped attachment file, chunked.
    async fn add_attachments(&self, client: &TestRailClient, matches: &[CaseResultMatch]) {
        let payloads = group_attachments(&self.attachments, matches);

        if payloads.is_empty() {
            info!("no attachments to add");
            return;
        }
        info!(count = payloads.len(), "adding attachments to results");

        resolve_in_chunks(payloads, self.options.api_chunk_size, |payload| {
            let client = client.clone();
            async move {
                match client
                    .add_attachment_to_result(payload.result_id, &payload.file)
                    .await
                {
                    Ok(added) => Some(added.attachment_id),
                    Err(e) => {
                        error!(
                            result_id = payload.result_id,
                            file = %payload.file.display(),
                            error = %e,
                            "failed to add attachment"
                        );
                        None
                    }
                }
            }
        })
        .await;
    }

    /// Close every updated run, chunked.
    async fn close_test_runs(&self, client: &TestRailClient, run_ids: Vec<RunId>) {
        info!(?run_ids, "closing runs");

        resolve_in_chunks(run_ids, self.options.api_chunk_size, |run_id| {
            let client = client.clone();
            async move {
                match client.close_run(run_id).await {
                    Ok(()) => Some(run_id),
                    Err(e) => {
                        error!(run_id, error = %e, "failed to close run");
                        None
                    }
                }
            }
        })
        .await;
    }
}

/// Group accumulated results by run and collapse duplicate cases.
fn compile_final_results(results: &[CaseResult], runs: &[RunCreated]) -> Vec<FinalResult> {
    group_test_results(results, runs)
        .into_iter()
        .map(filter_duplicating_cases)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use railhook_client::CaseStatus;

    fn case_result(case_id: u64, status: CaseStatus) -> CaseResult {
        CaseResult {
            case_id,
            status_id: status,
            comment: String::new(),
            elapsed: None,
        }
    }

    #[test]
    fn compile_groups_and_dedupes() {
        let results = vec![
            case_result(333, CaseStatus::Passed),
            case_result(333, CaseStatus::Failed),
        ];
        let runs = vec![RunCreated {
            run_id: 42,
            project_id: 111,
            suite_id: 222,
            case_ids: vec![333],
            url: None,
        }];

        let compiled = compile_final_results(&results, &runs);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].case_results.len(), 1);
        assert_eq!(compiled[0].case_results[0].status_id, CaseStatus::Passed);
    }

    #[tokio::test]
    async fn invalid_options_make_the_reporter_inert() {
        let mut reporter = Reporter::new(ReporterOptions::new("", "", ""));
        reporter.on_begin(&[ReportedTest {
            title: "t".into(),
            tags: vec!["110-374-1".into()],
        }]);
        // Must not attempt any network activity; nothing to assert beyond
        // completing without a client.
        reporter.on_end(RunStatus::Passed).await;
        assert!(reporter.run_metadata().is_empty());
    }
}
