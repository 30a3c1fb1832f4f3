//! Reporter options and eager validation.

use serde::{Deserialize, Serialize};

use railhook_client::{ClientConfig, ProjectId, RunId, SuiteId};

/// Everything the reporter recognizes. Invalid options render the whole
/// pipeline inert: nothing is created or submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterOptions {
    /// TestRail instance URL, e.g. `https://acme.testrail.io`.
    pub domain: String,

    /// Account username.
    pub username: String,

    /// Account password or API key.
    pub password: String,

    /// Ask TestRail to include every case of the suite in created runs, not
    /// just the tagged ones.
    #[serde(default)]
    pub include_all_cases: bool,

    /// Upload captured attachment files after submitting results.
    #[serde(default)]
    pub include_attachments: bool,

    /// Close runs after their results have been submitted.
    #[serde(default)]
    pub close_runs: bool,

    /// Peak concurrent API calls per batch operation.
    #[serde(default = "default_chunk_size")]
    pub api_chunk_size: usize,

    /// Name template for created runs; supports `#{date}`, `#{timestamp}`
    /// and `#{suite}`.
    #[serde(default = "default_run_name_template")]
    pub run_name_template: String,

    /// Default project for the `S<suite>-<case>` tag shape.
    #[serde(default)]
    pub default_project_id: Option<ProjectId>,

    /// Default suite for the `C<case>` tag shape.
    #[serde(default)]
    pub default_suite_id: Option<SuiteId>,

    /// Submit into this existing run instead of creating runs per combo.
    #[serde(default)]
    pub use_existing_run: Option<RunId>,
}

fn default_chunk_size() -> usize {
    10
}

fn default_run_name_template() -> String {
    format!("Test run {}", crate::run_name::TEMPLATE_DATE)
}

/// Configuration errors, detected before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One report naming every offending field.
    #[error("invalid reporter options: {}", fields.join(", "))]
    Invalid { fields: Vec<String> },
}

impl ReporterOptions {
    /// Options with required credentials and everything else default.
    pub fn new(
        domain: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            username: username.into(),
            password: password.into(),
            include_all_cases: false,
            include_attachments: false,
            close_runs: false,
            api_chunk_size: default_chunk_size(),
            run_name_template: default_run_name_template(),
            default_project_id: None,
            default_suite_id: None,
            use_existing_run: None,
        }
    }

    /// Check every field and report all offending ones at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut fields = Vec::new();

        if self.domain.trim().is_empty() {
            fields.push("domain (required)".to_string());
        }
        if self.username.trim().is_empty() {
            fields.push("username (required)".to_string());
        }
        if self.password.trim().is_empty() {
            fields.push("password (required)".to_string());
        }
        if self.api_chunk_size < 1 {
            fields.push("apiChunkSize (must be at least 1)".to_string());
        }
        if self.default_project_id == Some(0) {
            fields.push("defaultProjectId (must be a positive integer)".to_string());
        }
        if self.default_suite_id == Some(0) {
            fields.push("defaultSuiteId (must be a positive integer)".to_string());
        }
        if self.use_existing_run == Some(0) {
            fields.push("useExistingRun (must be a positive integer)".to_string());
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { fields })
        }
    }

    /// Connection settings for the API client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.domain, &self.username, &self.password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_options_are_valid() {
        let options = ReporterOptions::new("https://acme.testrail.io", "user", "key");
        assert!(options.validate().is_ok());
        assert_eq!(options.api_chunk_size, 10);
        assert!(!options.close_runs);
    }

    #[test]
    fn every_offending_field_is_reported_at_once() {
        let mut options = ReporterOptions::new("", "", "key");
        options.api_chunk_size = 0;
        options.use_existing_run = Some(0);

        let err = options.validate().unwrap_err();
        let ConfigError::Invalid { fields } = err;
        assert_eq!(fields.len(), 4);
        let message = fields.join(", ");
        assert!(message.contains("domain"));
        assert!(message.contains("username"));
        assert!(message.contains("apiChunkSize"));
        assert!(message.contains("useExistingRun"));
    }

    #[test]
    fn zero_default_ids_are_rejected() {
        let mut options = ReporterOptions::new("https://acme.testrail.io", "user", "key");
        options.default_project_id = Some(0);
        options.default_suite_id = Some(0);
        assert!(options.validate().is_err());

        options.default_project_id = Some(110);
        options.default_suite_id = Some(374);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn options_deserialize_from_camel_case_with_defaults() {
        let options: ReporterOptions = serde_json::from_value(serde_json::json!({
            "domain": "https://acme.testrail.io",
            "username": "user",
            "password": "key",
            "closeRuns": true,
            "apiChunkSize": 5,
            "defaultProjectId": 110
        }))
        .unwrap();

        assert!(options.close_runs);
        assert_eq!(options.api_chunk_size, 5);
        assert_eq!(options.default_project_id, Some(110));
        assert_eq!(options.use_existing_run, None);
        assert!(options.run_name_template.contains("#{date}"));
    }
}
