use log::debug;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::dataset::BuildId;
use crate::error::{Result, UsageError};
use crate::providers::{BuildSource, BuildSummary, TimelineRecord};

use super::links::build_results_url;
use super::types::{ListResponse, TimelineResponse};

const API_VERSION: &str = "7.1";

/// Client for the Azure DevOps Build REST API, scoped to one project.
pub struct AzureDevOpsClient {
    client: Client,
    base_url: String,
    organization: String,
    project: String,
    builds_url: Url,
    token: Token,
}

impl AzureDevOpsClient {
    /// Creates a client for `organization/project` on the given server.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::Config`] if the HTTP client cannot be built or
    /// the base URL is not a valid absolute URL.
    pub fn new(base_url: &str, organization: &str, project: &str, token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("aks-usage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UsageError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut builds_url = Url::parse(base_url)
            .map_err(|e| UsageError::Config(format!("Invalid base URL: {e}")))?;

        builds_url
            .path_segments_mut()
            .map_err(|()| UsageError::Config(format!("Base URL cannot hold a path: {base_url}")))?
            .pop_if_empty()
            .extend([organization, project, "_apis", "build", "builds"]);

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            organization: organization.to_string(),
            project: project.to_string(),
            builds_url,
            token,
        })
    }

    /// URL below `.../_apis/build/builds` with the API version pinned.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.builds_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {url}");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .basic_auth("", Some(self.token.as_str()))
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(UsageError::NotFound(url.path().to_string()));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(UsageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

impl BuildSource for AzureDevOpsClient {
    async fn list_recent_builds(
        &self,
        pipeline_id: u64,
        limit: usize,
    ) -> Result<Vec<BuildSummary>> {
        let mut url = self.endpoint(&[]);
        url.query_pairs_mut()
            .append_pair("definitions", &pipeline_id.to_string())
            .append_pair("$top", &limit.to_string());

        let response: ListResponse<BuildSummary> = self.get_json(url).await?;

        let mut builds = response.value;
        builds.truncate(limit);
        debug!("Pipeline {pipeline_id}: listed {} builds", builds.len());

        Ok(builds)
    }

    async fn fetch_timeline(&self, build_id: BuildId) -> Result<Vec<TimelineRecord>> {
        let url = self.endpoint(&[&build_id.to_string(), "timeline"]);
        let response: TimelineResponse = self.get_json(url).await?;
        Ok(response.records.unwrap_or_default())
    }

    async fn fetch_log_lines(&self, build_id: BuildId, log_id: u64) -> Result<Vec<String>> {
        let url = self.endpoint(&[&build_id.to_string(), "logs", &log_id.to_string()]);
        let response: ListResponse<String> = self.get_json(url).await?;
        Ok(response.value)
    }

    fn build_url(&self, build_id: BuildId) -> String {
        build_results_url(&self.base_url, &self.organization, &self.project, build_id)
    }
}
