// file: src/github/client.rs
// description: authenticated GitHub REST client for per-call repository access
// reference: https://docs.github.com/en/rest

use crate::config::GithubConfig;
use crate::error::{Result, ServerError};
use crate::github::models::{
    ContentResolution, ContentsResponse, DirectoryEntry, FileContentRecord, MergedPrSummary,
    PullRequest, first_merged, resolve_file_content,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT_VALUE: &str = concat!("vaulthub/", env!("CARGO_PKG_VERSION"));

/// Stateless per-invocation client: carries only the (owner, repo, token)
/// tuple plus the configured endpoint and timeouts. No retries, no cache.
pub struct GitHubClient {
    owner: String,
    repo: String,
    api_base: String,
    client: Client,
    download_timeout: Duration,
}

impl GitHubClient {
    pub fn new(owner: &str, repo: &str, token: &str, config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| ServerError::Config(format!("Invalid GitHub token: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        debug!("GitHub client initialized for repository: {}/{}", owner, repo);

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        })
    }

    async fn get(&self, endpoint: &str) -> Result<Response> {
        let url = format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, endpoint
        );
        debug!("GitHub API request: GET {}", url);

        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServerError::NotFound(format!(
                "{} in {}/{}",
                endpoint, self.owner, self.repo
            )));
        }

        Ok(response.error_for_status()?)
    }

    /// Scan the 10 most-recently-updated closed pull requests (single page)
    /// and return the first merged one. `None` means nothing in that window
    /// was merged; the client does not look further back.
    pub async fn last_merged_pull_request(&self) -> Result<Option<MergedPrSummary>> {
        let response = self
            .get("pulls?state=closed&sort=updated&direction=desc&per_page=10")
            .await?;
        let pulls: Vec<PullRequest> = response.json().await?;

        let summary = first_merged(pulls);
        if summary.is_none() {
            info!(
                "No merged PRs found in the last 10 closed PRs for {}/{}",
                self.owner, self.repo
            );
        }
        Ok(summary)
    }

    /// List the contents endpoint at `path` (empty string = repository
    /// root), preserving API order. A path that addresses a single file
    /// comes back as a one-element list.
    pub async fn directory_contents(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let response = self.get(&format!("contents/{}", path)).await?;
        let contents: ContentsResponse = response.json().await?;

        Ok(contents
            .into_items()
            .into_iter()
            .map(DirectoryEntry::from_item)
            .collect())
    }

    /// Fetch file metadata at `path` and resolve its content: inline base64
    /// when present, otherwise a second unauthenticated fetch of the
    /// raw-content URL. Decode and download failures degrade to marker
    /// strings inside a success record.
    pub async fn file_contents(&self, path: &str) -> Result<FileContentRecord> {
        let response = self.get(&format!("contents/{}", path)).await?;
        let item = response.json().await?;

        match resolve_file_content(item) {
            ContentResolution::Resolved(record) => Ok(record),
            ContentResolution::NeedsDownload { item, url } => {
                let outcome = self.download_raw(&url).await;
                Ok(FileContentRecord::from_download(&item, outcome))
            }
        }
    }

    /// Raw-content downloads are unauthenticated and use the longer
    /// timeout. Returns the body and its declared charset, or `None` on
    /// any failure.
    async fn download_raw(&self, url: &str) -> Option<(String, String)> {
        debug!("Downloading raw content: {}", url);

        let client = Client::builder().timeout(self.download_timeout).build().ok()?;
        let response = match client
            .get(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Raw content download failed for {}: {}", url, e);
                return None;
            }
        };

        let charset = charset_of(response.headers()).unwrap_or_else(|| "utf-8".to_string());

        match response.text().await {
            Ok(text) => Some((text, charset)),
            Err(e) => {
                warn!("Raw content body read failed for {}: {}", url, e);
                None
            }
        }
    }
}

fn charset_of(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .map(|cs| cs.trim_matches('"').to_ascii_lowercase())
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_client() -> GitHubClient {
        let config = Config::default_config();
        GitHubClient::new("octocat", "spoon-knife", "ghp_test", &config.github).unwrap()
    }

    #[test]
    fn test_client_construction() {
        let client = test_client();
        assert_eq!(client.owner, "octocat");
        assert_eq!(client.api_base, "https://api.github.com");
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let mut config = Config::default_config();
        config.github.api_base = "https://github.example.com/api/v3/".to_string();
        let client = GitHubClient::new("o", "r", "t", &config.github).unwrap();
        assert_eq!(client.api_base, "https://github.example.com/api/v3");
    }

    #[test]
    fn test_charset_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=ISO-8859-1"),
        );
        assert_eq!(charset_of(&headers).as_deref(), Some("iso-8859-1"));
    }

    #[test]
    fn test_charset_defaults_when_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(charset_of(&headers), None);
        assert!(charset_of(&HeaderMap::new()).is_none());
    }
}
