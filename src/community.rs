//! Community intake: schema URLs mined from issue-tracker issues.
//!
//! Every issue title and body is scanned for URLs; those that look like a
//! schema (mention `openapi`, `swagger`, `api.json`, or end in a JSON/YAML
//! extension) become low-confidence candidates written to
//! `sources/community-candidates.json`. Nothing is fetched or validated
//! here; the next `atlas refresh` does that.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::Config;
use crate::error::{HarvestError, HarvestResult};
use crate::export::{display_relative, write_json};
use crate::logging::log_details;
use crate::models::Provenance;

pub const CANDIDATES_FILE: &str = "community-candidates.json";

const MAX_IDENTITY_LEN: usize = 64;

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s)\]>]+").expect("valid url pattern"))
}

fn schema_like_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)openapi|swagger|api\.json|\.ya?ml|\.json").expect("valid schema pattern")
    })
}

fn non_identity_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9._-]+").expect("valid identity pattern"))
}

/// The subset of an issue the intake reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One mined URL, as written to the candidates file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityCandidate {
    pub id: String,
    pub schema_url: String,
    pub source: Provenance,
    pub issue_number: u64,
    pub issue_url: String,
    pub state: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityOutput {
    pub updated_at: DateTime<Utc>,
    pub count: usize,
    pub items: Vec<CommunityCandidate>,
}

/// Schema-like URLs in `text`, deduplicated, in order of first appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    url_pattern()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|url| schema_like_pattern().is_match(url))
        .filter(|url| seen.insert(url.to_string()))
        .map(str::to_string)
        .collect()
}

/// Identity for candidates from one issue: a lowercase slug of the title,
/// at most 64 characters, or `issue-<number>` when nothing is left.
pub fn issue_identity(issue: &Issue) -> String {
    let lower = issue.title.trim().to_lowercase();
    let slug: String = non_identity_run()
        .replace_all(&lower, "_")
        .chars()
        .take(MAX_IDENTITY_LEN)
        .collect();
    if slug.is_empty() {
        format!("issue-{}", issue.number)
    } else {
        slug
    }
}

/// Turn issues into candidates. Pure; no fetching.
pub fn mine(issues: &[Issue]) -> Vec<CommunityCandidate> {
    let mut out = Vec::new();
    for issue in issues {
        let text = format!("{}\n{}", issue.title, issue.body.as_deref().unwrap_or_default());
        let urls = extract_urls(&text);
        if urls.is_empty() {
            continue;
        }
        let id = issue_identity(issue);
        for url in urls {
            out.push(CommunityCandidate {
                id: id.clone(),
                schema_url: url,
                source: Provenance::CommunityIssue,
                issue_number: issue.number,
                issue_url: issue.html_url.clone(),
                state: issue.state.clone(),
                updated_at: issue.updated_at,
            });
        }
    }
    out
}

/// Minimal client for the issues endpoint of a GitHub-compatible API.
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &Config) -> HarvestResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .user_agent(config.fetch.user_agent.clone())
            .build()
            .map_err(|e| HarvestError::Internal(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: config.community.api_base.trim_end_matches('/').to_string(),
            token: config.community_token(),
        })
    }

    /// Fetch up to 100 issues (open and closed) of `repo`.
    pub async fn list_issues(&self, repo: &str) -> HarvestResult<Vec<Issue>> {
        let url = format!("{}/repos/{}/issues", self.api_base, repo);
        log_details(
            "community.list_issues",
            &json!({
                "url": url,
                "state": "all",
                "per_page": 100,
                "authorization": self.token.as_ref().map(|t| format!("Bearer {}", t)),
            }),
        );

        let mut request = self
            .client
            .get(&url)
            .query(&[("state", "all"), ("per_page", "100")])
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HarvestError::Network(format!("GET {}: {}", url, e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HarvestError::Upstream(format!(
                "issue tracker returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        response
            .json::<Vec<Issue>>()
            .await
            .map_err(|e| HarvestError::Upstream(format!("unexpected issues payload: {}", e)))
    }
}

/// `atlas intake`: mine the configured repository's issues.
pub async fn run_intake(config: &Config) -> Result<Vec<CommunityCandidate>> {
    if config.community_token().is_none() {
        tracing::warn!(
            env = %config.community.token_env,
            "no issue-tracker token set; requests are unauthenticated"
        );
    }
    let client = GithubClient::new(config)?;
    let issues = client
        .list_issues(&config.community.repo)
        .await
        .with_context(|| format!("listing issues of {}", config.community.repo))?;

    let items = mine(&issues);
    let path = config.sources_dir().join(CANDIDATES_FILE);
    write_json(
        &path,
        &CommunityOutput {
            updated_at: Utc::now(),
            count: items.len(),
            items: items.clone(),
        },
    )?;
    println!(
        "mined {} candidates from {} issues -> {}",
        items.len(),
        issues.len(),
        display_relative(&path, config.root())
    );
    Ok(items)
}
