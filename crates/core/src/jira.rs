// Jira issue search: URL construction and response shaping

use crate::client::AtlassianClient;
use crate::config::Credentials;
use crate::error::FetchResult;
use serde::{Deserialize, Serialize};

pub const SEARCH_PATH: &str = "/rest/api/3/search";

/// Response of `GET /rest/api/3/search`. Only `issues` is required.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
pub struct RawIssue {
    #[serde(default)]
    pub key: serde_json::Value,
    #[serde(default)]
    pub fields: Option<RawFields>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFields {
    #[serde(default)]
    pub summary: serde_json::Value,
    #[serde(default)]
    pub description: serde_json::Value,
}

/// Compact issue shape returned to callers.
///
/// Every field mirrors the source value as is, whatever its JSON type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRecord {
    pub key: serde_json::Value,
    pub summary: serde_json::Value,
    /// Atlassian Document Format tree, passed through untouched.
    pub description: serde_json::Value,
}

impl From<RawIssue> for IssueRecord {
    fn from(issue: RawIssue) -> Self {
        let fields = issue.fields.unwrap_or_default();
        Self {
            key: issue.key,
            summary: fields.summary,
            description: fields.description,
        }
    }
}

/// Build the search URL. The `jql` parameter is only added for a non-empty query.
pub fn search_url(base_url: &str, jql: Option<&str>) -> String {
    match jql.filter(|q| !q.is_empty()) {
        Some(jql) => format!("{}{}?jql={}", base_url, SEARCH_PATH, urlencoding::encode(jql)),
        None => format!("{}{}", base_url, SEARCH_PATH),
    }
}

/// Map every issue, preserving order.
pub fn to_records(response: SearchResponse) -> Vec<IssueRecord> {
    response.issues.into_iter().map(IssueRecord::from).collect()
}

/// Search issues and render them as pretty-printed JSON.
pub async fn search_issues(
    client: &AtlassianClient,
    credentials: &Credentials,
    jql: Option<&str>,
) -> FetchResult<String> {
    client
        .fetch_text(
            credentials,
            |base| search_url(base, jql),
            |response: SearchResponse| Ok(serde_json::to_string_pretty(&to_records(response))?),
        )
        .await
}
