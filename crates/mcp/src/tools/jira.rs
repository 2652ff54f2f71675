// Jira tools

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, parse_arguments, Tool};
use anyhow::Result;
use jira_mcp_core::{jira, AtlassianClient, FetchResult, ServerErrorShape, Settings};
use serde::Deserialize;
use std::sync::Arc;

/// Search Jira issues with an optional JQL filter
pub struct IssueSearchTool {
    client: AtlassianClient,
    settings: Arc<Settings>,
}

impl IssueSearchTool {
    pub fn new(client: AtlassianClient, settings: Arc<Settings>) -> Self {
        Self { client, settings }
    }

    /// Run a search and always produce text: the issue list or a failure description.
    pub async fn search(&self, jql: Option<&str>) -> String {
        match self.try_search(jql).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "get_jira_issues failed");
                format!(
                    "Failed to fetch Jira issues: {}",
                    e.describe(ServerErrorShape::ErrorMessages)
                )
            }
        }
    }

    async fn try_search(&self, jql: Option<&str>) -> FetchResult<String> {
        let credentials = self.settings.jira_credentials()?;
        jira::search_issues(&self.client, &credentials, jql).await
    }
}

#[derive(Debug, Deserialize)]
struct GetJiraIssuesArgs {
    #[serde(default)]
    jql: Option<String>,
}

#[async_trait::async_trait]
impl Tool for IssueSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_jira_issues".to_string(),
            description: "Fetches Jira issues using an optional JQL query.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "jql": json_schema_string("JQL filter, e.g. project = OPS AND status = Open")
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: GetJiraIssuesArgs = parse_arguments(arguments, "get_jira_issues")?;
        Ok(CallToolResult::text(self.search(args.jql.as_deref()).await))
    }
}
