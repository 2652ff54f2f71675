// Confluence tools

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, parse_arguments, Tool};
use anyhow::Result;
use jira_mcp_core::confluence::{self, DocQuery};
use jira_mcp_core::{AtlassianClient, FetchResult, ServerErrorShape, Settings};
use serde::Deserialize;
use std::sync::Arc;

/// Fetch a Confluence page by id, or search pages by text
pub struct DocLookupTool {
    client: AtlassianClient,
    settings: Arc<Settings>,
}

impl DocLookupTool {
    pub fn new(client: AtlassianClient, settings: Arc<Settings>) -> Self {
        Self { client, settings }
    }

    /// Look up documentation and always produce text.
    pub async fn lookup(&self, query: Option<&str>, page_id: Option<&str>) -> String {
        match self.try_lookup(query, page_id).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "fetch_confluence_docs failed");
                format!(
                    "Failed to fetch Confluence docs: {}",
                    e.describe(ServerErrorShape::Message)
                )
            }
        }
    }

    async fn try_lookup(&self, query: Option<&str>, page_id: Option<&str>) -> FetchResult<String> {
        let query = DocQuery::new(query, page_id)?;
        let credentials = self.settings.confluence_credentials()?;
        confluence::fetch_docs(&self.client, &credentials, &query).await
    }
}

#[derive(Debug, Deserialize)]
struct FetchConfluenceDocsArgs {
    #[serde(default)]
    query: Option<String>,
    #[serde(default, rename = "pageId")]
    page_id: Option<String>,
}

#[async_trait::async_trait]
impl Tool for DocLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fetch_confluence_docs".to_string(),
            description: "Fetches a Confluence page by ID, or searches pages by text. pageId takes precedence over query.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "query": json_schema_string("Free text to search for in Confluence pages"),
                    "pageId": json_schema_string("ID of a single Confluence page to fetch")
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: FetchConfluenceDocsArgs = parse_arguments(arguments, "fetch_confluence_docs")?;
        let text = self
            .lookup(args.query.as_deref(), args.page_id.as_deref())
            .await;
        Ok(CallToolResult::text(text))
    }
}
