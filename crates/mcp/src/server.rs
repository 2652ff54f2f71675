// MCP server: newline-delimited JSON-RPC over stdio

use crate::protocol::{
    methods, CallToolParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, ServerInfo,
};
use crate::codec::{Frame, JsonLineCodec, MAX_LINE_LENGTH};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

pub const SERVER_NAME: &str = "MCP Jira Server";

/// Dispatches JSON-RPC requests to registered tools.
///
/// Every request is handled on its own task; responses are written by a
/// single writer task so lines never interleave.
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Serve on the process stdin/stdout until stdin closes.
    pub async fn start(&self) -> Result<()> {
        tracing::info!("MCP server listening on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve on an arbitrary line-oriented transport.
    ///
    /// Lines that are not valid JSON-RPC (including invalid UTF-8 and
    /// over-long lines) get a parse error and reading continues. Returns once
    /// the reader reaches EOF and every in-flight request has been answered.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut lines = FramedRead::new(reader, JsonLineCodec::new());
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let writer_task = tokio::spawn(async move {
            let mut sink = FramedWrite::new(writer, LinesCodec::new());
            while let Some(response) = rx.recv().await {
                let line = match serde_json::to_string(&response) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Failed to serialize response: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(line).await {
                    tracing::error!("Error writing stdout: {}", e);
                    break;
                }
            }
        });

        while let Some(frame) = lines.next().await {
            let line = match frame {
                Ok(Frame::Line(line)) => line,
                Ok(Frame::Oversized) => {
                    tracing::warn!("Dropped a message longer than {} bytes", MAX_LINE_LENGTH);
                    let error = JsonRpcError::parse_error(format!(
                        "Parse error: message exceeds {} bytes",
                        MAX_LINE_LENGTH
                    ));
                    let _ = tx.send(JsonRpcResponse::error(serde_json::Value::Null, error));
                    continue;
                }
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => request,
                Err(e) => {
                    let error = JsonRpcError::parse_error(format!("Parse error: {}", e));
                    let _ = tx.send(JsonRpcResponse::error(serde_json::Value::Null, error));
                    continue;
                }
            };

            let server = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_request(request).await {
                    let _ = tx.send(response);
                }
            });
        }

        drop(tx);
        writer_task.await.context("Response writer task panicked")?;
        tracing::info!("MCP server stopped");
        Ok(())
    }

    /// Handle one request. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        let response = match request.method.as_str() {
            methods::INITIALIZE => {
                self.log_client(request.params.as_ref());
                respond(id, InitializeResult::new(self.server_info.clone()))
            }
            methods::PING => JsonRpcResponse::success(id, serde_json::json!({})),
            methods::LIST_TOOLS => respond(
                id,
                ListToolsResult {
                    tools: self.registry.list_schemas(),
                },
            ),
            methods::CALL_TOOL => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };

        Some(response)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            methods::INITIALIZED => tracing::info!("Client initialized"),
            other => tracing::debug!(method = %other, "Ignoring notification"),
        }
    }

    fn log_client(&self, params: Option<&serde_json::Value>) {
        let Some(params) = params else { return };
        match serde_json::from_value::<InitializeParams>(params.clone()) {
            Ok(params) => tracing::info!(
                client = %params.client_info.name,
                client_version = %params.client_info.version,
                protocol_version = %params.protocol_version,
                "Client connected"
            ),
            Err(e) => tracing::debug!("Unrecognized initialize params: {}", e),
        }
    }

    async fn call_tool(
        &self,
        id: serde_json::Value,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value::<CallToolParams>) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)),
                )
            }
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing tools/call params"),
                )
            }
        };

        let Some(tool) = self.registry.get(&params.name) else {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)),
            );
        };

        tracing::debug!(tool = %params.name, "Calling tool");
        match tool.execute(params.arguments).await {
            Ok(result) => respond(id, result),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::invalid_params(format!("{:#}", e))),
        }
    }
}

fn respond(id: serde_json::Value, result: impl Serialize) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{DocLookupTool, IssueSearchTool};
    use jira_mcp_core::{AtlassianClient, Settings};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn unconfigured_server() -> McpServer {
        let client = AtlassianClient::new().unwrap();
        let settings = Arc::new(Settings::from_lookup(|_| None));

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(IssueSearchTool::new(client.clone(), settings.clone())));
        registry.register(Arc::new(DocLookupTool::new(client, settings)));
        McpServer::new(registry)
    }

    fn request(value: serde_json::Value) -> JsonRpcRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = unconfigured_server();
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0"}
                }
            })))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "MCP Jira Server");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_list_tools() {
        let server = unconfigured_server();
        let response = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})))
            .await
            .unwrap();

        let result = response.result.unwrap();
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["fetch_confluence_docs", "get_jira_issues"]);
        assert_eq!(result["tools"][1]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_tool_failure_is_text_not_error() {
        let server = unconfigured_server();
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "get_jira_issues"}
            })))
            .await
            .unwrap();

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(
            result["content"][0]["text"],
            "Failed to fetch Jira issues: JIRA_HOST env var is required"
        );
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let server = unconfigured_server();
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "delete_everything", "arguments": {}}
            })))
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_invalid_tool_arguments() {
        let server = unconfigured_server();
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": {"name": "fetch_confluence_docs", "arguments": {"pageId": 12}}
            })))
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("fetch_confluence_docs"));
    }

    #[tokio::test]
    async fn test_unknown_method_and_notifications() {
        let server = unconfigured_server();

        let response = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);

        let response = server
            .handle_request(request(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_serve_over_duplex() {
        let server = unconfigured_server();
        let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, mut client_out) = tokio::io::duplex(64 * 1024);

        let handle = tokio::spawn(async move { server.serve(server_in, server_out).await });

        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            "{not json".to_string(),
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "fetch_confluence_docs", "arguments": {}}
            })
            .to_string(),
        ]
        .join("\n");
        client_in.write_all(input.as_bytes()).await.unwrap();
        client_in.write_all(b"\n").await.unwrap();
        drop(client_in);

        handle.await.unwrap().unwrap();

        let mut output = String::new();
        client_out.read_to_string(&mut output).await.unwrap();
        let responses: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        // ping, parse error, tools/call; the notification gets nothing
        assert_eq!(responses.len(), 3);

        let by_id = |id: serde_json::Value| {
            responses
                .iter()
                .find(|r| r["id"] == id)
                .cloned()
                .unwrap()
        };
        assert_eq!(by_id(json!(1))["result"], json!({}));
        assert_eq!(by_id(serde_json::Value::Null)["error"]["code"], -32700);
        assert_eq!(
            by_id(json!(2))["result"]["content"][0]["text"],
            "Failed to fetch Confluence docs: Either query or pageId must be provided"
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_server() {
        let server = unconfigured_server();
        let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, mut client_out) = tokio::io::duplex(64 * 1024);

        let handle = tokio::spawn(async move { server.serve(server_in, server_out).await });

        client_in.write_all(b"\xff\xfe garbage\n").await.unwrap();
        client_in
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        drop(client_in);

        handle.await.unwrap().unwrap();

        let mut output = String::new();
        client_out.read_to_string(&mut output).await.unwrap();
        let responses: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(responses.len(), 2);
        assert!(responses
            .iter()
            .any(|r| r["id"].is_null() && r["error"]["code"] == -32700));
        assert!(responses
            .iter()
            .any(|r| r["id"] == 1 && r["result"] == json!({})));
    }

    #[tokio::test]
    async fn test_null_id_gets_a_response() {
        let server = unconfigured_server();
        let response = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": null, "method": "ping"})))
            .await
            .unwrap();

        assert!(response.id.is_null());
        assert_eq!(response.result.unwrap(), json!({}));
    }
}
