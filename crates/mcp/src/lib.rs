// MCP (Model Context Protocol) server exposing Jira and Confluence as tools

pub mod codec;
pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
