// Core functionality for the Jira MCP server: configuration, credentials,
// and the Jira/Confluence REST adapters

pub mod client;
pub mod config;
pub mod confluence;
pub mod error;
pub mod jira;

pub use client::AtlassianClient;
pub use config::{ConfigError, Credentials, Settings, SiteSettings};
pub use error::{FetchError, FetchResult, ServerErrorBody, ServerErrorShape};
