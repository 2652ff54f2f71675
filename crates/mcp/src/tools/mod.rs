pub mod confluence;
pub mod jira;
mod registry;

pub use confluence::DocLookupTool;
pub use jira::IssueSearchTool;
pub use registry::{json_schema_object, json_schema_string, Tool, ToolRegistry};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Decode tool arguments, treating a missing argument object as empty.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    arguments: serde_json::Value,
    tool_name: &str,
) -> Result<T> {
    let arguments = if arguments.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        arguments
    };

    serde_json::from_value(arguments)
        .with_context(|| format!("Invalid arguments for {}", tool_name))
}
