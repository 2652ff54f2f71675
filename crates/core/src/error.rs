// Error types for Atlassian REST calls

use serde_json::Value;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Everything that can go wrong between a tool invocation and its text result.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A required configuration value is unset.
    #[error("{0} env var is required")]
    MissingConfig(&'static str),

    /// A documentation lookup was invoked without a page id or a query.
    #[error("Either query or pageId must be provided")]
    MissingDocQuery,

    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Request failed with status code {status}")]
    Api { status: u16, body: ServerErrorBody },

    /// The response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error payload returned by Atlassian APIs.
///
/// Jira reports `errorMessages`, Confluence reports a single `message`.
/// Each field is read on its own, so a malformed one never hides the other.
/// A body that is not JSON parses to the default.
#[derive(Debug, Clone, Default)]
pub struct ServerErrorBody {
    pub error_messages: Vec<String>,
    pub message: Option<String>,
}

impl ServerErrorBody {
    pub fn parse(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Self::default();
        };

        let error_messages = value
            .get("errorMessages")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(message_text).collect())
            .unwrap_or_default();
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            error_messages,
            message,
        }
    }
}

fn message_text(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Which server-provided error field a caller prefers when describing a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorShape {
    /// Jira: the `errorMessages` list, joined with `", "`.
    ErrorMessages,
    /// Confluence: the `message` field.
    Message,
}

impl FetchError {
    /// Best-effort human readable message.
    ///
    /// Prefers the server-provided error text for the given shape and falls
    /// back to this error's own display text.
    pub fn describe(&self, shape: ServerErrorShape) -> String {
        match (self, shape) {
            (Self::Api { body, .. }, ServerErrorShape::ErrorMessages)
                if !body.error_messages.is_empty() =>
            {
                body.error_messages.join(", ")
            }
            (Self::Api { body, .. }, ServerErrorShape::Message) => match body.message.as_deref() {
                Some(message) if !message.is_empty() => message.to_string(),
                _ => self.to_string(),
            },
            _ => self.to_string(),
        }
    }
}
