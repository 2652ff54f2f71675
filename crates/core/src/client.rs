// Authenticated fetch-and-format helper shared by the Jira and Confluence adapters

use crate::config::Credentials;
use crate::error::{FetchError, FetchResult, ServerErrorBody};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Thin wrapper around a pooled HTTP client.
///
/// Holds no credentials: every request is authenticated with the
/// [`Credentials`] passed in by the caller.
#[derive(Debug, Clone)]
pub struct AtlassianClient {
    http: Client,
}

impl AtlassianClient {
    pub fn new() -> FetchResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("jira-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }

    /// Perform one authenticated GET and decode the JSON body.
    ///
    /// Non-2xx responses become [`FetchError::Api`] carrying whatever error
    /// payload the server sent back.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> FetchResult<T> {
        debug!(url = %url, host = %credentials.host(), "GET request");

        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, credentials.basic_auth_header())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            debug!(status = status.as_u16(), "Request failed");
            return Err(FetchError::Api {
                status: status.as_u16(),
                body: ServerErrorBody::parse(&text),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Authenticated fetch-and-format pipeline.
    ///
    /// Builds the URL from the credentials' base URL, performs a single GET,
    /// decodes the response as `T` and hands it to `format`.
    pub async fn fetch_text<T, U, F>(
        &self,
        credentials: &Credentials,
        build_url: U,
        format: F,
    ) -> FetchResult<String>
    where
        T: DeserializeOwned,
        U: FnOnce(&str) -> String,
        F: FnOnce(T) -> FetchResult<String>,
    {
        let url = build_url(&credentials.base_url());
        let response = self.get_json::<T>(&url, credentials).await?;
        format(response)
    }
}
