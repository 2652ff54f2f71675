// Site configuration and per-request credentials

use crate::error::{FetchError, FetchResult};
use base64::Engine;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const JIRA_HOST: &str = "JIRA_HOST";
pub const JIRA_EMAIL: &str = "JIRA_EMAIL";
pub const JIRA_API_TOKEN: &str = "JIRA_API_TOKEN";
pub const CONFLUENCE_HOST: &str = "CONFLUENCE_HOST";
pub const CONFLUENCE_EMAIL: &str = "CONFLUENCE_EMAIL";
pub const CONFLUENCE_API_TOKEN: &str = "CONFLUENCE_API_TOKEN";

/// Errors raised while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Process-wide configuration, read once at startup and never mutated.
///
/// Values come from an optional TOML file and the environment; environment
/// values win. Nothing is validated here: missing values surface per
/// invocation when credentials are resolved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub jira: SiteSettings,

    #[serde(default)]
    pub confluence: SiteSettings,
}

/// Host and credential pair for one Atlassian product.
#[derive(Clone, Default, Deserialize)]
pub struct SiteSettings {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub api_token: Option<String>,
}

impl fmt::Debug for SiteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteSettings")
            .field("host", &self.host)
            .field("email", &self.email)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Settings {
    /// Load settings from a TOML file (if it exists) and overlay the process environment.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let mut settings: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            toml::from_str(&content)?
        } else {
            tracing::info!(
                "Configuration file {} not found, using environment only",
                config_path.display()
            );
            Self::default()
        };

        settings.overlay(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        settings.overlay(lookup);
        settings
    }

    fn overlay<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            (&mut self.jira.host, JIRA_HOST),
            (&mut self.jira.email, JIRA_EMAIL),
            (&mut self.jira.api_token, JIRA_API_TOKEN),
            (&mut self.confluence.host, CONFLUENCE_HOST),
            (&mut self.confluence.email, CONFLUENCE_EMAIL),
            (&mut self.confluence.api_token, CONFLUENCE_API_TOKEN),
        ];

        for (field, key) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = Some(value);
            }
        }
    }

    /// Resolve Jira credentials. Host, email and token are all required.
    pub fn jira_credentials(&self) -> FetchResult<Credentials> {
        Ok(Credentials {
            host: required(&[&self.jira.host], JIRA_HOST)?,
            email: required(&[&self.jira.email], JIRA_EMAIL)?,
            api_token: required(&[&self.jira.api_token], JIRA_API_TOKEN)?,
        })
    }

    /// Resolve Confluence credentials, falling back field by field to the Jira values.
    pub fn confluence_credentials(&self) -> FetchResult<Credentials> {
        Ok(Credentials {
            host: required(&[&self.confluence.host, &self.jira.host], CONFLUENCE_HOST)?,
            email: required(&[&self.confluence.email, &self.jira.email], CONFLUENCE_EMAIL)?,
            api_token: required(
                &[&self.confluence.api_token, &self.jira.api_token],
                CONFLUENCE_API_TOKEN,
            )?,
        })
    }
}

fn required(candidates: &[&Option<String>], name: &'static str) -> FetchResult<String> {
    candidates
        .iter()
        .filter_map(|value| value.as_deref())
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(FetchError::MissingConfig(name))
}

/// Credentials for a single request. Built fresh for every invocation.
#[derive(Clone)]
pub struct Credentials {
    host: String,
    email: String,
    api_token: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            email: email.into(),
            api_token: api_token.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Base URL without a trailing slash.
    ///
    /// A bare host gets `https://`; a host that already names a scheme is kept as is.
    pub fn base_url(&self) -> String {
        if self.host.starts_with("https://") || self.host.starts_with("http://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.host.trim_end_matches('/'))
        }
    }

    /// `Authorization` header value: `Basic base64(email:api_token)`.
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.email, self.api_token);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}
