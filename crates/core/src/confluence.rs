// Confluence page lookup and content search

use crate::client::AtlassianClient;
use crate::config::Credentials;
use crate::error::{FetchError, FetchResult};
use serde::{Deserialize, Serialize};

pub const CONTENT_PATH: &str = "/wiki/rest/api/content";
pub const NO_CONTENT: &str = "No content";

/// How a documentation lookup finds its pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocQuery {
    /// Exact lookup by page id.
    ById(String),
    /// Free-text search over pages.
    Search(String),
}

impl DocQuery {
    /// Pick the lookup mode. A page id wins over a query; empty strings count as absent.
    pub fn new(query: Option<&str>, page_id: Option<&str>) -> FetchResult<Self> {
        let page_id = page_id.filter(|id| !id.is_empty());
        let query = query.filter(|q| !q.is_empty());

        match (page_id, query) {
            (Some(id), _) => Ok(Self::ById(id.to_string())),
            (None, Some(q)) => Ok(Self::Search(q.to_string())),
            (None, None) => Err(FetchError::MissingDocQuery),
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        match self {
            Self::ById(id) => format!(
                "{}{}/{}?expand=body.storage,title",
                base_url,
                CONTENT_PATH,
                urlencoding::encode(id)
            ),
            Self::Search(query) => {
                let cql = format!("type=page AND text~\"{}\"", query);
                format!(
                    "{}{}/search?cql={}&expand=title,body.storage",
                    base_url,
                    CONTENT_PATH,
                    urlencoding::encode(&cql)
                )
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub storage: Option<Storage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Storage {
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Single page as returned by `GET /wiki/rest/api/content/{id}`.
#[derive(Debug, Deserialize)]
pub struct DocPage {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub title: serde_json::Value,
    #[serde(default)]
    pub body: Option<Body>,
}

impl DocPage {
    /// Storage-format HTML, or `None` when absent or empty.
    pub fn body_html(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|body| body.storage.as_ref())
            .and_then(|storage| storage.value.as_str())
            .filter(|html| !html.is_empty())
    }

    pub fn to_text(&self) -> String {
        format!(
            "Title: {}\nContent (HTML):\n{}",
            display_value(&self.title),
            self.body_html().unwrap_or(NO_CONTENT)
        )
    }
}

/// Render a mirrored field as plain text; `null` is empty.
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Response of the content search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<DocPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocSearchResult {
    pub id: serde_json::Value,
    pub title: serde_json::Value,
    pub content: String,
}

impl From<DocPage> for DocSearchResult {
    fn from(page: DocPage) -> Self {
        let content = page.body_html().unwrap_or(NO_CONTENT).to_string();
        Self {
            id: page.id,
            title: page.title,
            content,
        }
    }
}

pub fn to_results(response: SearchResponse) -> Vec<DocSearchResult> {
    response.results.into_iter().map(DocSearchResult::from).collect()
}

/// Run a lookup and format it as text.
pub async fn fetch_docs(
    client: &AtlassianClient,
    credentials: &Credentials,
    query: &DocQuery,
) -> FetchResult<String> {
    let build_url = |base: &str| query.url(base);

    match query {
        DocQuery::ById(_) => {
            client
                .fetch_text(credentials, build_url, |page: DocPage| Ok(page.to_text()))
                .await
        }
        DocQuery::Search(_) => {
            client
                .fetch_text(credentials, build_url, |response: SearchResponse| {
                    Ok(serde_json::to_string_pretty(&to_results(response))?)
                })
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "https://acme.atlassian.net";

    #[test]
    fn test_page_id_takes_precedence() {
        let query = DocQuery::new(Some("runbook"), Some("12345")).unwrap();
        assert_eq!(query, DocQuery::ById("12345".to_string()));
    }

    #[test]
    fn test_query_only() {
        let query = DocQuery::new(Some("runbook"), None).unwrap();
        assert_eq!(query, DocQuery::Search("runbook".to_string()));

        let query = DocQuery::new(Some("runbook"), Some("")).unwrap();
        assert_eq!(query, DocQuery::Search("runbook".to_string()));
    }

    #[test]
    fn test_neither_provided() {
        let err = DocQuery::new(None, None).unwrap_err();
        assert_eq!(err.to_string(), "Either query or pageId must be provided");

        assert!(DocQuery::new(Some(""), Some("")).is_err());
    }

    #[test]
    fn test_by_id_url() {
        let url = DocQuery::ById("12345".to_string()).url(BASE);
        assert_eq!(
            url,
            "https://acme.atlassian.net/wiki/rest/api/content/12345?expand=body.storage,title"
        );
    }

    #[test]
    fn test_search_url() {
        let url = DocQuery::Search("on call".to_string()).url(BASE);
        assert_eq!(
            url,
            "https://acme.atlassian.net/wiki/rest/api/content/search?cql=type%3Dpage%20AND%20text~%22on%20call%22&expand=title,body.storage"
        );
    }

    #[test]
    fn test_page_text() {
        let page: DocPage = serde_json::from_value(json!({
            "id": "1",
            "title": "Runbook",
            "body": {"storage": {"value": "<p>Restart it</p>", "representation": "storage"}}
        }))
        .unwrap();
        assert_eq!(page.to_text(), "Title: Runbook\nContent (HTML):\n<p>Restart it</p>");
    }

    #[test]
    fn test_page_without_body() {
        let page: DocPage = serde_json::from_value(json!({"title": "Empty"})).unwrap();
        assert!(page.to_text().ends_with("No content"));

        let page: DocPage =
            serde_json::from_value(json!({"title": "Blank", "body": {"storage": {"value": ""}}}))
                .unwrap();
        assert!(page.to_text().ends_with("No content"));
    }

    #[test]
    fn test_search_results_mapping() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [
                {"id": "1", "title": "A", "body": {"storage": {"value": "<p>a</p>"}}},
                {"id": "2", "title": "B"}
            ],
            "size": 2
        }))
        .unwrap();

        let results = to_results(response);
        assert_eq!(
            serde_json::to_value(&results).unwrap(),
            json!([
                {"id": "1", "title": "A", "content": "<p>a</p>"},
                {"id": "2", "title": "B", "content": "No content"}
            ])
        );
    }

    #[test]
    fn test_non_string_fields_pass_through() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": [
                {"id": 65601, "title": "Numeric id", "body": {"storage": {"value": "<p/>"}}},
                {"id": "2", "title": null, "body": {"storage": {"value": 7}}}
            ]
        }))
        .unwrap();

        assert_eq!(
            serde_json::to_value(to_results(response)).unwrap(),
            json!([
                {"id": 65601, "title": "Numeric id", "content": "<p/>"},
                {"id": "2", "title": null, "content": "No content"}
            ])
        );

        let page: DocPage = serde_json::from_value(json!({"id": 1, "title": 2024})).unwrap();
        assert_eq!(page.to_text(), "Title: 2024\nContent (HTML):\nNo content");
    }

    #[tokio::test]
    async fn test_fetch_by_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/wiki/rest/api/content/777"))
            .and(query_param("expand", "body.storage,title"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "777",
                "title": "Deploys",
                "body": {"storage": {"value": "<h1>Deploys</h1>"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AtlassianClient::new().unwrap();
        let creds = Credentials::new(server.uri(), "dev@acme.io", "secret");
        let query = DocQuery::ById("777".to_string());

        let text = fetch_docs(&client, &creds, &query).await.unwrap();
        assert_eq!(text, "Title: Deploys\nContent (HTML):\n<h1>Deploys</h1>");
    }

    #[tokio::test]
    async fn test_fetch_search() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/wiki/rest/api/content/search"))
            .and(query_param("cql", "type=page AND text~\"deploy\""))
            .and(query_param("expand", "title,body.storage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"id": "9", "title": "Deploys", "body": {"storage": {"value": "<p/>"}}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AtlassianClient::new().unwrap();
        let creds = Credentials::new(server.uri(), "dev@acme.io", "secret");
        let query = DocQuery::Search("deploy".to_string());

        let text = fetch_docs(&client, &creds, &query).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            json!([{"id": "9", "title": "Deploys", "content": "<p/>"}])
        );
    }
}
