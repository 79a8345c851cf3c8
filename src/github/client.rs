use reqwest::{Client, Method, RequestBuilder, Response};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "Template-Repo-Configurator";
const API_VERSION: &str = "2022-11-28";

/// Thin wrapper that stamps every GitHub REST call with the same headers.
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(http: Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { http, api_url }
    }

    pub fn request(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(bearer)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

/// Reads an error response body for diagnostics. A body that cannot be
/// read is reported as such instead of coming back empty.
pub async fn error_body(res: Response) -> String {
    body_or_read_error(res.text().await)
}

fn body_or_read_error(body: Result<String, reqwest::Error>) -> String {
    body.unwrap_or_else(|e| format!("<failed to read response body: {e}>"))
}
