use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::github::client::{error_body, GitHubClient};
use crate::github::installation::AccessToken;

/// One desired-state write against a repository's Actions settings.
#[derive(Debug, Clone)]
pub struct ConfigurationChange {
    pub setting: &'static str,
    pub method: Method,
    /// Path below `/repos/{owner}/{repo}`.
    pub endpoint: &'static str,
    pub body: Value,
}

impl ConfigurationChange {
    pub fn path(&self, owner: &str, repo: &str) -> String {
        format!("/repos/{owner}/{repo}{}", self.endpoint)
    }
}

/// Settings applied to every repository created from the template, in order.
pub fn template_repo_changes() -> Vec<ConfigurationChange> {
    vec![
        ConfigurationChange {
            setting: "actions_permissions",
            method: Method::PUT,
            endpoint: "/actions/permissions",
            body: json!({ "enabled": true, "allowed_actions": "all" }),
        },
        ConfigurationChange {
            setting: "workflow_permissions",
            method: Method::PUT,
            endpoint: "/actions/permissions/workflow",
            body: json!({
                "default_workflow_permissions": "write",
                "can_approve_pull_request_reviews": true
            }),
        },
        ConfigurationChange {
            setting: "cache_size_limit",
            method: Method::PATCH,
            endpoint: "/actions/cache/usage-policy",
            body: json!({ "repo_cache_size_limit_in_gb": 10 }),
        },
    ]
}

#[derive(Debug, Error)]
pub enum ChangeApplicationError {
    #[error("GitHub returned {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConfigurationOutcome {
    pub setting: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConfigurationOutcome {
    fn from_result(setting: &str, result: Result<StatusCode, ChangeApplicationError>) -> Self {
        match result {
            Ok(status) => ConfigurationOutcome {
                setting: setting.to_string(),
                success: true,
                status: Some(status.as_u16()),
                error: None,
            },
            Err(err) => ConfigurationOutcome {
                setting: setting.to_string(),
                success: false,
                status: match &err {
                    ChangeApplicationError::Rejected { status, .. } => Some(status.as_u16()),
                    ChangeApplicationError::Transport(e) => e.status().map(|s| s.as_u16()),
                },
                error: Some(err.to_string()),
            },
        }
    }
}

async fn apply_change(
    github: &GitHubClient,
    owner: &str,
    repo: &str,
    token: &AccessToken,
    change: &ConfigurationChange,
) -> Result<StatusCode, ChangeApplicationError> {
    let res = github
        .request(change.method.clone(), &change.path(owner, repo), token.as_str())
        .json(&change.body)
        .send()
        .await?;

    let status = res.status();
    if status.is_success() {
        return Ok(status);
    }

    // GitHub error bodies are `{"message": ...}`; fall back to the raw text.
    let text = error_body(res).await;
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or(text);
    Err(ChangeApplicationError::Rejected { status, message })
}

/// Applies `changes` one after another, recording exactly one outcome each.
///
/// A failing change never stops the ones after it.
#[tracing::instrument(skip(github, token, changes), fields(count = changes.len()))]
pub async fn apply_changes(
    github: &GitHubClient,
    owner: &str,
    repo: &str,
    token: &AccessToken,
    changes: &[ConfigurationChange],
) -> Vec<ConfigurationOutcome> {
    let mut outcomes = Vec::with_capacity(changes.len());

    for change in changes {
        let result = apply_change(github, owner, repo, token, change).await;
        if let Err(e) = &result {
            tracing::warn!(setting = change.setting, error = %e, "setting not applied");
        }
        outcomes.push(ConfigurationOutcome::from_result(change.setting, result));
    }

    let failed = outcomes.iter().filter(|o| !o.success).count();
    tracing::info!(
        applied = outcomes.len() - failed,
        failed,
        "configuration results: {}",
        serde_json::to_string(&outcomes).unwrap_or_default()
    );

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn github(server: &MockServer) -> GitHubClient {
        GitHubClient::new(reqwest::Client::new(), server.uri())
    }

    fn token() -> AccessToken {
        crate::test_support::access_token("ghs_test")
    }

    #[test]
    fn batch_order_and_endpoints() {
        let changes = template_repo_changes();
        let summary: Vec<(&str, Method, String)> = changes
            .iter()
            .map(|c| (c.setting, c.method.clone(), c.path("acme", "app")))
            .collect();

        assert_eq!(
            summary,
            vec![
                (
                    "actions_permissions",
                    Method::PUT,
                    "/repos/acme/app/actions/permissions".to_string()
                ),
                (
                    "workflow_permissions",
                    Method::PUT,
                    "/repos/acme/app/actions/permissions/workflow".to_string()
                ),
                (
                    "cache_size_limit",
                    Method::PATCH,
                    "/repos/acme/app/actions/cache/usage-policy".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn all_changes_succeed() {
        let server = MockServer::start().await;
        for change in template_repo_changes() {
            Mock::given(method(change.method.as_str()))
                .and(path(change.path("acme", "app")))
                .and(header("authorization", "Bearer ghs_test"))
                .and(body_json(&change.body))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;
        }

        let outcomes = apply_changes(
            &github(&server),
            "acme",
            "app",
            &token(),
            &template_repo_changes(),
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.success && o.status == Some(204)));
    }

    #[tokio::test]
    async fn failure_is_isolated_to_its_change() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/app/actions/permissions"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({
                    "message": "Server Error"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/app/actions/permissions/workflow"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/acme/app/actions/cache/usage-policy"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcomes = apply_changes(
            &github(&server),
            "acme",
            "app",
            &token(),
            &template_repo_changes(),
        )
        .await;

        assert_eq!(
            outcomes[0],
            ConfigurationOutcome {
                setting: "actions_permissions".into(),
                success: false,
                status: Some(500),
                error: Some("GitHub returned 500 Internal Server Error: Server Error".into()),
            }
        );
        assert!(outcomes[1].success);
        assert!(outcomes[2].success);
    }

    #[tokio::test]
    async fn every_change_gets_an_outcome_when_all_fail() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(3)
            .mount(&server)
            .await;

        let changes = template_repo_changes();
        let outcomes = apply_changes(&github(&server), "acme", "app", &token(), &changes).await;

        let settings: Vec<&str> = outcomes.iter().map(|o| o.setting.as_str()).collect();
        assert_eq!(
            settings,
            ["actions_permissions", "workflow_permissions", "cache_size_limit"]
        );
        assert!(outcomes.iter().all(|o| !o.success && o.status == Some(404)));
        assert_eq!(
            outcomes[2].error.as_deref(),
            Some("GitHub returned 404 Not Found: Not Found")
        );
    }

    #[tokio::test]
    async fn transport_failure_is_recorded_not_raised() {
        // Reserve a free port, then release it so connections are refused.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let github = GitHubClient::new(reqwest::Client::new(), format!("http://{addr}"));
        let changes = template_repo_changes();
        let outcomes = apply_changes(&github, "acme", "app", &token(), &changes).await;

        assert_eq!(outcomes.len(), changes.len());
        for outcome in outcomes {
            assert!(!outcome.success);
            assert_eq!(outcome.status, None);
            assert!(outcome.error.unwrap().starts_with("request failed"));
        }
    }

    #[tokio::test]
    async fn reapplying_a_change_converges() {
        let server = MockServer::start().await;
        let change = template_repo_changes().remove(1);
        Mock::given(method("PUT"))
            .and(path(change.path("acme", "app")))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let batch = vec![change.clone(), change.clone()];
        let outcomes = apply_changes(&github(&server), "acme", "app", &token(), &batch).await;
        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(outcomes[0], outcomes[1]);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body, requests[1].body);
        let sent: Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(sent, change.body);
    }

    #[test]
    fn outcome_serializes_without_empty_fields() {
        let outcome = ConfigurationOutcome::from_result("cache_size_limit", Ok(StatusCode::OK));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "setting": "cache_size_limit", "success": true, "status": 200 })
        );
    }
}
