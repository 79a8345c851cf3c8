use chrono::Utc;
use reqwest::Method;

use crate::app_state::AppConfig;
use crate::error::AppError;
use crate::github::client::{error_body, GitHubClient};
use crate::github::jwt::{create_jwt, SignedAssertion};
use crate::github::models::InstallationTokenResponse;

/// Installation-scoped access token. Used once, never cached.
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        AccessToken(token)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

/// Trades a signed app assertion for an installation access token.
///
/// Any non-2xx answer is returned as `CredentialExchange` with the upstream
/// status and body. There is no retry.
#[tracing::instrument(skip(github, assertion))]
pub async fn exchange_token(
    github: &GitHubClient,
    assertion: &SignedAssertion,
    installation_id: u64,
) -> Result<AccessToken, AppError> {
    let res = github
        .request(
            Method::POST,
            &format!("/app/installations/{installation_id}/access_tokens"),
            assertion.as_str(),
        )
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let body = error_body(res).await;
        tracing::warn!(status = status.as_u16(), "installation token exchange rejected");
        return Err(AppError::CredentialExchange {
            status: status.as_u16(),
            body,
        });
    }

    let token: InstallationTokenResponse = res.json().await?;
    Ok(AccessToken(token.token))
}

/// Signs a fresh assertion for the app and exchanges it in one go.
pub async fn installation_token(
    github: &GitHubClient,
    config: &AppConfig,
    installation_id: u64,
) -> Result<AccessToken, AppError> {
    let assertion = create_jwt(&config.app_id, &config.private_key_pem, Utc::now())?;
    exchange_token(github, &assertion, installation_id).await
}
