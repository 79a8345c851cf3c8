use reqwest::Client;
use std::env;

use crate::error::AppError;
use crate::github::client::{GitHubClient, DEFAULT_API_URL};

pub struct AppState {
    pub github: GitHubClient,
    pub config: AppConfig,
}

#[derive(Clone)]
pub struct AppConfig {
    pub app_id: String,
    pub private_key_pem: String,
    pub webhook_secret: String,
    pub expected_template: String,
    pub api_url: String,
    pub bind_addr: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_id", &self.app_id)
            .field("private_key_pem", &"[redacted]")
            .field("webhook_secret", &"[redacted]")
            .field("expected_template", &self.expected_template)
            .field("api_url", &self.api_url)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so callers are not tied to the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{key} is not set")))
        };

        let private_key_pem = match lookup("APP_PRIVATE_KEY").filter(|v| !v.trim().is_empty()) {
            Some(pem) => pem.replace("\\n", "\n"),
            None => {
                let path = require("APP_PRIVATE_KEY_PATH").map_err(|_| {
                    AppError::Config("APP_PRIVATE_KEY or APP_PRIVATE_KEY_PATH must be set".into())
                })?;
                std::fs::read_to_string(&path)
                    .map_err(|e| AppError::Config(format!("cannot read {path}: {e}")))?
            }
        };

        Ok(AppConfig {
            app_id: require("APP_IDENTIFIER")?,
            private_key_pem,
            webhook_secret: require("WEBHOOK_SHARED_SECRET")?,
            expected_template: require("EXPECTED_TEMPLATE_FULL_NAME")?,
            api_url: lookup("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        })
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        AppState {
            github: GitHubClient::new(Client::new(), config.api_url.clone()),
            config,
        }
    }
}

pub fn build_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    Ok(AppState::new(config))
}
