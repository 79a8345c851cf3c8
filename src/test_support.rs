use crate::app_state::{AppConfig, AppState};
use crate::github::installation::AccessToken;

pub const TEST_PRIVATE_KEY: &str = include_str!("fixtures/test-app-key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("fixtures/test-app-key.pub.pem");
pub const WEBHOOK_SECRET: &str = "It's a Secret to Everybody";
pub const EXPECTED_TEMPLATE: &str = "acme/service-template";

pub fn test_config(api_url: &str) -> AppConfig {
    AppConfig {
        app_id: "123456".into(),
        private_key_pem: TEST_PRIVATE_KEY.into(),
        webhook_secret: WEBHOOK_SECRET.into(),
        expected_template: EXPECTED_TEMPLATE.into(),
        api_url: api_url.into(),
        bind_addr: "127.0.0.1:0".into(),
    }
}

pub fn test_state(api_url: &str) -> AppState {
    AppState::new(test_config(api_url))
}

pub fn access_token(value: &str) -> AccessToken {
    AccessToken::from(value.to_string())
}
