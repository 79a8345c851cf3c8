use crate::app_state::AppState;
use crate::error::AppError;
use crate::github::installation::installation_token;
use crate::github::models::{
    is_from_template, template_full_name, RepositoryEvent, RepositoryOrigin,
};
use crate::github::settings::{apply_changes, template_repo_changes, ConfigurationOutcome};
use crate::utils::verify_signature;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

/// One inbound delivery, exactly as received.
#[derive(Debug)]
pub struct WebhookDelivery {
    pub raw_body: Bytes,
    pub signature: Option<String>,
    pub event_type: Option<String>,
    pub delivery_id: Option<String>,
}

impl WebhookDelivery {
    pub fn new(headers: &HeaderMap, raw_body: Bytes) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        WebhookDelivery {
            raw_body,
            signature: header("X-Hub-Signature-256"),
            event_type: header("X-GitHub-Event"),
            delivery_id: header("X-GitHub-Delivery"),
        }
    }
}

/// How a delivery that passed every gate, or was deliberately skipped, ends.
#[derive(Debug)]
pub enum Dispatch {
    Ignored(&'static str),
    Configured {
        repository: String,
        outcomes: Vec<ConfigurationOutcome>,
    },
}

impl IntoResponse for Dispatch {
    fn into_response(self) -> Response {
        match self {
            Dispatch::Ignored(reason) => (StatusCode::OK, reason).into_response(),
            Dispatch::Configured {
                repository,
                outcomes,
            } => (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!("Configured {repository}"),
                    "outcomes": outcomes,
                })),
            )
                .into_response(),
        }
    }
}

/// Early exit from the pipeline: either a benign skip or a terminal error.
enum Halt {
    Ignore(&'static str),
    Fail(AppError),
}

impl From<AppError> for Halt {
    fn from(err: AppError) -> Self {
        Halt::Fail(err)
    }
}

type Step<T> = Result<T, Halt>;

fn check_signature(delivery: &WebhookDelivery, secret: &str) -> Step<()> {
    let signature = delivery.signature.as_deref().unwrap_or_default();
    if verify_signature(signature, &delivery.raw_body, secret) {
        Ok(())
    } else {
        tracing::warn!("❌ Invalid signature");
        Err(AppError::InvalidSignature.into())
    }
}

fn parse_payload(raw_body: &[u8]) -> Step<Value> {
    serde_json::from_slice(raw_body)
        .map_err(|e| AppError::MalformedRequest(format!("Invalid JSON payload: {e}")).into())
}

fn filter_event(event_type: Option<&str>, payload: Value) -> Step<Value> {
    if event_type != Some("repository") || payload["action"] != "created" {
        tracing::debug!(?event_type, action = %payload["action"], "event ignored");
        return Err(Halt::Ignore("Event ignored"));
    }
    Ok(payload)
}

/// Only the template name is read here, so a delivery from any other
/// template is ignored whatever the rest of its shape.
fn check_origin(payload: Value, expected_template: &str) -> Step<Value> {
    if !is_from_template(&payload, expected_template) {
        tracing::info!(
            template = ?template_full_name(&payload),
            "Repository not created from {expected_template}, skipping"
        );
        return Err(Halt::Ignore("Not from target template"));
    }
    Ok(payload)
}

fn parse_event(payload: Value) -> Step<RepositoryOrigin> {
    serde_json::from_value::<RepositoryEvent>(payload)
        .map(RepositoryOrigin::from)
        .map_err(|e| AppError::MalformedRequest(format!("Invalid repository event: {e}")).into())
}

fn require_installation(origin: &RepositoryOrigin) -> Step<u64> {
    origin
        .installation_id
        .ok_or_else(|| AppError::MalformedRequest("No installation ID found".into()).into())
}

async fn run(state: &AppState, delivery: &WebhookDelivery) -> Step<Dispatch> {
    check_signature(delivery, &state.config.webhook_secret)?;
    let payload = parse_payload(&delivery.raw_body)?;
    let payload = filter_event(delivery.event_type.as_deref(), payload)?;
    let payload = check_origin(payload, &state.config.expected_template)?;
    let origin = parse_event(payload)?;
    let installation_id = require_installation(&origin)?;

    tracing::info!(
        installation_id,
        "Configuring {}/{} (created from {})",
        origin.owner,
        origin.name,
        origin.template_full_name.as_deref().unwrap_or_default()
    );

    let token = installation_token(&state.github, &state.config, installation_id).await?;
    let outcomes = apply_changes(
        &state.github,
        &origin.owner,
        &origin.name,
        &token,
        &template_repo_changes(),
    )
    .await;

    Ok(Dispatch::Configured {
        repository: format!("{}/{}", origin.owner, origin.name),
        outcomes,
    })
}

/// Runs one delivery through every gate, strictly in order.
pub async fn dispatch(state: &AppState, delivery: &WebhookDelivery) -> Result<Dispatch, AppError> {
    match run(state, delivery).await {
        Ok(done) => Ok(done),
        Err(Halt::Ignore(reason)) => Ok(Dispatch::Ignored(reason)),
        Err(Halt::Fail(err)) => Err(err),
    }
}

#[tracing::instrument(skip_all, fields(delivery = tracing::field::Empty, event = tracing::field::Empty))]
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Dispatch, AppError> {
    let delivery = WebhookDelivery::new(&headers, body);
    let span = tracing::Span::current();
    if let Some(id) = &delivery.delivery_id {
        span.record("delivery", id.as_str());
    }
    if let Some(event) = &delivery.event_type {
        span.record("event", event.as_str());
    }

    let result = dispatch(&state, &delivery).await;
    match &result {
        Ok(Dispatch::Configured { repository, .. }) => {
            tracing::info!("✅ Configured {repository}")
        }
        Ok(Dispatch::Ignored(_)) => {}
        Err(e) if e.status_code().is_server_error() => {
            tracing::error!(error = %e, "Error processing webhook")
        }
        Err(e) => tracing::warn!(error = %e, "Webhook rejected"),
    }
    result
}

pub async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
