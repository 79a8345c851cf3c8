use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of a `repository` webhook event.
#[derive(Deserialize, Serialize, Debug)]
pub struct RepositoryEvent {
    pub action: String,
    pub repository: Repository,
    pub installation: Option<Installation>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
    pub template_repository: Option<TemplateRepository>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Owner {
    pub login: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct TemplateRepository {
    pub full_name: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Installation {
    pub id: Option<u64>,
}

/// Where a newly created repository came from and which installation owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOrigin {
    pub owner: String,
    pub name: String,
    pub installation_id: Option<u64>,
    pub template_full_name: Option<String>,
}

/// Reads `repository.template_repository.full_name` without requiring the
/// rest of the event to be well formed.
pub fn template_full_name(payload: &Value) -> Option<&str> {
    payload
        .pointer("/repository/template_repository/full_name")?
        .as_str()
}

/// Exact, case-sensitive match on the template's `owner/name`.
pub fn is_from_template(payload: &Value, expected: &str) -> bool {
    template_full_name(payload) == Some(expected)
}

impl From<RepositoryEvent> for RepositoryOrigin {
    fn from(event: RepositoryEvent) -> Self {
        RepositoryOrigin {
            owner: event.repository.owner.login,
            name: event.repository.name,
            installation_id: event.installation.and_then(|i| i.id),
            template_full_name: event.repository.template_repository.map(|t| t.full_name),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Deserialize, Debug)]
pub struct InstallationTokenResponse {
    pub token: String,
}
