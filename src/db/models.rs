use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const TOOL_SCAN: &str = "scan";
pub const TOOL_PAYLOAD: &str = "payload";

/// Registered account. The password hash never leaves the store layer.
#[derive(Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(email: String, hashed_password: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            hashed_password,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("hashed_password", &"***")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// One recorded tool run, owned by exactly one user.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub user_id: String,
    pub tool: String,
    pub input_data: String,
    #[schema(value_type = Object)]
    pub result: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    #[must_use]
    pub fn new(user_id: &str, tool: &str, input_data: String, result: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            tool: tool.to_string(),
            input_data,
            result,
            timestamp: Utc::now(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Cve {
    pub id: String,
    pub description: String,
    pub severity: String,
    pub tags: Vec<String>,
    pub reference: String,
    pub published_date: DateTime<Utc>,
}

/// Paging and filtering for a user's log history, newest first.
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub user_id: String,
    pub tool: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CveFilter {
    pub severity: Option<String>,
    pub tag: Option<String>,
    pub limit: u32,
}

impl CveFilter {
    /// Severity matches exactly, the tag must be one of the CVE's tags.
    #[must_use]
    pub fn matches(&self, cve: &Cve) -> bool {
        self.severity
            .as_deref()
            .map_or(true, |severity| cve.severity == severity)
            && self
                .tag
                .as_deref()
                .map_or(true, |tag| cve.tags.iter().any(|t| t == tag))
    }
}

/// Case-insensitive literal match on the description, or an exact match on a
/// lowercased tag.
#[must_use]
pub fn cve_matches_term(cve: &Cve, term: &str) -> bool {
    let needle = term.to_lowercase();
    cve.description.to_lowercase().contains(&needle) || cve.tags.iter().any(|t| *t == needle)
}
