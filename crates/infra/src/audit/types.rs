use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUDIT_LIMIT: i64 = 100;
pub const MAX_AUDIT_LIMIT: i64 = 500;

/// One row of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub actor_identity: String,
    pub actor_display_name: Option<String>,
    pub actor_role: Option<String>,
    pub area: String,
    pub action: String,
    pub target: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// An entry about to be appended; `id` and `created_at` are assigned by the log.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditEntry {
    pub actor_identity: String,
    pub actor_display_name: Option<String>,
    pub actor_role: Option<String>,
    pub area: String,
    pub action: String,
    pub target: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewAuditEntry {
    pub fn new(
        actor_identity: impl Into<String>,
        area: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            actor_identity: actor_identity.into(),
            area: area.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_actor_display_name(mut self, name: Option<String>) -> Self {
        self.actor_display_name = name;
        self
    }

    pub fn with_actor_role(mut self, role: Option<String>) -> Self {
        self.actor_role = role;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Actor, area and action all present (non-blank).
    pub fn is_complete(&self) -> bool {
        [&self.actor_identity, &self.area, &self.action]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// Audit retrieval filters.
///
/// Deserializes from a query string (`?area=…&actorIdentity=…&freeText=…`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    pub area: Option<String>,
    pub actor_identity: Option<String>,
    pub action: Option<String>,
    pub target: Option<String>,
    pub free_text: Option<String>,
}

impl AuditQuery {
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_actor_identity(mut self, actor: impl Into<String>) -> Self {
        self.actor_identity = Some(actor.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_free_text(mut self, text: impl Into<String>) -> Self {
        self.free_text = Some(text.into());
        self
    }

    /// Requested limit clamped to `[1, MAX_AUDIT_LIMIT]`.
    pub fn clamped_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT)
    }

    /// Trimmed filters with blanks dropped and the limit clamped.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            limit: Some(self.clamped_limit()),
            area: clean(&self.area),
            actor_identity: clean(&self.actor_identity),
            action: clean(&self.action),
            target: clean(&self.target),
            free_text: clean(&self.free_text),
        }
    }

    /// Filter predicate for in-process evaluation. Expects a normalized query.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        let exact = |filter: &Option<String>, value: Option<&str>| match filter {
            Some(expected) => value == Some(expected.as_str()),
            None => true,
        };

        if !exact(&self.area, Some(&entry.area))
            || !exact(&self.actor_identity, Some(&entry.actor_identity))
            || !exact(&self.action, Some(&entry.action))
            || !exact(&self.target, entry.target.as_deref())
        {
            return false;
        }

        match &self.free_text {
            Some(text) => {
                let needle = text.to_lowercase();
                [
                    Some(entry.actor_identity.as_str()),
                    entry.actor_display_name.as_deref(),
                    Some(entry.area.as_str()),
                    Some(entry.action.as_str()),
                    entry.target.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}
