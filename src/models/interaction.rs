use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of user interaction that feeds the persona
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Watch,
    Like,
}

impl InteractionKind {
    /// Parses the stored event type; other event types do not feed personas
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "watch" | "view" => Some(InteractionKind::Watch),
            "like" => Some(InteractionKind::Like),
            _ => None,
        }
    }
}

/// A single watch or like event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionEvent {
    pub user_id: i64,
    pub video_id: i64,
    pub kind: InteractionKind,
    /// Seconds watched, when recorded
    pub watch_time: Option<f64>,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

/// Mean-pooled embedding summarizing a user's recent interests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonaVector {
    pub user_id: i64,
    pub vector: Vec<f32>,
    pub updated_at: DateTime<Utc>,
}

impl PersonaVector {
    /// Whether this vector may still be served at `now`
    ///
    /// An expiry past the representable range never arrives.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.updated_at
            .checked_add_signed(ttl)
            .map_or(true, |expires_at| now < expires_at)
    }
}
