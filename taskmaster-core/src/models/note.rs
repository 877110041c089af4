use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::EntityId;

/// Title given to notes saved with a blank title.
pub const UNTITLED_NOTE: &str = "Untitled note";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(title: &str) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::generate(),
            title: normalize_title(title),
            content: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces title and content and refreshes `updated_at`.
    pub fn update(&mut self, title: &str, content: impl Into<String>) {
        self.title = normalize_title(title);
        self.content = content.into();
        self.updated_at = Utc::now();
    }

    /// First 50 characters of the content, for list views.
    pub fn preview(&self) -> String {
        self.content.chars().take(50).collect()
    }
}

fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        UNTITLED_NOTE.to_string()
    } else {
        trimmed.to_string()
    }
}
