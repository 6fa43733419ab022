//! Work data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A piece of the user's writing. Soft-deleted so a slip of the finger
/// never destroys a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: String,
    pub title: String,
    pub body: String,
    pub persona_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Work {
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

/// Input data for creating or updating a work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkInput {
    pub title: String,
    pub body: String,
    pub persona_id: Option<i64>,
    pub topic_id: Option<i64>,
}

/// Summary row for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSummary {
    pub id: String,
    pub title: String,
    pub word_count: i64,
    pub persona_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}
