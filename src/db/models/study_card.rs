//! Study-card data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A craft flashcard: a question about technique on the front, the
/// reference answer on the back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyCard {
    pub id: i64,
    pub topic_id: Option<i64>,
    pub front: String,
    pub back: String,
    pub review_count: i64,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyCardInput {
    pub topic_id: Option<i64>,
    pub front: String,
    pub back: String,
}
