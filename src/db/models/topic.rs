//! Topic data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subject or exercise seed to write about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: i64,
    pub name: String,
    /// Seed text expanded into exercise prompts.
    pub seed: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInput {
    pub name: String,
    pub seed: String,
}
