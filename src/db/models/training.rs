//! Training-session data models.
//!
//! A training session is a guided, multi-step practice run: each step
//! names an operation (an exercise, a critique, a rewrite...) whose
//! prompt is built when the step is reached and whose extracted answer
//! is stored on the step once the bridge completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prompts::OperationKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrainingStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl TrainingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::InProgress => "InProgress",
            TrainingStatus::Completed => "Completed",
            TrainingStatus::Abandoned => "Abandoned",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSession {
    pub id: String,
    pub title: String,
    pub topic_id: Option<i64>,
    pub status: TrainingStatus,
    /// Index into the ordered steps; the next step to complete.
    pub current_step: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStep {
    pub id: i64,
    pub session_id: String,
    pub step_index: i64,
    pub kind: OperationKind,
    /// The extracted answer, once the step's bridge session succeeded.
    pub response_text: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}
