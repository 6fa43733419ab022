//! Persona data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authorial voice the user practices imitating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: i64,
    pub name: String,
    /// Short description of the voice: register, cadence, vocabulary.
    pub voice: String,
    /// Optional excerpt in that voice, quoted inside prompts.
    pub sample: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for creating or updating a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaInput {
    pub name: String,
    pub voice: String,
    pub sample: Option<String>,
}
