//! Row-conversion helpers shared by the repositories.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use super::models::TrainingStatus;

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid {field} datetime '{value}': {err}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    value.map(|raw| parse_datetime(&raw, field)).transpose()
}

pub fn parse_training_status(value: &str) -> Result<TrainingStatus> {
    match value {
        "InProgress" => Ok(TrainingStatus::InProgress),
        "Completed" => Ok(TrainingStatus::Completed),
        "Abandoned" => Ok(TrainingStatus::Abandoned),
        _ => Err(anyhow!("unknown training status '{value}'")),
    }
}

