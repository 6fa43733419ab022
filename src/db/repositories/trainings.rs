use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_training_status},
    models::{TrainingSession, TrainingStatus, TrainingStep},
};
use crate::prompts::OperationKind;

fn row_to_session(row: &Row) -> Result<TrainingSession> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let status: String = row.get("status")?;

    Ok(TrainingSession {
        id: row.get("id")?,
        title: row.get("title")?,
        topic_id: row.get("topic_id")?,
        status: parse_training_status(&status)?,
        current_step: row.get("current_step")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn row_to_step(row: &Row) -> Result<TrainingStep> {
    let kind: String = row.get("kind")?;
    let completed_at: Option<String> = row.get("completed_at")?;

    Ok(TrainingStep {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        step_index: row.get("step_index")?,
        kind: OperationKind::parse(&kind)?,
        response_text: row.get("response_text")?,
        completed_at: parse_optional_datetime(completed_at, "completed_at")?,
    })
}

impl Database {
    /// Create a training session with its ordered steps.
    pub async fn create_training_session(
        &self,
        title: String,
        topic_id: Option<i64>,
        step_kinds: Vec<OperationKind>,
    ) -> Result<TrainingSession> {
        if step_kinds.is_empty() {
            bail!("a training session needs at least one step");
        }

        self.execute(move |conn| {
            let now = Utc::now();
            let session = TrainingSession {
                id: Uuid::new_v4().to_string(),
                title,
                topic_id,
                status: TrainingStatus::InProgress,
                current_step: 0,
                created_at: now,
                updated_at: now,
            };

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO training_sessions (id, title, topic_id, status, current_step, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
                params![
                    session.id,
                    session.title,
                    session.topic_id,
                    session.status.as_str(),
                    session.created_at.to_rfc3339(),
                    session.updated_at.to_rfc3339(),
                ],
            )?;
            for (index, kind) in step_kinds.iter().enumerate() {
                tx.execute(
                    "INSERT INTO training_steps (session_id, step_index, kind)
                     VALUES (?1, ?2, ?3)",
                    params![session.id, index as i64, kind.as_str()],
                )?;
            }
            tx.commit()?;

            Ok(session)
        })
        .await
    }

    pub async fn get_training_session(&self, session_id: &str) -> Result<Option<TrainingSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, topic_id, status, current_step, created_at, updated_at
                 FROM training_sessions WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![session_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_training_sessions(&self) -> Result<Vec<TrainingSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, topic_id, status, current_step, created_at, updated_at
                 FROM training_sessions ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    /// Steps of a session in order.
    pub async fn get_training_steps(&self, session_id: &str) -> Result<Vec<TrainingStep>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, step_index, kind, response_text, completed_at
                 FROM training_steps
                 WHERE session_id = ?1
                 ORDER BY step_index ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut steps = Vec::new();
            while let Some(row) = rows.next()? {
                steps.push(row_to_step(row)?);
            }
            Ok(steps)
        })
        .await
    }

    /// Store a step's extracted answer and advance the session, marking
    /// it completed when the last step is done. Returns the updated
    /// session.
    pub async fn record_step_result(
        &self,
        session_id: &str,
        step_index: i64,
        response_text: String,
    ) -> Result<TrainingSession> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now();
            let tx = conn.transaction()?;

            let changed = tx.execute(
                "UPDATE training_steps
                 SET response_text = ?1, completed_at = ?2
                 WHERE session_id = ?3 AND step_index = ?4",
                params![response_text, now.to_rfc3339(), session_id, step_index],
            )?;
            if changed == 0 {
                bail!("training step {step_index} of session {session_id} not found");
            }

            let total_steps: i64 = tx.query_row(
                "SELECT COUNT(*) FROM training_steps WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            let next_step = step_index + 1;
            let status = if next_step >= total_steps {
                TrainingStatus::Completed
            } else {
                TrainingStatus::InProgress
            };

            tx.execute(
                "UPDATE training_sessions
                 SET current_step = ?1, status = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![next_step, status.as_str(), now.to_rfc3339(), session_id],
            )?;

            let session = {
                let mut stmt = tx.prepare(
                    "SELECT id, title, topic_id, status, current_step, created_at, updated_at
                     FROM training_sessions WHERE id = ?1",
                )?;
                let mut rows = stmt.query(params![session_id])?;
                match rows.next()? {
                    Some(row) => row_to_session(row)?,
                    None => return Err(anyhow!("training session {session_id} not found")),
                }
            };
            tx.commit()?;

            Ok(session)
        })
        .await
    }

    pub async fn abandon_training_session(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE training_sessions
                 SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4",
                params![
                    TrainingStatus::Abandoned.as_str(),
                    now.to_rfc3339(),
                    session_id,
                    TrainingStatus::InProgress.as_str(),
                ],
            )?;
            if changed == 0 {
                bail!("training session {session_id} not found or not in progress");
            }
            Ok(())
        })
        .await
    }
}
