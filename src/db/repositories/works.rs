use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime},
    models::{Work, WorkInput, WorkSummary},
};

fn row_to_work(row: &Row) -> Result<Work> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let deleted_at: Option<String> = row.get("deleted_at")?;

    Ok(Work {
        id: row.get("id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        persona_id: row.get("persona_id")?,
        topic_id: row.get("topic_id")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        deleted_at: parse_optional_datetime(deleted_at, "deleted_at")?,
    })
}

impl Database {
    /// Create a work and return it with its generated id.
    pub async fn create_work(&self, input: WorkInput) -> Result<Work> {
        self.execute(move |conn| {
            let now = Utc::now();
            let work = Work {
                id: Uuid::new_v4().to_string(),
                title: input.title,
                body: input.body,
                persona_id: input.persona_id,
                topic_id: input.topic_id,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };

            conn.execute(
                "INSERT INTO works (id, title, body, persona_id, topic_id, created_at, updated_at, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
                params![
                    work.id,
                    work.title,
                    work.body,
                    work.persona_id,
                    work.topic_id,
                    work.created_at.to_rfc3339(),
                    work.updated_at.to_rfc3339(),
                ],
            )?;

            Ok(work)
        })
        .await
    }

    pub async fn get_work(&self, work_id: &str) -> Result<Option<Work>> {
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, body, persona_id, topic_id, created_at, updated_at, deleted_at
                 FROM works
                 WHERE id = ?1 AND deleted_at IS NULL",
            )?;
            let mut rows = stmt.query(params![work_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_work(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Non-deleted works, most recently touched first.
    pub async fn list_works(&self) -> Result<Vec<WorkSummary>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, body, persona_id, topic_id, updated_at
                 FROM works
                 WHERE deleted_at IS NULL
                 ORDER BY updated_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut summaries = Vec::new();
            while let Some(row) = rows.next()? {
                let body: String = row.get("body")?;
                let updated_at: String = row.get("updated_at")?;
                summaries.push(WorkSummary {
                    id: row.get("id")?,
                    title: row.get("title")?,
                    word_count: body.split_whitespace().count() as i64,
                    persona_id: row.get("persona_id")?,
                    topic_id: row.get("topic_id")?,
                    updated_at: parse_datetime(&updated_at, "updated_at")?,
                });
            }
            Ok(summaries)
        })
        .await
    }

    pub async fn update_work(&self, work_id: &str, input: WorkInput) -> Result<()> {
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE works
                 SET title = ?1, body = ?2, persona_id = ?3, topic_id = ?4, updated_at = ?5
                 WHERE id = ?6 AND deleted_at IS NULL",
                params![
                    input.title,
                    input.body,
                    input.persona_id,
                    input.topic_id,
                    now.to_rfc3339(),
                    work_id,
                ],
            )?;
            if changed == 0 {
                bail!("work {work_id} not found");
            }
            Ok(())
        })
        .await
    }

    /// Soft delete: the row stays, list and get skip it.
    pub async fn delete_work(&self, work_id: &str) -> Result<()> {
        let work_id = work_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE works SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![now.to_rfc3339(), work_id],
            )?;
            if changed == 0 {
                bail!("work {work_id} not found");
            }
            Ok(())
        })
        .await
    }
}
