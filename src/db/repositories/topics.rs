use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{Topic, TopicInput},
};

fn row_to_topic(row: &Row) -> Result<Topic> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Topic {
        id: row.get("id")?,
        name: row.get("name")?,
        seed: row.get("seed")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Create a topic. Names are unique.
    pub async fn create_topic(&self, input: TopicInput) -> Result<Topic> {
        self.execute(move |conn| {
            let now = Utc::now();

            let duplicate: i64 = conn.query_row(
                "SELECT COUNT(*) FROM topics WHERE name = ?1",
                params![input.name],
                |row| row.get(0),
            )?;
            if duplicate > 0 {
                bail!("a topic named '{}' already exists", input.name);
            }

            conn.execute(
                "INSERT INTO topics (name, seed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![input.name, input.seed, now.to_rfc3339(), now.to_rfc3339()],
            )?;

            let topic_id = conn.last_insert_rowid();
            let mut stmt = conn.prepare(
                "SELECT id, name, seed, created_at, updated_at FROM topics WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![topic_id])?;
            match rows.next()? {
                Some(row) => row_to_topic(row),
                None => Err(anyhow!("topic not found after insert")),
            }
        })
        .await
    }

    pub async fn get_topic(&self, topic_id: i64) -> Result<Option<Topic>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, seed, created_at, updated_at FROM topics WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![topic_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_topic(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn get_topics(&self) -> Result<Vec<Topic>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, seed, created_at, updated_at FROM topics ORDER BY name ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut topics = Vec::new();
            while let Some(row) = rows.next()? {
                topics.push(row_to_topic(row)?);
            }
            Ok(topics)
        })
        .await
    }

    pub async fn update_topic(&self, topic_id: i64, input: TopicInput) -> Result<()> {
        self.execute(move |conn| {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE topics SET name = ?1, seed = ?2, updated_at = ?3 WHERE id = ?4",
                params![input.name, input.seed, now.to_rfc3339(), topic_id],
            )?;
            if changed == 0 {
                bail!("topic {topic_id} not found");
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_topic(&self, topic_id: i64) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "UPDATE works SET topic_id = NULL WHERE topic_id = ?1",
                params![topic_id],
            )?;
            conn.execute(
                "UPDATE study_cards SET topic_id = NULL WHERE topic_id = ?1",
                params![topic_id],
            )?;
            conn.execute(
                "UPDATE training_sessions SET topic_id = NULL WHERE topic_id = ?1",
                params![topic_id],
            )?;
            let changed = conn.execute("DELETE FROM topics WHERE id = ?1", params![topic_id])?;
            if changed == 0 {
                bail!("topic {topic_id} not found");
            }
            Ok(())
        })
        .await
    }
}
