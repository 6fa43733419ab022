use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime},
    models::{StudyCard, StudyCardInput},
};

fn row_to_card(row: &Row) -> Result<StudyCard> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let last_reviewed_at: Option<String> = row.get("last_reviewed_at")?;

    Ok(StudyCard {
        id: row.get("id")?,
        topic_id: row.get("topic_id")?,
        front: row.get("front")?,
        back: row.get("back")?,
        review_count: row.get("review_count")?,
        last_reviewed_at: parse_optional_datetime(last_reviewed_at, "last_reviewed_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

const SELECT_CARD: &str = "SELECT id, topic_id, front, back, review_count, last_reviewed_at, \
                           created_at, updated_at FROM study_cards";

impl Database {
    /// Insert a batch of cards in one transaction, e.g. a whole set
    /// parsed from a generated answer.
    pub async fn insert_study_cards(&self, inputs: Vec<StudyCardInput>) -> Result<Vec<StudyCard>> {
        self.execute(move |conn| {
            let now = Utc::now();
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(inputs.len());

            for input in &inputs {
                tx.execute(
                    "INSERT INTO study_cards (topic_id, front, back, review_count, created_at, updated_at)
                     VALUES (?1, ?2, ?3, 0, ?4, ?5)",
                    params![
                        input.topic_id,
                        input.front,
                        input.back,
                        now.to_rfc3339(),
                        now.to_rfc3339(),
                    ],
                )?;
                ids.push(tx.last_insert_rowid());
            }

            let mut cards = Vec::with_capacity(ids.len());
            {
                let mut stmt = tx.prepare(&format!("{SELECT_CARD} WHERE id = ?1"))?;
                for id in ids {
                    let mut rows = stmt.query(params![id])?;
                    if let Some(row) = rows.next()? {
                        cards.push(row_to_card(row)?);
                    }
                }
            }
            tx.commit()?;

            Ok(cards)
        })
        .await
    }

    /// Cards for one topic, or every card when `topic_id` is `None`.
    pub async fn get_study_cards(&self, topic_id: Option<i64>) -> Result<Vec<StudyCard>> {
        self.execute(move |conn| {
            let mut cards = Vec::new();
            match topic_id {
                Some(topic_id) => {
                    let mut stmt = conn
                        .prepare(&format!("{SELECT_CARD} WHERE topic_id = ?1 ORDER BY id ASC"))?;
                    let mut rows = stmt.query(params![topic_id])?;
                    while let Some(row) = rows.next()? {
                        cards.push(row_to_card(row)?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!("{SELECT_CARD} ORDER BY id ASC"))?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        cards.push(row_to_card(row)?);
                    }
                }
            }
            Ok(cards)
        })
        .await
    }

    /// Record one review pass over a card.
    pub async fn mark_card_reviewed(&self, card_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE study_cards
                 SET review_count = review_count + 1, last_reviewed_at = ?1, updated_at = ?1
                 WHERE id = ?2",
                params![now.to_rfc3339(), card_id],
            )?;
            if changed == 0 {
                bail!("study card {card_id} not found");
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_study_card(&self, card_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let changed =
                conn.execute("DELETE FROM study_cards WHERE id = ?1", params![card_id])?;
            if changed == 0 {
                bail!("study card {card_id} not found");
            }
            Ok(())
        })
        .await
    }
}
