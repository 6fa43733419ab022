use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{Persona, PersonaInput},
};

fn row_to_persona(row: &Row) -> Result<Persona> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Persona {
        id: row.get("id")?,
        name: row.get("name")?,
        voice: row.get("voice")?,
        sample: row.get("sample")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Create a persona. Names are unique.
    pub async fn create_persona(&self, input: PersonaInput) -> Result<Persona> {
        self.execute(move |conn| {
            let now = Utc::now();

            let duplicate: i64 = conn.query_row(
                "SELECT COUNT(*) FROM personas WHERE name = ?1",
                params![input.name],
                |row| row.get(0),
            )?;
            if duplicate > 0 {
                bail!("a persona named '{}' already exists", input.name);
            }

            conn.execute(
                "INSERT INTO personas (name, voice, sample, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    input.name,
                    input.voice,
                    input.sample,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;

            let persona_id = conn.last_insert_rowid();
            let mut stmt = conn.prepare(
                "SELECT id, name, voice, sample, created_at, updated_at
                 FROM personas WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![persona_id])?;
            match rows.next()? {
                Some(row) => row_to_persona(row),
                None => Err(anyhow!("persona not found after insert")),
            }
        })
        .await
    }

    pub async fn get_persona(&self, persona_id: i64) -> Result<Option<Persona>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, voice, sample, created_at, updated_at
                 FROM personas WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![persona_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_persona(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// All personas, alphabetical.
    pub async fn get_personas(&self) -> Result<Vec<Persona>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, voice, sample, created_at, updated_at
                 FROM personas ORDER BY name ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut personas = Vec::new();
            while let Some(row) = rows.next()? {
                personas.push(row_to_persona(row)?);
            }
            Ok(personas)
        })
        .await
    }

    pub async fn update_persona(&self, persona_id: i64, input: PersonaInput) -> Result<()> {
        self.execute(move |conn| {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE personas
                 SET name = ?1, voice = ?2, sample = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    input.name,
                    input.voice,
                    input.sample,
                    now.to_rfc3339(),
                    persona_id,
                ],
            )?;
            if changed == 0 {
                bail!("persona {persona_id} not found");
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_persona(&self, persona_id: i64) -> Result<()> {
        self.execute(move |conn| {
            // Works referencing the persona keep their text; the link is
            // simply cleared.
            conn.execute(
                "UPDATE works SET persona_id = NULL WHERE persona_id = ?1",
                params![persona_id],
            )?;
            let changed = conn.execute("DELETE FROM personas WHERE id = ?1", params![persona_id])?;
            if changed == 0 {
                bail!("persona {persona_id} not found");
            }
            Ok(())
        })
        .await
    }
}
