use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use super::{now_ts, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(dead_code)]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Protected => "PROTECTED",
            Visibility::Private => "PRIVATE",
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PUBLIC" => Some(Visibility::Public),
            "PROTECTED" => Some(Visibility::Protected),
            "PRIVATE" => Some(Visibility::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields supplied when creating a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub creator_id: i64,
    pub visibility: Visibility,
    pub content: String,
}

/// A persisted note
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub struct Note {
    pub id: i64,
    pub creator_id: i64,
    pub created_ts: i64,
    pub visibility: Visibility,
    pub content: String,
}

impl Store {
    pub async fn create_note(&self, draft: &NoteDraft) -> Result<Note> {
        let created_ts = now_ts();
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO notes (creator_id, created_ts, updated_ts, visibility, content)
             VALUES (?1, ?2, ?2, ?3, ?4)",
            rusqlite::params![
                draft.creator_id,
                created_ts,
                draft.visibility.as_str(),
                &draft.content,
            ],
        )
        .context("Failed to insert note")?;

        Ok(Note {
            id: conn.last_insert_rowid(),
            creator_id: draft.creator_id,
            created_ts,
            visibility: draft.visibility,
            content: draft.content.clone(),
        })
    }

    /// Notes written by a user, oldest first
    #[cfg(test)]
    pub async fn list_notes_by_creator(&self, creator_id: i64) -> Result<Vec<Note>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, creator_id, created_ts, visibility, content
             FROM notes
             WHERE creator_id = ?1
             ORDER BY id ASC",
        )?;

        let notes = stmt
            .query_map(rusqlite::params![creator_id], parse_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list notes")?;

        Ok(notes)
    }
}

#[cfg_attr(not(test), allow(dead_code))]
fn parse_note_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    let visibility: String = row.get(3)?;
    let visibility = Visibility::parse(&visibility).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            anyhow!("unknown visibility: {visibility}").into(),
        )
    })?;

    Ok(Note {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        created_ts: row.get(2)?,
        visibility,
        content: row.get(4)?,
    })
}
