use anyhow::{Context, Result};

use super::{now_ts, Store};

/// Fields supplied when storing an attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDraft {
    pub creator_id: i64,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub blob: Vec<u8>,
    pub public_id: String,
}

/// A persisted resource. The blob stays in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub struct Resource {
    pub id: i64,
    pub creator_id: i64,
    pub created_ts: i64,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub public_id: String,
}

impl Store {
    pub async fn create_resource(&self, draft: &ResourceDraft) -> Result<Resource> {
        let created_ts = now_ts();
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO resources (creator_id, created_ts, filename, blob, type, size, public_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                draft.creator_id,
                created_ts,
                &draft.filename,
                &draft.blob,
                &draft.content_type,
                draft.size,
                &draft.public_id,
            ],
        )
        .context("Failed to insert resource")?;

        Ok(Resource {
            id: conn.last_insert_rowid(),
            creator_id: draft.creator_id,
            created_ts,
            filename: draft.filename.clone(),
            content_type: draft.content_type.clone(),
            size: draft.size,
            public_id: draft.public_id.clone(),
        })
    }

    /// Attach a resource to a note. Linking the same pair again only
    /// refreshes `updated_ts`.
    pub async fn link_resource_to_note(&self, note_id: i64, resource_id: i64) -> Result<()> {
        let ts = now_ts();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO note_resources (note_id, resource_id, created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(note_id, resource_id) DO UPDATE SET updated_ts = excluded.updated_ts",
            rusqlite::params![note_id, resource_id, ts],
        )
        .context("Failed to link resource to note")?;
        Ok(())
    }

    /// Resources linked to a note, in link order
    #[cfg(test)]
    pub async fn list_resources_for_note(&self, note_id: i64) -> Result<Vec<Resource>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.creator_id, r.created_ts, r.filename, r.type, r.size, r.public_id
             FROM resources r
             JOIN note_resources nr ON nr.resource_id = r.id
             WHERE nr.note_id = ?1
             ORDER BY nr.rowid ASC",
        )?;

        let resources = stmt
            .query_map(rusqlite::params![note_id], |row| {
                Ok(Resource {
                    id: row.get(0)?,
                    creator_id: row.get(1)?,
                    created_ts: row.get(2)?,
                    filename: row.get(3)?,
                    content_type: row.get(4)?,
                    size: row.get(5)?,
                    public_id: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list note resources")?;

        Ok(resources)
    }

    /// Every resource a user created, linked or not
    #[cfg(test)]
    pub async fn list_resources_by_creator(&self, creator_id: i64) -> Result<Vec<Resource>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, creator_id, created_ts, filename, type, size, public_id
             FROM resources
             WHERE creator_id = ?1
             ORDER BY id ASC",
        )?;

        let resources = stmt
            .query_map(rusqlite::params![creator_id], |row| {
                Ok(Resource {
                    id: row.get(0)?,
                    creator_id: row.get(1)?,
                    created_ts: row.get(2)?,
                    filename: row.get(3)?,
                    content_type: row.get(4)?,
                    size: row.get(5)?,
                    public_id: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list resources")?;

        Ok(resources)
    }

    /// Raw bytes stored for a resource
    #[cfg(test)]
    pub async fn resource_blob(&self, resource_id: i64) -> Result<Vec<u8>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT blob FROM resources WHERE id = ?1",
            rusqlite::params![resource_id],
            |row| row.get(0),
        )
        .context("Failed to load resource blob")
    }
}
