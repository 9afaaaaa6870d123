use anyhow::{Context, Result};
use serde::Serialize;

use super::notes::{Note, Visibility};
use super::resources::Resource;
use super::{now_ts, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    NoteCreate,
    ResourceCreate,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::NoteCreate => "note.create",
            ActivityType::ResourceCreate => "resource.create",
        }
    }
}

#[derive(Serialize)]
struct NoteCreatePayload<'a> {
    content: &'a str,
    visibility: Visibility,
}

#[derive(Serialize)]
struct ResourceCreatePayload<'a> {
    filename: &'a str,
    #[serde(rename = "type")]
    content_type: &'a str,
    size: i64,
}

impl Store {
    /// Audit record for a freshly created note
    pub async fn create_note_activity(&self, note: &Note) -> Result<()> {
        let payload = NoteCreatePayload {
            content: &note.content,
            visibility: note.visibility,
        };
        self.create_activity(note.creator_id, ActivityType::NoteCreate, &payload)
            .await
    }

    /// Audit record for a freshly created resource
    pub async fn create_resource_activity(&self, resource: &Resource) -> Result<()> {
        let payload = ResourceCreatePayload {
            filename: &resource.filename,
            content_type: &resource.content_type,
            size: resource.size,
        };
        self.create_activity(resource.creator_id, ActivityType::ResourceCreate, &payload)
            .await
    }

    async fn create_activity(
        &self,
        creator_id: i64,
        kind: ActivityType,
        payload: &impl Serialize,
    ) -> Result<()> {
        let payload = serde_json::to_string(payload)
            .with_context(|| format!("Failed to encode {} payload", kind.as_str()))?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO activities (creator_id, created_ts, type, level, payload)
             VALUES (?1, ?2, ?3, 'INFO', ?4)",
            rusqlite::params![creator_id, now_ts(), kind.as_str(), payload],
        )
        .with_context(|| format!("Failed to record {} activity", kind.as_str()))?;
        Ok(())
    }

    /// (type, payload) of every activity a user generated, oldest first
    #[cfg(test)]
    pub async fn list_activities(&self, creator_id: i64) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT type, payload FROM activities WHERE creator_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![creator_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list activities")?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::notes::NoteDraft;
    use crate::store::resources::ResourceDraft;

    #[tokio::test]
    async fn test_note_activity_payload() {
        let store = Store::open_in_memory().unwrap();
        let alice = store.ensure_user("alice").await.unwrap();
        let note = store
            .create_note(&NoteDraft {
                creator_id: alice,
                visibility: Visibility::Private,
                content: "hello".to_string(),
            })
            .await
            .unwrap();

        store.create_note_activity(&note).await.unwrap();

        let activities = store.list_activities(alice).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].0, "note.create");
        let payload: serde_json::Value = serde_json::from_str(&activities[0].1).unwrap();
        assert_eq!(payload["content"], "hello");
        assert_eq!(payload["visibility"], "PRIVATE");
    }

    #[tokio::test]
    async fn test_resource_activity_payload() {
        let store = Store::open_in_memory().unwrap();
        let alice = store.ensure_user("alice").await.unwrap();
        let resource = store
            .create_resource(&ResourceDraft {
                creator_id: alice,
                filename: "photo.png".to_string(),
                content_type: "image/png".to_string(),
                size: 3,
                blob: vec![1, 2, 3],
                public_id: "pub-1".to_string(),
            })
            .await
            .unwrap();

        store.create_resource_activity(&resource).await.unwrap();

        let activities = store.list_activities(alice).await.unwrap();
        assert_eq!(activities[0].0, "resource.create");
        let payload: serde_json::Value = serde_json::from_str(&activities[0].1).unwrap();
        assert_eq!(payload["filename"], "photo.png");
        assert_eq!(payload["type"], "image/png");
        assert_eq!(payload["size"], 3);
    }
}
