pub mod activity;
pub mod notes;
pub mod resources;
pub mod users;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::pipeline::Datastore;
use crate::store::notes::{Note, NoteDraft};
use crate::store::resources::{Resource, ResourceDraft};
use crate::store::users::UserSetting;

/// Thread-safe SQLite store for users, notes and resources
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open or create the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        // Migrate before wrapping in the async Mutex.
        Self::run_migrations(&conn)?;

        info!("Note store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        Self::run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                created_ts INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );

            -- Opaque JSON-encoded values keyed per user
            CREATE TABLE IF NOT EXISTS user_settings (
                user_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                UNIQUE(user_id, key),
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS system_settings (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id INTEGER NOT NULL,
                created_ts INTEGER NOT NULL,
                updated_ts INTEGER NOT NULL,
                visibility TEXT NOT NULL DEFAULT 'PRIVATE'
                    CHECK (visibility IN ('PUBLIC', 'PROTECTED', 'PRIVATE')),
                content TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (creator_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_notes_creator
                ON notes(creator_id, created_ts);

            CREATE TABLE IF NOT EXISTS resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id INTEGER NOT NULL,
                created_ts INTEGER NOT NULL,
                filename TEXT NOT NULL DEFAULT '',
                blob BLOB,
                type TEXT NOT NULL DEFAULT '',
                size INTEGER NOT NULL DEFAULT 0,
                public_id TEXT NOT NULL UNIQUE,
                FOREIGN KEY (creator_id) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS note_resources (
                note_id INTEGER NOT NULL,
                resource_id INTEGER NOT NULL,
                created_ts INTEGER NOT NULL,
                updated_ts INTEGER NOT NULL,
                UNIQUE(note_id, resource_id),
                FOREIGN KEY (note_id) REFERENCES notes(id),
                FOREIGN KEY (resource_id) REFERENCES resources(id)
            );

            CREATE TABLE IF NOT EXISTS activities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id INTEGER NOT NULL,
                created_ts INTEGER NOT NULL,
                type TEXT NOT NULL,
                level TEXT NOT NULL DEFAULT 'INFO'
                    CHECK (level IN ('INFO', 'WARN', 'ERROR')),
                payload TEXT NOT NULL DEFAULT '{}'
            );
            ",
        )
        .context("Failed to run migrations")?;

        Ok(())
    }
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl Datastore for Store {
    async fn list_user_settings(&self, key: &str) -> Result<Vec<UserSetting>> {
        Store::list_user_settings(self, key).await
    }

    async fn create_note(&self, draft: &NoteDraft) -> Result<Note> {
        Store::create_note(self, draft).await
    }

    async fn create_note_activity(&self, note: &Note) -> Result<()> {
        Store::create_note_activity(self, note).await
    }

    async fn create_resource(&self, draft: &ResourceDraft) -> Result<Resource> {
        Store::create_resource(self, draft).await
    }

    async fn create_resource_activity(&self, resource: &Resource) -> Result<()> {
        Store::create_resource_activity(self, resource).await
    }

    async fn link_resource_to_note(&self, note_id: i64, resource_id: i64) -> Result<()> {
        Store::link_resource_to_note(self, note_id, resource_id).await
    }
}
