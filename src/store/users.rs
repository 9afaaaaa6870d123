use anyhow::{Context, Result};
use rusqlite::OptionalExtension;

use super::Store;

/// Setting key holding the JSON-encoded Telegram user id of an account.
pub const TELEGRAM_USER_ID_KEY: &str = "telegram-user-id";

/// System setting holding the JSON-encoded bot token.
pub const TELEGRAM_BOT_TOKEN_SETTING: &str = "telegram-bot-token";

/// A per-user setting; `value` is stored JSON-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSetting {
    pub user_id: i64,
    pub key: String,
    pub value: String,
}

impl Store {
    /// Create a user, or return the id of the existing user with this name.
    pub async fn ensure_user(&self, username: &str) -> Result<i64> {
        let conn = self.conn.lock().await;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                rusqlite::params![username],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up user")?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO users (username) VALUES (?1)",
            rusqlite::params![username],
        )
        .context("Failed to create user")?;

        Ok(conn.last_insert_rowid())
    }

    /// Insert or replace a user setting. `value` must already be JSON-encoded.
    pub async fn upsert_user_setting(&self, user_id: i64, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO user_settings (user_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value",
            rusqlite::params![user_id, key, value],
        )
        .context("Failed to upsert user setting")?;
        Ok(())
    }

    /// List every user's setting stored under `key`.
    pub async fn list_user_settings(&self, key: &str) -> Result<Vec<UserSetting>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, key, value FROM user_settings
                 WHERE key = ?1
                 ORDER BY user_id ASC",
            )
            .context("Failed to prepare user settings query")?;

        let settings = stmt
            .query_map(rusqlite::params![key], |row| {
                Ok(UserSetting {
                    user_id: row.get(0)?,
                    key: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list user settings")?;

        Ok(settings)
    }

    /// Insert or replace a system setting. `value` must already be JSON-encoded.
    pub async fn upsert_system_setting(&self, name: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO system_settings (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            rusqlite::params![name, value],
        )
        .context("Failed to upsert system setting")?;
        Ok(())
    }

    /// Decoded string value of a system setting, or `default` when the
    /// setting is missing or is not a JSON string.
    pub async fn system_setting_or_default(&self, name: &str, default: &str) -> Result<String> {
        let conn = self.conn.lock().await;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM system_settings WHERE name = ?1",
                rusqlite::params![name],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read system setting")?;

        let value = raw
            .and_then(|raw| serde_json::from_str::<String>(&raw).ok())
            .unwrap_or_else(|| default.to_string());
        Ok(value)
    }
}
