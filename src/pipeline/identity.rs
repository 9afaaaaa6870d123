use anyhow::Result;
use tracing::debug;

use super::Datastore;
use crate::store::users::{UserSetting, TELEGRAM_USER_ID_KEY};

/// Find the user who linked this Telegram sender id.
pub async fn resolve(datastore: &dyn Datastore, sender_id: u64) -> Result<Option<i64>> {
    let settings = datastore.list_user_settings(TELEGRAM_USER_ID_KEY).await?;
    Ok(find_linked_user(&settings, sender_id))
}

/// Stored values are JSON strings holding the decimal id, so the match is
/// on text, not on the number. Values that do not decode are skipped.
pub fn find_linked_user(settings: &[UserSetting], sender_id: u64) -> Option<i64> {
    let wanted = sender_id.to_string();

    settings.iter().find_map(|setting| {
        match serde_json::from_str::<String>(&setting.value) {
            Ok(value) if value == wanted => Some(setting.user_id),
            Ok(_) => None,
            Err(e) => {
                debug!(
                    "Skipping undecodable {} setting of user {}: {}",
                    setting.key, setting.user_id, e
                );
                None
            }
        }
    })
}
