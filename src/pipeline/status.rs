use anyhow::{Context, Result};

use crate::platform::{MessageRef, Transport};

pub const WORKING_MESSAGE: &str = "Working on saving your note...";
pub const SUCCESS_MESSAGE: &str = "Success";

/// The one reply that tracks a message's progress.
///
/// `succeed` and `fail` consume the handle, so it is edited exactly once.
pub struct StatusMessage<'a> {
    transport: &'a dyn Transport,
    message: MessageRef,
}

impl<'a> StatusMessage<'a> {
    pub async fn begin(transport: &'a dyn Transport, chat_id: i64, reply_to: i32) -> Result<Self> {
        let message = transport
            .send_reply(chat_id, reply_to, WORKING_MESSAGE)
            .await?;
        Ok(Self { transport, message })
    }

    pub async fn succeed(self) -> Result<()> {
        self.finish(SUCCESS_MESSAGE).await
    }

    pub async fn fail(self, reason: &str) -> Result<()> {
        self.finish(reason).await
    }

    async fn finish(self, text: &str) -> Result<()> {
        self.transport
            .edit_message(self.message, text)
            .await
            .with_context(|| format!("Failed to edit status message to {:?}", text))
    }
}
