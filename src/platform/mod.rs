pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// A message received from the chat platform
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i32,
    /// Platform-assigned id of the human sender
    pub sender_id: u64,
    pub text: Option<String>,
    pub caption: Option<String>,
}

/// A file that arrived with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub blob: Vec<u8>,
}

/// A message the bot has sent and may later edit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_reply(&self, chat_id: i64, reply_to: i32, text: &str) -> Result<MessageRef>;
    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<()>;
}
