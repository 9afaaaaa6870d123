use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileMeta, MessageId, ReplyParameters};
use tracing::{error, info, warn};

use crate::pipeline::{Datastore, NotePipeline};
use crate::platform::{Attachment, IncomingMessage, MessageRef, Transport};
use crate::store::Store;

/// `Transport` backed by the Telegram Bot API
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_reply(&self, chat_id: i64, reply_to: i32, text: &str) -> Result<MessageRef> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_parameters(ReplyParameters::new(MessageId(reply_to)))
            .await
            .context("Failed to send Telegram reply")?;

        Ok(MessageRef {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<()> {
        self.bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .await
            .context("Failed to edit Telegram message")?;
        Ok(())
    }
}

/// Run the Telegram bot platform
pub async fn run(bot: Bot, store: Store) -> Result<()> {
    info!("Starting Telegram platform...");

    let store = Arc::new(store);

    let handler = Update::filter_message()
        .filter(|msg: Message| msg.from.is_some())
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![store])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, store: Arc<Store>) -> ResponseResult<()> {
    let sender_id = match msg.from.as_ref() {
        Some(user) => user.id.0,
        None => return Ok(()),
    };

    let incoming = IncomingMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender_id,
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
    };

    info!(
        "Telegram message {} from {} in chat {}",
        incoming.message_id, incoming.sender_id, incoming.chat_id
    );

    let attachments = match download_attachments(&bot, &msg).await {
        Ok(attachments) => attachments,
        Err(e) => {
            error!("Failed to download attachments: {:#}", e);
            bot.send_message(msg.chat.id, format!("Failed to download attachment: {}", e))
                .reply_parameters(ReplyParameters::new(msg.id))
                .await?;
            return Ok(());
        }
    };

    let transport = Arc::new(TelegramTransport::new(bot));
    let datastore: Arc<dyn Datastore> = store;
    let pipeline = NotePipeline::new(transport, datastore);

    if let Err(e) = pipeline.process(&incoming, attachments).await {
        error!("Error processing message {}: {:#}", incoming.message_id, e);
    }

    Ok(())
}

/// Fetch every file carried by the message, in a fixed order:
/// photo, document, video.
async fn download_attachments(bot: &Bot, msg: &Message) -> Result<Vec<Attachment>> {
    let mut attachments = Vec::new();

    // Telegram lists photo sizes smallest first.
    if let Some(best) = msg.photo().and_then(|sizes| sizes.last()) {
        attachments.push(download(bot, &best.file, None).await?);
    }

    if let Some(doc) = msg.document() {
        attachments.push(download(bot, &doc.file, doc.file_name.as_deref()).await?);
    }

    if let Some(video) = msg.video() {
        attachments.push(download(bot, &video.file, video.file_name.as_deref()).await?);
    }

    Ok(attachments)
}

async fn download(bot: &Bot, meta: &FileMeta, file_name: Option<&str>) -> Result<Attachment> {
    let file = bot
        .get_file(meta.id.clone())
        .await
        .context("Failed to look up Telegram file")?;

    let mut blob = Vec::with_capacity(meta.size as usize);
    bot.download_file(&file.path, &mut blob)
        .await
        .with_context(|| format!("Failed to download Telegram file {}", file.path))?;

    let filename = file_name
        .map(str::to_string)
        .unwrap_or_else(|| basename(&file.path).to_string());

    Ok(Attachment { filename, blob })
}

/// Last path segment of a Telegram file path such as `photos/file_3.jpg`.
fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
