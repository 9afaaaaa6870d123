//! Inbound message to persisted note.
//!
//! Each message runs through four steps in order: acknowledge with a status
//! reply, resolve the sender to a user, create the note, then store and link
//! every attachment. The first failure is written into the status reply and
//! stops the run. Rows already written are left in place.

pub mod attachment;
pub mod identity;
pub mod note;
pub mod status;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::platform::{Attachment, IncomingMessage, Transport};
use crate::store::notes::{Note, NoteDraft};
use crate::store::resources::{Resource, ResourceDraft};
use crate::store::users::UserSetting;

use self::status::StatusMessage;

/// Persistence calls the pipeline depends on.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn list_user_settings(&self, key: &str) -> Result<Vec<UserSetting>>;
    async fn create_note(&self, draft: &NoteDraft) -> Result<Note>;
    async fn create_note_activity(&self, note: &Note) -> Result<()>;
    async fn create_resource(&self, draft: &ResourceDraft) -> Result<Resource>;
    async fn create_resource_activity(&self, resource: &Resource) -> Result<()>;
    async fn link_resource_to_note(&self, note_id: i64, resource_id: i64) -> Result<()>;
}

/// Step that failed, as shown to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FindUser,
    CreateNote,
    RecordNoteActivity,
    CreateResource,
    RecordResourceActivity,
    LinkResource,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::FindUser => "find user",
            Stage::CreateNote => "create note",
            Stage::RecordNoteActivity => "record note activity",
            Stage::CreateResource => "create resource",
            Stage::RecordResourceActivity => "record resource activity",
            Stage::LinkResource => "link resource",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    pub reason: String,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to {}: {}", self.stage, self.reason)
    }
}

/// Tags a datastore error with the step it happened in.
pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, Failure>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, Failure> {
        self.map_err(|e| Failure {
            stage,
            reason: format!("{:#}", e),
        })
    }
}

/// How a message was handled. Every variant has already been reported
/// to the sender through the status reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved { note_id: i64, resource_ids: Vec<i64> },
    /// No user has linked this sender id; nothing was written.
    Unlinked,
    Failed(Failure),
}

pub fn register_notice(sender_id: u64) -> String {
    format!(
        "Please set your telegram userid {} in your notebot user settings",
        sender_id
    )
}

pub struct NotePipeline {
    transport: Arc<dyn Transport>,
    datastore: Arc<dyn Datastore>,
}

impl NotePipeline {
    pub fn new(transport: Arc<dyn Transport>, datastore: Arc<dyn Datastore>) -> Self {
        Self {
            transport,
            datastore,
        }
    }

    /// Store one message and its attachments, reporting progress in a
    /// single reply. Only errors talking to the chat platform are returned
    /// as `Err`; storage problems end up in `Outcome::Failed`.
    pub async fn process(
        &self,
        message: &IncomingMessage,
        attachments: Vec<Attachment>,
    ) -> Result<Outcome> {
        let status =
            StatusMessage::begin(self.transport.as_ref(), message.chat_id, message.message_id)
                .await
                .context("Failed to send status reply")?;

        let outcome = match self.store_message(message, attachments).await {
            Ok(outcome) => outcome,
            Err(failure) => Outcome::Failed(failure),
        };

        match &outcome {
            Outcome::Saved {
                note_id,
                resource_ids,
            } => {
                info!(
                    "Saved note {} with {} resource(s) for sender {}",
                    note_id,
                    resource_ids.len(),
                    message.sender_id
                );
                status.succeed().await?;
            }
            Outcome::Unlinked => {
                info!("No user linked to sender {}", message.sender_id);
                status.fail(&register_notice(message.sender_id)).await?;
            }
            Outcome::Failed(failure) => {
                warn!("Message from sender {} {}", message.sender_id, failure);
                status.fail(&failure.to_string()).await?;
            }
        }

        Ok(outcome)
    }

    async fn store_message(
        &self,
        message: &IncomingMessage,
        attachments: Vec<Attachment>,
    ) -> std::result::Result<Outcome, Failure> {
        let datastore = self.datastore.as_ref();

        let Some(user_id) = identity::resolve(datastore, message.sender_id)
            .await
            .at(Stage::FindUser)?
        else {
            return Ok(Outcome::Unlinked);
        };

        let note = note::build(
            datastore,
            user_id,
            message.text.as_deref(),
            message.caption.as_deref(),
            !attachments.is_empty(),
        )
        .await?;

        let mut resource_ids = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let resource = attachment::ingest(datastore, user_id, note.id, attachment).await?;
            resource_ids.push(resource.id);
        }

        Ok(Outcome::Saved {
            note_id: note.id,
            resource_ids,
        })
    }
}
