//! In-process fakes for the pipeline's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::Datastore;
use crate::platform::{MessageRef, Transport};
use crate::store::notes::{Note, NoteDraft};
use crate::store::resources::{Resource, ResourceDraft};
use crate::store::users::UserSetting;
use crate::store::Store;

const REPLY_ID: i32 = 1000;

/// Records every send and edit.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(i64, i32, String)>>,
    edits: Mutex<Vec<(MessageRef, String)>>,
    fail_send: bool,
    fail_edit: bool,
}

impl RecordingTransport {
    pub fn failing_send() -> Self {
        Self {
            fail_send: true,
            ..Self::default()
        }
    }

    pub fn failing_edit() -> Self {
        Self {
            fail_edit: true,
            ..Self::default()
        }
    }

    pub fn reply_ref(&self, chat_id: i64) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: REPLY_ID,
        }
    }

    pub fn sent(&self) -> Vec<(i64, i32, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn edit_texts(&self) -> Vec<String> {
        self.edits().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_reply(&self, chat_id: i64, reply_to: i32, text: &str) -> Result<MessageRef> {
        if self.fail_send {
            bail!("send refused");
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id, reply_to, text.to_string()));
        Ok(self.reply_ref(chat_id))
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<()> {
        if self.fail_edit {
            bail!("edit refused");
        }
        self.edits.lock().unwrap().push((message, text.to_string()));
        Ok(())
    }
}

/// Wraps a real in-memory store and fails chosen calls.
pub struct FlakyDatastore {
    inner: Store,
    fail_resource_on_call: Option<usize>,
    fail_note: bool,
    fail_note_activity: bool,
    fail_resource_activity: bool,
    fail_link: bool,
    fail_list_settings: bool,
    resource_calls: AtomicUsize,
    writes: AtomicUsize,
}

impl FlakyDatastore {
    pub fn new(inner: Store) -> Self {
        Self {
            inner,
            fail_resource_on_call: None,
            fail_note: false,
            fail_note_activity: false,
            fail_resource_activity: false,
            fail_link: false,
            fail_list_settings: false,
            resource_calls: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Fail the n-th (1-based) `create_resource` call.
    pub fn fail_resource_on_call(mut self, n: usize) -> Self {
        self.fail_resource_on_call = Some(n);
        self
    }

    pub fn fail_note(mut self) -> Self {
        self.fail_note = true;
        self
    }

    pub fn fail_note_activity(mut self) -> Self {
        self.fail_note_activity = true;
        self
    }

    pub fn fail_resource_activity(mut self) -> Self {
        self.fail_resource_activity = true;
        self
    }

    pub fn fail_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    pub fn fail_list_settings(mut self) -> Self {
        self.fail_list_settings = true;
        self
    }

    pub fn resource_calls(&self) -> usize {
        self.resource_calls.load(Ordering::SeqCst)
    }

    /// Number of write calls attempted, failed ones included.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Datastore for FlakyDatastore {
    async fn list_user_settings(&self, key: &str) -> Result<Vec<UserSetting>> {
        if self.fail_list_settings {
            return Err(anyhow!("injected failure"));
        }
        self.inner.list_user_settings(key).await
    }

    async fn create_note(&self, draft: &NoteDraft) -> Result<Note> {
        self.count_write();
        if self.fail_note {
            return Err(anyhow!("injected failure"));
        }
        self.inner.create_note(draft).await
    }

    async fn create_note_activity(&self, note: &Note) -> Result<()> {
        self.count_write();
        if self.fail_note_activity {
            return Err(anyhow!("injected failure"));
        }
        self.inner.create_note_activity(note).await
    }

    async fn create_resource(&self, draft: &ResourceDraft) -> Result<Resource> {
        self.count_write();
        let call = self.resource_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_resource_on_call == Some(call) {
            return Err(anyhow!("injected failure"));
        }
        self.inner.create_resource(draft).await
    }

    async fn create_resource_activity(&self, resource: &Resource) -> Result<()> {
        self.count_write();
        if self.fail_resource_activity {
            return Err(anyhow!("injected failure"));
        }
        self.inner.create_resource_activity(resource).await
    }

    async fn link_resource_to_note(&self, note_id: i64, resource_id: i64) -> Result<()> {
        self.count_write();
        if self.fail_link {
            return Err(anyhow!("injected failure"));
        }
        self.inner.link_resource_to_note(note_id, resource_id).await
    }
}
