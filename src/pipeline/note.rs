use tracing::debug;

use super::{AtStage, Datastore, Failure, Stage};
use crate::store::notes::{Note, NoteDraft, Visibility};

/// Caption when the message carries files, otherwise the text. Either may
/// be absent, in which case the note is empty.
pub fn note_content(text: Option<&str>, caption: Option<&str>, has_attachments: bool) -> String {
    match (has_attachments, caption, text) {
        (true, Some(caption), _) => caption.to_string(),
        (_, _, Some(text)) => text.to_string(),
        _ => String::new(),
    }
}

/// Create the private note for a message and record its activity.
pub async fn build(
    datastore: &dyn Datastore,
    user_id: i64,
    text: Option<&str>,
    caption: Option<&str>,
    has_attachments: bool,
) -> Result<Note, Failure> {
    let draft = NoteDraft {
        creator_id: user_id,
        visibility: Visibility::Private,
        content: note_content(text, caption, has_attachments),
    };

    let note = datastore.create_note(&draft).await.at(Stage::CreateNote)?;
    debug!("Created {} note {} for user {}", note.visibility, note.id, user_id);

    datastore
        .create_note_activity(&note)
        .await
        .at(Stage::RecordNoteActivity)?;

    Ok(note)
}
