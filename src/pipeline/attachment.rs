use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use super::{AtStage, Datastore, Failure, Stage};
use crate::platform::Attachment;
use crate::store::resources::{Resource, ResourceDraft};

const OCTET_STREAM: &str = "application/octet-stream";

/// Content type guessed from the file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
        return OCTET_STREAM;
    };

    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => OCTET_STREAM,
    }
}

/// Store one attachment as a resource and link it to the note.
pub async fn ingest(
    datastore: &dyn Datastore,
    user_id: i64,
    note_id: i64,
    attachment: Attachment,
) -> Result<Resource, Failure> {
    let Attachment { filename, blob } = attachment;

    let draft = ResourceDraft {
        creator_id: user_id,
        content_type: content_type_for(&filename).to_string(),
        size: blob.len() as i64,
        filename,
        blob,
        public_id: Uuid::new_v4().to_string(),
    };

    let resource = datastore
        .create_resource(&draft)
        .await
        .at(Stage::CreateResource)?;

    datastore
        .create_resource_activity(&resource)
        .await
        .at(Stage::RecordResourceActivity)?;

    datastore
        .link_resource_to_note(note_id, resource.id)
        .await
        .at(Stage::LinkResource)?;

    debug!(
        "Linked resource {} ({}, {} bytes) to note {}",
        resource.id, resource.content_type, resource.size, note_id
    );
    Ok(resource)
}
