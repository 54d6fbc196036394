//! Multipart upload helpers shared by the message and resume routes.
//!
//! Files are read fully into memory (the body limit layer caps the request),
//! checked against the size limit and a blocklist of executable types, then
//! handed to file storage. Only the returned reference is kept.

use alumni_common::{
    error::{AlumniError, AlumniResult},
    models::message::StoredAttachment,
};
use axum::extract::Multipart;
use std::collections::HashMap;

use crate::AppState;

/// A file field pulled out of a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A parsed multipart form: at most one `file` plus plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// A text field, trimmed, if present and non-empty.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Content types we refuse to store.
fn is_blocked_content_type(ct: &str) -> bool {
    matches!(
        ct,
        "application/x-msdownload"
            | "application/x-msdos-program"
            | "application/x-executable"
            | "application/x-elf"
            | "application/x-sh"
            | "application/x-bat"
            | "application/x-msi"
            | "application/vnd.microsoft.portable-executable"
    )
}

fn is_blocked_extension(file_name: &str) -> bool {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    matches!(
        ext.as_str(),
        "exe" | "dll" | "bat" | "cmd" | "com" | "msi" | "scr" | "sh" | "ps1"
    )
}

/// Read a multipart form. The `file` field is limited to `max_bytes`.
pub async fn read_form(multipart: &mut Multipart, max_bytes: usize) -> AlumniResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AlumniError::validation(format!("Multipart error: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .map(|ct| ct.to_ascii_lowercase())
                .filter(|ct| !ct.is_empty());

            if content_type.as_deref().is_some_and(is_blocked_content_type)
                || is_blocked_extension(&file_name)
            {
                return Err(AlumniError::validation(format!(
                    "File type of '{file_name}' is not allowed"
                )));
            }

            let bytes = field
                .bytes()
                .await
                .map_err(|e| AlumniError::validation(format!("Failed to read file: {e}")))?;

            if bytes.is_empty() {
                return Err(AlumniError::validation("Uploaded file is empty"));
            }
            if bytes.len() > max_bytes {
                return Err(AlumniError::validation(format!(
                    "File too large: {} bytes (max {max_bytes} bytes)",
                    bytes.len()
                )));
            }

            form.file = Some(UploadedFile {
                file_name,
                content_type,
                data: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AlumniError::validation(format!("Invalid field '{name}': {e}")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// An upload that made it to storage.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Storage key, for removing the object again
    pub key: String,
    pub attachment: StoredAttachment,
}

/// Hand an uploaded file to storage under `prefix`.
pub async fn store(state: &AppState, prefix: &str, file: UploadedFile) -> AlumniResult<StoredUpload> {
    let size = file.data.len() as u64;
    let content_type = file
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    let stored = state
        .storage
        .put(prefix, &file.file_name, content_type, file.data)
        .await?;

    tracing::debug!(key = %stored.key, size, "Stored upload");
    Ok(StoredUpload {
        key: stored.key,
        attachment: StoredAttachment {
            url: stored.url,
            file_name: file.file_name,
            content_type: file.content_type,
            size,
        },
    })
}

/// Remove an upload whose message never got saved. Failures are logged only.
pub async fn discard(state: &AppState, upload: &StoredUpload) {
    match state.storage.delete(&upload.key).await {
        Ok(()) => tracing::debug!(key = %upload.key, "Discarded unsent upload"),
        Err(e) => tracing::warn!(key = %upload.key, error = %e, "Failed to discard unsent upload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executables_are_blocked() {
        assert!(is_blocked_content_type("application/x-msdownload"));
        assert!(!is_blocked_content_type("application/pdf"));
        assert!(is_blocked_extension("setup.EXE"));
        assert!(is_blocked_extension("run.sh"));
        assert!(!is_blocked_extension("resume.pdf"));
        assert!(!is_blocked_extension("no_extension"));
    }
}
