use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agentic::views::attachment_classification::classify;

/// Maximum number of attachments on a single outgoing message
pub const MAX_ATTACHMENTS: usize = 5;

/// A file picked or pasted by the user, held in memory until the message is sent.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    name: String,
    mime: String,
    bytes: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        Ok(Self::new(name, mime, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn is_image(&self) -> bool {
        classify(Some(&self.mime), &self.name)
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// One entry of a clipboard paste. Only image-typed entries become attachments.
#[derive(Clone, Debug)]
pub struct ClipboardItem {
    pub mime: String,
    pub file: Option<LocalFile>,
}

impl ClipboardItem {
    pub fn file(file: LocalFile) -> Self {
        Self {
            mime: file.mime().to_string(),
            file: Some(file),
        }
    }

    pub fn text() -> Self {
        Self {
            mime: "text/plain".to_string(),
            file: None,
        }
    }
}

/// Backend form of a persisted attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, with = "crate::agentic::models::conversation::flexible_timestamp::option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "blobId", default)]
    pub blob_id: Option<String>,
    /// Base64 image payload, only sent for images
    #[serde(default)]
    pub data: Option<String>,
}

/// Revocable in-memory URL standing in for a local file's bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PreviewUrl(String);

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live preview URLs. URLs stay resolvable until revoked.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, file: &LocalFile) -> PreviewUrl {
        let url = format!("blob:agentic-chat/{}", uuid::Uuid::new_v4());
        self.entries.lock().insert(url.clone(), file.bytes().clone());
        PreviewUrl(url)
    }

    pub fn resolve(&self, url: &PreviewUrl) -> Option<Bytes> {
        self.entries.lock().get(url.as_str()).cloned()
    }

    pub fn revoke(&self, url: &PreviewUrl) -> bool {
        self.entries.lock().remove(url.as_str()).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Attachment attached to a message or pending in the composer.
#[derive(Clone, Debug, PartialEq)]
pub enum Attachment {
    /// Picked locally and not yet persisted
    Local {
        file: Arc<LocalFile>,
        preview_url: Option<PreviewUrl>,
    },
    /// Confirmed by the backend
    Persisted(AttachmentRecord),
    /// Older histories store only the file name
    LegacyName(String),
}

impl Attachment {
    pub fn local(file: LocalFile) -> Self {
        Attachment::Local {
            file: Arc::new(file),
            preview_url: None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Attachment::Local { file, .. } => file.name(),
            Attachment::Persisted(record) => &record.name,
            Attachment::LegacyName(name) => name,
        }
    }

    pub fn mime(&self) -> Option<&str> {
        match self {
            Attachment::Local { file, .. } => Some(file.mime()),
            Attachment::Persisted(record) => Some(&record.mime),
            Attachment::LegacyName(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        classify(self.mime(), self.display_name())
    }

    pub fn preview_url(&self) -> Option<&PreviewUrl> {
        match self {
            Attachment::Local { preview_url, .. } => preview_url.as_ref(),
            _ => None,
        }
    }
}

/// Result of admitting files into the composer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdmitOutcome {
    pub admitted: usize,
    pub excluded: usize,
}

impl AdmitOutcome {
    pub fn is_partial(&self) -> bool {
        self.excluded > 0
    }
}

/// Pending attachments of the message being composed.
///
/// Enforces [`MAX_ATTACHMENTS`] and owns the preview URLs it hands out.
pub struct AttachmentManager {
    pending: Vec<Attachment>,
    previews: PreviewRegistry,
}

impl AttachmentManager {
    pub fn new(previews: PreviewRegistry) -> Self {
        Self {
            pending: Vec::new(),
            previews,
        }
    }

    pub fn pending(&self) -> &[Attachment] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn remaining_capacity(&self) -> usize {
        MAX_ATTACHMENTS.saturating_sub(self.pending.len())
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Admit picked files up to the remaining capacity. Files beyond it are
    /// reported in `excluded`, never merged.
    pub fn add(&mut self, files: Vec<LocalFile>) -> AdmitOutcome {
        let capacity = self.remaining_capacity();
        let excluded = files.len().saturating_sub(capacity);
        let admitted = files.len() - excluded;

        self.pending
            .extend(files.into_iter().take(capacity).map(Attachment::local));

        debug!(admitted, excluded, total = self.pending.len(), "Files added to composer");
        AdmitOutcome { admitted, excluded }
    }

    /// Admit pasted images. Non-image entries are dropped without being counted.
    pub fn add_from_paste(&mut self, items: Vec<ClipboardItem>) -> AdmitOutcome {
        let images: Vec<LocalFile> = items
            .into_iter()
            .filter(|item| item.mime.starts_with("image/"))
            .filter_map(|item| item.file)
            .collect();
        self.add(images)
    }

    /// Remove one pending attachment, releasing its preview.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        if index >= self.pending.len() {
            warn!(index, len = self.pending.len(), "Attachment index out of range");
            return None;
        }
        let removed = self.pending.remove(index);
        self.release(&removed);
        Some(removed)
    }

    /// Preview URL for the attachment at `index`, created on first request.
    pub fn ensure_preview(&mut self, index: usize) -> Option<PreviewUrl> {
        let previews = self.previews.clone();
        match self.pending.get_mut(index)? {
            Attachment::Local { file, preview_url } if file.is_image() => {
                let url = preview_url.get_or_insert_with(|| previews.create(file.as_ref()));
                Some(url.clone())
            }
            _ => None,
        }
    }

    /// Copies of the pending attachments for an outgoing message, with image
    /// previews derived. The composer keeps its entries until [`detach_all`].
    ///
    /// [`detach_all`]: AttachmentManager::detach_all
    pub fn prepare_for_send(&mut self) -> Vec<Attachment> {
        for index in 0..self.pending.len() {
            self.ensure_preview(index);
        }
        self.pending.clone()
    }

    /// Empty the composer without revoking previews; the sent message owns them now.
    pub fn detach_all(&mut self) {
        self.pending.clear();
    }

    /// Empty the composer and revoke every preview it handed out.
    pub fn clear(&mut self) {
        for attachment in std::mem::take(&mut self.pending) {
            self.release(&attachment);
        }
    }

    /// Revoke previews held by attachments that are no longer displayed.
    pub fn release_all<'a>(&self, attachments: impl IntoIterator<Item = &'a Attachment>) {
        for attachment in attachments {
            self.release(attachment);
        }
    }

    fn release(&self, attachment: &Attachment) {
        if let Some(url) = attachment.preview_url() {
            self.previews.revoke(url);
        }
    }
}
