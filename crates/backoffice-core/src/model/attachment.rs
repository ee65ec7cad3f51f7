// ── Attachments ──
//
// Existing attachments arrive in several producer shapes and are
// normalized into `Attachment` here. Pending uploads live in an
// `AttachmentDraft` until the form is submitted; each one holds a
// `PreviewHandle` that is released exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use backoffice_api::AttachmentUpload;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{trace, warn};

use super::EntityId;

// ── Existing attachments ─────────────────────────────────────────────

/// An attachment already stored on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// `None` when no known id location is populated; such an
    /// attachment cannot be deleted individually.
    pub id: Option<EntityId>,
    pub name: String,
    pub url: Option<String>,
    pub size: Option<u64>,
}

impl Attachment {
    /// Normalize one attachment record.
    pub fn from_value(value: &Value) -> Self {
        let id = first_id(value, &["id", "attachment_id"])
            .or_else(|| value.get("pivot").and_then(|p| first_id(p, &["attachment_id"])))
            .or_else(|| {
                value
                    .get("pivot")
                    .and_then(|p| p.get("attachment"))
                    .and_then(|a| first_id(a, &["id"]))
            });

        let name = first_str(value, &["file_name", "name", "original_name", "filename"])
            .unwrap_or_else(|| "attachment".to_owned());
        let url = first_str(value, &["file_url", "url", "path"]);
        let size = ["size", "file_size"]
            .iter()
            .find_map(|k| value.get(k).and_then(as_u64));

        Self { id, name, url, size }
    }
}

/// All attachments of an entity (`attachments` or `files` array).
pub fn attachments_of(entity: &Value) -> Vec<Attachment> {
    ["attachments", "files"]
        .iter()
        .find_map(|k| entity.get(k).and_then(Value::as_array))
        .map(|items| items.iter().map(Attachment::from_value).collect())
        .unwrap_or_default()
}

fn first_id(value: &Value, keys: &[&str]) -> Option<EntityId> {
    keys.iter()
        .find_map(|k| value.get(k).and_then(EntityId::from_value))
}

fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        value
            .get(k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Preview handles ──────────────────────────────────────────────────

/// Tracks every live preview so leaks and double releases are observable.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next: AtomicU64,
    live: DashMap<u64, String>,
    released: AtomicU64,
    double_releases: AtomicU64,
}

impl PreviewRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn acquire(self: &Arc<Self>, label: String) -> PreviewHandle {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.live.insert(id, label);
        trace!(id, "preview acquired");
        PreviewHandle {
            id,
            registry: Arc::clone(self),
        }
    }

    fn release(&self, id: u64) {
        if self.live.remove(&id).is_some() {
            self.released.fetch_add(1, Ordering::Relaxed);
            trace!(id, "preview released");
        } else {
            self.double_releases.fetch_add(1, Ordering::Relaxed);
            warn!(id, "preview released twice");
        }
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }

    pub fn acquired(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    pub fn double_releases(&self) -> u64 {
        self.double_releases.load(Ordering::Relaxed)
    }
}

/// Preview resource for one pending upload.
///
/// Released when dropped; there is no other way to release it, so a
/// second release cannot be expressed.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    registry: Arc<PreviewRegistry>,
}

impl PreviewHandle {
    pub fn label(&self) -> String {
        self.registry
            .live
            .get(&self.id)
            .map(|l| l.value().clone())
            .unwrap_or_default()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

// ── Draft ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PendingUpload {
    pub upload: AttachmentUpload,
    preview: PreviewHandle,
}

impl PendingUpload {
    pub fn preview_label(&self) -> String {
        self.preview.label()
    }
}

/// Files staged for upload with the next form submit.
#[derive(Debug)]
pub struct AttachmentDraft {
    registry: Arc<PreviewRegistry>,
    pending: Vec<PendingUpload>,
}

impl AttachmentDraft {
    pub fn new(registry: Arc<PreviewRegistry>) -> Self {
        Self {
            registry,
            pending: Vec::new(),
        }
    }

    /// Stage a file and acquire its preview.
    pub fn add(&mut self, upload: AttachmentUpload) -> usize {
        let label = format!("{} ({}, {} bytes)", upload.file_name, upload.mime, upload.size());
        let preview = self.registry.acquire(label);
        self.pending.push(PendingUpload { upload, preview });
        self.pending.len() - 1
    }

    /// Unstage a file; its preview is released immediately.
    pub fn remove(&mut self, index: usize) -> Option<AttachmentUpload> {
        (index < self.pending.len()).then(|| self.pending.remove(index).upload)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingUpload> {
        self.pending.iter()
    }

    /// Hand the files over for submission, releasing every preview.
    pub fn into_uploads(self) -> Vec<AttachmentUpload> {
        self.pending.into_iter().map(|p| p.upload).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn probes_every_known_field_name() {
        let a = Attachment::from_value(&json!({
            "id": 4, "file_name": "a.pdf", "file_url": "https://x/a.pdf", "size": 120
        }));
        assert_eq!(a.id, Some(EntityId::Number(4)));
        assert_eq!(a.name, "a.pdf");
        assert_eq!(a.url.as_deref(), Some("https://x/a.pdf"));
        assert_eq!(a.size, Some(120));

        let b = Attachment::from_value(&json!({
            "original_name": "scan.png", "path": "/storage/scan.png", "file_size": "2048",
            "pivot": {"attachment_id": "17"}
        }));
        assert_eq!(b.id, Some(EntityId::Number(17)));
        assert_eq!(b.name, "scan.png");
        assert_eq!(b.url.as_deref(), Some("/storage/scan.png"));
        assert_eq!(b.size, Some(2048));
    }

    #[test]
    fn nested_pivot_attachment_id() {
        let a = Attachment::from_value(&json!({
            "filename": "x.txt",
            "pivot": {"attachment": {"id": 31}}
        }));
        assert_eq!(a.id, Some(EntityId::Number(31)));
        assert_eq!(a.name, "x.txt");
    }

    #[test]
    fn missing_everything_still_normalizes() {
        let a = Attachment::from_value(&json!({}));
        assert!(a.id.is_none());
        assert_eq!(a.name, "attachment");
        assert!(a.url.is_none());
    }

    #[test]
    fn attachments_of_entity() {
        let list = attachments_of(&json!({"id": 1, "attachments": [{"id": 1}, {"id": 2}]}));
        assert_eq!(list.len(), 2);
        assert!(attachments_of(&json!({"id": 1})).is_empty());
    }

    fn upload(name: &str) -> AttachmentUpload {
        AttachmentUpload::new(name, name.as_bytes().to_vec())
    }

    #[test]
    fn removal_releases_once() {
        let registry = PreviewRegistry::new();
        let mut draft = AttachmentDraft::new(Arc::clone(&registry));
        draft.add(upload("a.pdf"));
        draft.add(upload("b.pdf"));
        assert_eq!(registry.live(), 2);

        let removed = draft.remove(0).unwrap();
        assert_eq!(removed.file_name, "a.pdf");
        assert_eq!(registry.live(), 1);
        assert!(draft.remove(5).is_none());

        drop(draft);
        assert_eq!(registry.live(), 0);
        assert_eq!(registry.released(), 2);
        assert_eq!(registry.double_releases(), 0);
    }

    #[test]
    fn submit_hand_off_releases_every_preview() {
        let registry = PreviewRegistry::new();
        let mut draft = AttachmentDraft::new(Arc::clone(&registry));
        draft.add(upload("a.pdf"));
        draft.add(upload("b.png"));
        assert!(draft.iter().next().unwrap().preview_label().starts_with("a.pdf"));

        let files = draft.into_uploads();
        assert_eq!(files.len(), 2);
        assert_eq!(registry.live(), 0);
        assert_eq!(registry.acquired(), registry.released());
        assert_eq!(registry.double_releases(), 0);
    }
}
