// Multipart writes for resources that accept file attachments.
//
// Form fields are flattened into the bracketed keys the backend expects
// (`lines[0][debit]`), files travel as `attachments[]`. Existing
// attachments are removed one at a time with an immediate DELETE.

use std::path::Path;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::client::ApiClient;
use crate::envelope::{self, Mutation};
use crate::error::Error;

/// A file queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl AttachmentUpload {
    /// Wrap in-memory bytes; the MIME type is guessed from the file name.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();
        Self {
            file_name,
            mime,
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: &Path) -> Result<Self, Error> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "attachment".into(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(file_name, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl ApiClient {
    /// `POST /{resource}` as multipart with files under `attachments[]`.
    pub async fn create_with_attachments(
        &self,
        resource: &str,
        fields: &Value,
        files: &[AttachmentUpload],
    ) -> Result<Mutation, Error> {
        let form = build_form(fields, files, None)?;
        let value = self.post_multipart(resource, form).await?;
        Ok(envelope::mutation_from_value(value))
    }

    /// `POST /{resource}/{id}` with `_method=PUT`; multipart bodies cannot
    /// ride on a real PUT with this backend.
    pub async fn update_with_attachments(
        &self,
        resource: &str,
        id: &str,
        fields: &Value,
        files: &[AttachmentUpload],
    ) -> Result<Mutation, Error> {
        let form = build_form(fields, files, Some("PUT"))?;
        let value = self
            .post_multipart(&format!("{resource}/{id}"), form)
            .await?;
        Ok(envelope::mutation_from_value(value))
    }

    /// `DELETE /{resource}/{id}/attachments/{attachment_id}`.
    pub async fn delete_attachment(
        &self,
        resource: &str,
        id: &str,
        attachment_id: &str,
    ) -> Result<Mutation, Error> {
        let value = self
            .delete(&format!("{resource}/{id}/attachments/{attachment_id}"))
            .await?;
        Ok(envelope::mutation_from_value(value))
    }
}

// ── Form building ────────────────────────────────────────────────────

fn build_form(
    fields: &Value,
    files: &[AttachmentUpload],
    method_override: Option<&str>,
) -> Result<Form, Error> {
    let mut pairs = Vec::new();
    flatten_fields(None, fields, &mut pairs);

    let mut form = Form::new().percent_encode_noop();
    if let Some(method) = method_override {
        form = form.text("_method", method.to_owned());
    }
    for (key, value) in pairs {
        form = form.text(key, value);
    }
    for file in files {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)?;
        form = form.part("attachments[]", part);
    }
    Ok(form)
}

/// Flatten nested JSON into `(key, value)` form pairs using bracket
/// notation. Booleans become `1`/`0`; nulls are omitted.
pub(crate) fn flatten_fields(prefix: Option<&str>, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = match prefix {
                    Some(p) => format!("{p}[{key}]"),
                    None => key.clone(),
                };
                flatten_fields(Some(&name), child, out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                let name = match prefix {
                    Some(p) => format!("{p}[{idx}]"),
                    None => idx.to_string(),
                };
                flatten_fields(Some(&name), child, out);
            }
        }
        Value::Null => {}
        Value::Bool(b) => {
            if let Some(p) = prefix {
                out.push((p.to_owned(), if *b { "1" } else { "0" }.to_owned()));
            }
        }
        Value::Number(n) => {
            if let Some(p) = prefix {
                out.push((p.to_owned(), n.to_string()));
            }
        }
        Value::String(s) => {
            if let Some(p) = prefix {
                out.push((p.to_owned(), s.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_fields_use_bracket_keys() {
        let mut out = Vec::new();
        flatten_fields(
            None,
            &json!({
                "date": "2024-01-31",
                "is_opening": false,
                "note": null,
                "lines": [
                    {"account_id": 12, "debit": "500.00", "credit": "0"},
                    {"account_id": 40, "debit": "0", "credit": "500.00"}
                ]
            }),
            &mut out,
        );
        assert!(out.contains(&("date".into(), "2024-01-31".into())));
        assert!(out.contains(&("is_opening".into(), "0".into())));
        assert!(out.contains(&("lines[0][account_id]".into(), "12".into())));
        assert!(out.contains(&("lines[1][credit]".into(), "500.00".into())));
        assert!(!out.iter().any(|(k, _)| k == "note"));
    }

    #[test]
    fn mime_is_guessed_from_name() {
        let pdf = AttachmentUpload::new("invoice.pdf", b"%PDF".to_vec());
        assert_eq!(pdf.mime, "application/pdf");
        assert_eq!(pdf.size(), 4);

        let unknown = AttachmentUpload::new("blob", Vec::new());
        assert_eq!(unknown.mime, "application/octet-stream");
    }
}
