//! Library items: the documents stored inside categories.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategoryId;

/// Item identifier (`item-<uuid>` when generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a fresh, unique item id
    pub fn generate() -> Self {
        Self(format!("item-{}", Uuid::new_v4().simple()))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The original file behind an uploaded item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Original file name, extension included
    pub file_name: String,

    /// MIME type reported or guessed at upload time
    pub mime_type: String,

    /// `data:` URL carrying the raw bytes, only for binary documents (PDF)
    pub file_data: Option<String>,
}

/// A document stored in exactly one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    /// Unique identifier
    pub id: ItemId,

    /// Owning category
    pub category_id: CategoryId,

    /// Display title
    pub title: String,

    /// Text content, or a placeholder description for binary files
    pub content: String,

    /// Creation time (milliseconds since the epoch on the wire)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Encoded payload (`data:<mime>;base64,...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
}

impl LibraryItem {
    /// Create a text item with a fresh id and the current timestamp
    pub fn new(
        category_id: CategoryId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId::generate(),
            category_id,
            title: title.into(),
            content: content.into(),
            created_at: now_millis(),
            file_name: None,
            mime_type: None,
            file_data: None,
        }
    }

    /// Use a specific id instead of a generated one
    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach the uploaded file's metadata and payload
    pub fn with_attachment(mut self, attachment: FileAttachment) -> Self {
        self.file_name = Some(attachment.file_name);
        self.mime_type = Some(attachment.mime_type);
        self.file_data = attachment.file_data;
        self
    }

    /// Whether the item carries an encoded binary payload
    pub fn has_file_data(&self) -> bool {
        self.file_data.is_some()
    }

    /// Decode the binary payload back into raw bytes.
    ///
    /// Accepts both a `data:` URL and a bare base64 string. Returns `None`
    /// when there is no payload or it is not valid base64.
    pub fn decode_file_data(&self) -> Option<Vec<u8>> {
        let data = self.file_data.as_deref()?;
        let encoded = match data.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => data,
        };
        STANDARD.decode(encoded.trim()).ok()
    }
}

/// Current time truncated to what the wire format keeps
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000_000 * 1_000_000)
        .unwrap_or(now)
}

/// Build a `data:` URL for a binary payload
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted() {
        let item = LibraryItem::new(CategoryId::from("root-1"), "Note", "hello");
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["categoryId"], "root-1");
        assert!(json["createdAt"].is_i64());
        assert!(json.get("fileName").is_none());
        assert!(json.get("fileData").is_none());
    }

    #[test]
    fn test_parses_browser_format() {
        let json = r#"{
            "id": "item-1700000000000",
            "categoryId": "root-1",
            "title": "Paper",
            "content": "PDF file: paper.pdf",
            "createdAt": 1700000000000,
            "fileName": "paper.pdf",
            "mimeType": "application/pdf",
            "fileData": "data:application/pdf;base64,JVBERi0="
        }"#;

        let item: LibraryItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.created_at.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(item.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(item.decode_file_data().unwrap(), b"%PDF-");
    }

    #[test]
    fn test_data_url_round_trip() {
        let url = to_data_url("application/pdf", b"%PDF-1.7");
        assert!(url.starts_with("data:application/pdf;base64,"));

        let item = LibraryItem::new(CategoryId::from("c"), "t", "").with_attachment(FileAttachment {
            file_name: "a.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            file_data: Some(url),
        });
        assert!(item.has_file_data());
        assert_eq!(item.decode_file_data().unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn test_decode_without_payload() {
        let item = LibraryItem::new(CategoryId::from("c"), "t", "text");
        assert!(item.decode_file_data().is_none());
    }
}
