use crate::classify::classify_record;
use crate::db;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub id: String,
    pub url: String,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub alt_text: Option<String>,
    pub thumbnail_url: Option<String>,
    pub kind: String,
    pub created_at: String,
}

impl From<db::ContentRecord> for Content {
    fn from(record: db::ContentRecord) -> Self {
        let kind = classify_record(&record);
        Content {
            id: record.id.to_string(),
            url: record.url,
            filename: record.filename,
            title: record.title,
            description: record.description,
            category: record.category,
            alt_text: record.alt_text,
            thumbnail_url: record.thumbnail_url,
            kind: kind.as_str().to_string(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateContentRequest {
    pub url: String,
    pub filename: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub alt_text: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExternalVideoRequest {
    pub url: String,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Full-record edit payload.
///
/// A key left out of the JSON body keeps the stored value; a key set to null
/// clears it. Management clients are expected to send the complete intended
/// state, `thumbnail_url` included, on every edit.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateContentRequest {
    #[serde(deserialize_with = "double_option")]
    pub filename: Option<Option<String>>,
    pub url: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub alt_text: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub thumbnail_url: Option<Option<String>>,
}

impl From<UpdateContentRequest> for db::ContentUpdate {
    fn from(request: UpdateContentRequest) -> Self {
        db::ContentUpdate {
            filename: request.filename,
            url: request.url,
            alt_text: request.alt_text,
            title: request.title,
            description: request.description,
            category: request.category,
            thumbnail_url: request.thumbnail_url,
        }
    }
}

// distinguishes "key absent" (outer None) from "key: null" (Some(None))
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: String,
}

impl From<db::CommentRecord> for Comment {
    fn from(record: db::CommentRecord) -> Self {
        Comment {
            id: record.id.to_string(),
            name: record.name,
            content: record.content,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

// management view, includes the commenter email and moderation state
#[derive(Debug, Clone, Serialize)]
pub struct CommentDetail {
    pub id: String,
    pub name: String,
    pub email: String,
    pub content: String,
    pub approved: bool,
    pub created_at: String,
}

impl From<db::CommentRecord> for CommentDetail {
    fn from(record: db::CommentRecord) -> Self {
        CommentDetail {
            id: record.id.to_string(),
            name: record.name,
            email: record.email,
            content: record.content,
            approved: record.approved,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub name: String,
    pub email: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record() -> db::ContentRecord {
        db::ContentRecord {
            id: Uuid::new_v4(),
            filename: None,
            url: "https://youtube.com/watch?v=abc".to_string(),
            alt_text: None,
            title: Some("Test".to_string()),
            description: None,
            category: None,
            thumbnail_url: Some("https://example/thumb.jpg".to_string()),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn content_conversion_carries_kind_and_thumbnail() {
        let source = record();
        let created_at = source.created_at;

        let content = Content::from(source);
        assert_eq!(content.kind, "external");
        assert_eq!(
            content.thumbnail_url.as_deref(),
            Some("https://example/thumb.jpg")
        );
        assert_eq!(content.created_at, created_at.to_rfc3339());
    }

    #[test]
    fn uploaded_record_converts_to_uploaded_kind() {
        let mut source = record();
        source.filename = Some("clip.mp4".to_string());

        let content = Content::from(source);
        assert_eq!(content.kind, "uploaded");
    }

    #[test]
    fn omitted_update_key_means_unchanged() {
        let request: UpdateContentRequest =
            serde_json::from_str(r#"{"title": "Renamed"}"#).expect("Failed to parse payload");

        assert_eq!(request.title, Some(Some("Renamed".to_string())));
        assert_eq!(request.thumbnail_url, None);
        assert_eq!(request.url, None);
    }

    #[test]
    fn null_update_key_means_clear() {
        let request: UpdateContentRequest =
            serde_json::from_str(r#"{"thumbnail_url": null}"#).expect("Failed to parse payload");

        assert_eq!(request.thumbnail_url, Some(None));
        assert_eq!(request.title, None);
    }

    #[test]
    fn full_state_payload_carries_every_field() {
        let request: UpdateContentRequest = serde_json::from_str(
            r#"{
                "filename": null,
                "url": "https://youtube.com/watch?v=abc",
                "alt_text": null,
                "title": "Renamed",
                "description": "Updated",
                "category": "talks",
                "thumbnail_url": "https://example/thumb.jpg"
            }"#,
        )
        .expect("Failed to parse payload");

        let changes = db::ContentUpdate::from(request);
        assert!(!changes.is_noop());
        assert_eq!(
            changes.thumbnail_url,
            Some(Some("https://example/thumb.jpg".to_string()))
        );
        assert_eq!(changes.filename, Some(None));
    }
}
