//! Channel message types

use serde::{Deserialize, Serialize};

/// A single post in the channel, as returned by a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier, unique and increasing with arrival order
    pub id: i64,
    /// Text body (caption or standalone note)
    #[serde(default)]
    pub text: Option<String>,
    /// Attached media, if any
    #[serde(default)]
    pub media: Option<MediaDescriptor>,
}

impl Message {
    /// Create a text-only message
    pub fn text(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: Some(text.into()),
            media: None,
        }
    }

    /// Create a message carrying media
    pub fn media(id: i64, media: MediaDescriptor) -> Self {
        Self {
            id,
            text: None,
            media: Some(media),
        }
    }

    /// Attach a caption
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Metadata of an attached media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Declared MIME type
    pub mime_type: String,
    /// Total size in bytes
    pub size: u64,
    /// Original file name
    #[serde(default)]
    pub file_name: Option<String>,
    /// Connector-specific handle used to download the bytes
    pub location: String,
}

impl MediaDescriptor {
    pub fn new(mime_type: impl Into<String>, size: u64, location: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            size,
            file_name: None,
            location: location.into(),
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_message() {
        let msg: Message = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(msg.id, 7);
        assert!(msg.text.is_none());
        assert!(msg.media.is_none());
    }

    #[test]
    fn test_deserialize_media_message() {
        let msg: Message = serde_json::from_str(
            r#"{"id": 3, "media": {"mime_type": "video/mp4", "size": 1000, "location": "a.mp4"}}"#,
        )
        .unwrap();
        let media = msg.media.unwrap();
        assert!(media.is_video());
        assert_eq!(media.size, 1000);
        assert!(media.file_name.is_none());
    }

    #[test]
    fn test_is_video() {
        assert!(MediaDescriptor::new("video/x-matroska", 1, "x").is_video());
        assert!(!MediaDescriptor::new("application/pdf", 1, "x").is_video());
        assert!(!MediaDescriptor::new("audio/mpeg", 1, "x").is_video());
    }
}
