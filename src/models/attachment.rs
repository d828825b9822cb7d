use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A file attached to a note, either an inline image or a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,
    pub name: String,
    /// MIME type, e.g. `image/png`.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

impl Attachment {
    /// Returns `true` if the attachment can be shown inline as an image.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample(mime_type: &str) -> Attachment {
        Attachment {
            id: 7,
            name: "diagram.png".to_string(),
            mime_type: mime_type.to_string(),
            size: 2048,
            url: "https://files.example/diagram.png".to_string(),
            uploaded_at: datetime!(2024-01-15 10:30:00 UTC),
        }
    }

    #[test]
    fn is_image_checks_mime_prefix() {
        assert!(sample("image/png").is_image());
        assert!(!sample("application/pdf").is_image());
    }

    #[test]
    fn wire_format_uses_type_key() {
        let json = serde_json::to_value(sample("image/png")).unwrap();
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["uploadedAt"], "2024-01-15T10:30:00Z");
    }
}
