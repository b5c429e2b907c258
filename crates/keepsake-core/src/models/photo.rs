//! Photo model

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use super::{Comment, CommentId};
use crate::store::Document;
use crate::util::normalize_text_option;
use crate::{Error, Result};

/// Alt text used when a photo is added without a caption
pub const DEFAULT_ALT_TEXT: &str = "A beautiful new memory";

document_id!(
    /// Store-assigned identifier of a photo document
    PhotoId
);

/// Stored body of a photo document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoFields {
    /// Retrieval URL of the image blob
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// Object store key of the image blob, absent on documents that predate it
    #[serde(default)]
    pub image_key: Option<String>,
    /// Comments embedded in older photo documents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<InlineComment>,
}

/// Comment stored inside its photo document rather than in its own collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineComment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub date: String,
}

impl InlineComment {
    fn into_comment(self, photo_id: &PhotoId, created_at: i64) -> Comment {
        Comment {
            id: CommentId::new(self.id),
            photo_id: photo_id.clone(),
            author: self.author,
            text: self.text,
            date: self.date,
            created_at,
        }
    }
}

/// A photo with its comments, as held in local state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub src: String,
    pub alt: String,
    pub caption: Option<String>,
    pub image_key: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Comments in insertion order
    pub comments: Vec<Comment>,
}

impl Photo {
    /// Build a photo from its document.
    ///
    /// Only comments embedded in the document are included; the comment
    /// collection is merged in by the caller.
    pub fn from_document(document: &Document) -> Result<Self> {
        let fields: PhotoFields = document.decode()?;
        Ok(Self::from_fields(
            PhotoId::new(document.id.clone()),
            document.created_at,
            fields,
        ))
    }

    pub(crate) fn from_fields(id: PhotoId, created_at: i64, fields: PhotoFields) -> Self {
        let comments = fields
            .comments
            .into_iter()
            .map(|comment| comment.into_comment(&id, created_at))
            .collect();
        Self {
            id,
            src: fields.src,
            alt: fields.alt,
            caption: fields.caption,
            image_key: fields.image_key,
            created_at,
            comments,
        }
    }

    pub fn comment(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| &comment.id == id)
    }

    /// Text shown under the image: the caption, else the alt text.
    pub fn display_caption(&self) -> &str {
        self.caption.as_deref().unwrap_or(&self.alt)
    }
}

/// A photo the user wants to add
#[derive(Debug, Clone)]
pub struct PhotoDraft {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// Original file name, used to build the object key
    pub file_name: String,
    pub caption: Option<String>,
}

impl PhotoDraft {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            caption,
        }
    }

    /// Check the payload is a recognised image and return its format.
    pub fn validate(&self) -> Result<ImageFormat> {
        if self.bytes.is_empty() {
            return Err(Error::Validation("image file is empty".to_string()));
        }
        image::guess_format(&self.bytes).map_err(|_| {
            Error::Validation(format!("{} is not a supported image", self.file_name))
        })
    }

    /// Stored body for this draft once its blob is uploaded.
    pub fn fields(&self, src: String, image_key: String) -> PhotoFields {
        let caption = normalize_text_option(self.caption.clone());
        PhotoFields {
            src,
            alt: caption
                .clone()
                .unwrap_or_else(|| DEFAULT_ALT_TEXT.to_string()),
            caption,
            image_key: Some(image_key),
            comments: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::store::encode_fields;

    /// Smallest valid PNG header; enough for format sniffing.
    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn draft_validation() {
        let empty = PhotoDraft::new(Vec::new(), "a.png", None);
        assert!(matches!(empty.validate(), Err(Error::Validation(_))));

        let text = PhotoDraft::new(b"hello".to_vec(), "a.txt", None);
        assert!(matches!(text.validate(), Err(Error::Validation(_))));

        let png = PhotoDraft::new(PNG_BYTES.to_vec(), "a.png", None);
        assert_eq!(png.validate().unwrap(), ImageFormat::Png);
    }

    #[test]
    fn fields_default_alt_text_without_caption() {
        let draft = PhotoDraft::new(PNG_BYTES.to_vec(), "a.png", Some("   ".to_string()));
        let fields = draft.fields("memory://k".to_string(), "k".to_string());
        assert_eq!(fields.alt, DEFAULT_ALT_TEXT);
        assert_eq!(fields.caption, None);

        let draft = PhotoDraft::new(PNG_BYTES.to_vec(), "a.png", Some("Beach".to_string()));
        let fields = draft.fields("memory://k".to_string(), "k".to_string());
        assert_eq!(fields.alt, "Beach");
        assert_eq!(fields.caption.as_deref(), Some("Beach"));
    }

    #[test]
    fn fields_use_camel_case_keys() {
        let fields = PhotoFields {
            src: "https://cdn/x.png".to_string(),
            alt: "x".to_string(),
            caption: None,
            image_key: Some("images/x.png".to_string()),
            comments: Vec::new(),
        };
        assert_eq!(
            encode_fields(&fields).unwrap(),
            encode_fields(&json!({
                "src": "https://cdn/x.png",
                "alt": "x",
                "caption": null,
                "imageKey": "images/x.png"
            }))
            .unwrap()
        );
    }

    #[test]
    fn from_document_tolerates_legacy_bodies() {
        let document = Document {
            id: "p1".to_string(),
            created_at: 7,
            fields: encode_fields(&json!({"src": "https://cdn/old.jpg", "comments": []})).unwrap(),
        };
        let photo = Photo::from_document(&document).unwrap();
        assert_eq!(photo.id.as_str(), "p1");
        assert_eq!(photo.created_at, 7);
        assert_eq!(photo.image_key, None);
        assert!(photo.comments.is_empty());
    }

    #[test]
    fn from_document_keeps_embedded_comments() {
        let document = Document {
            id: "p1".to_string(),
            created_at: 7,
            fields: encode_fields(&json!({
                "src": "https://cdn/old.jpg",
                "alt": "Old",
                "comments": [
                    {"id": "1700000000000", "author": "Sam", "text": "So sweet", "date": "Nov 14, 2023"},
                    {"text": "No author"}
                ]
            }))
            .unwrap(),
        };
        let photo = Photo::from_document(&document).unwrap();
        assert_eq!(photo.comments.len(), 2);

        let first = &photo.comments[0];
        assert_eq!(first.id.as_str(), "1700000000000");
        assert_eq!(first.photo_id, photo.id);
        assert_eq!(first.author, "Sam");
        assert_eq!(first.date, "Nov 14, 2023");
        assert_eq!(first.created_at, 7);
        assert_eq!(photo.comments[1].text, "No author");
        assert_eq!(photo.comments[1].author, "");
    }
}
