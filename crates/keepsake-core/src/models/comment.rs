//! Comment model
//!
//! Each comment is its own document in the `photo_comments` collection,
//! linked to its photo by `photoId`.

use serde::{Deserialize, Serialize};

use super::{required_field, PhotoId};
use crate::store::Document;
use crate::Result;

document_id!(
    /// Store-assigned identifier of a comment document
    CommentId
);

/// Stored body of a comment document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentFields {
    pub photo_id: PhotoId,
    pub author: String,
    pub text: String,
    /// Display date, e.g. `Oct 17, 2026`
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub photo_id: PhotoId,
    pub author: String,
    pub text: String,
    pub date: String,
    /// Creation timestamp (Unix ms), orders comments within a photo
    pub created_at: i64,
}

impl Comment {
    pub fn from_document(document: &Document) -> Result<Self> {
        let fields: CommentFields = document.decode()?;
        Ok(Self::from_fields(
            CommentId::new(document.id.clone()),
            document.created_at,
            fields,
        ))
    }

    pub(crate) fn from_fields(id: CommentId, created_at: i64, fields: CommentFields) -> Self {
        Self {
            id,
            photo_id: fields.photo_id,
            author: fields.author,
            text: fields.text,
            date: fields.date,
            created_at,
        }
    }
}

/// Comment form input
#[derive(Debug, Clone, Default)]
pub struct CommentDraft {
    pub author: String,
    pub text: String,
}

impl CommentDraft {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Stored body for this draft; author and text must be non-blank.
    pub fn fields(&self, photo_id: &PhotoId, date: String) -> Result<CommentFields> {
        Ok(CommentFields {
            photo_id: photo_id.clone(),
            author: required_field(&self.author, "author")?,
            text: required_field(&self.text, "comment text")?,
            date,
        })
    }
}
