//! Note model

use serde::{Deserialize, Serialize};

use super::required_field;
use crate::store::Document;
use crate::util::normalize_text_option;
use crate::Result;

/// Suffix appended to a note's date when it is edited
pub const EDITED_MARKER: &str = " (Edited)";

document_id!(
    /// Store-assigned identifier of a note document
    NoteId
);

/// Stored body of a note document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    pub author: String,
    pub message: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Display date, e.g. `October 17, 2026` or `October 18, 2026 (Edited)`
    pub date: String,
}

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub author: String,
    pub message: String,
    pub title: Option<String>,
    pub date: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Note {
    pub fn from_document(document: &Document) -> Result<Self> {
        let fields: NoteFields = document.decode()?;
        Ok(Self::from_fields(
            NoteId::new(document.id.clone()),
            document.created_at,
            fields,
        ))
    }

    pub(crate) fn from_fields(id: NoteId, created_at: i64, fields: NoteFields) -> Self {
        Self {
            id,
            author: fields.author,
            message: fields.message,
            title: fields.title,
            date: fields.date,
            created_at,
        }
    }

    /// Check whether the note has been edited since creation
    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.date.ends_with(EDITED_MARKER)
    }

    /// Get first line of the message, truncated to `max_len` characters
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        self.message
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }

    pub(crate) fn apply(&mut self, fields: NoteFields) {
        self.author = fields.author;
        self.message = fields.message;
        self.title = fields.title;
        self.date = fields.date;
    }
}

/// Note form input
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub author: String,
    pub message: String,
    pub title: Option<String>,
}

impl NoteDraft {
    pub fn new(author: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Draft pre-filled from an existing note, for editing.
    pub fn from_note(note: &Note) -> Self {
        Self {
            author: note.author.clone(),
            message: note.message.clone(),
            title: note.title.clone(),
        }
    }

    /// Body of a freshly created note dated `today`.
    pub fn fields(&self, today: &str) -> Result<NoteFields> {
        Ok(NoteFields {
            author: required_field(&self.author, "author")?,
            message: required_field(&self.message, "message")?,
            title: normalize_text_option(self.title.clone()),
            date: today.to_string(),
        })
    }

    /// Body of an edited note: same as [`Self::fields`] with the edited marker.
    pub fn edited_fields(&self, today: &str) -> Result<NoteFields> {
        self.fields(&format!("{today}{EDITED_MARKER}"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Error;

    #[test]
    fn edited_fields_mark_the_date() {
        let fields = NoteDraft::new("Sam", "Hello there")
            .edited_fields("October 17, 2026")
            .unwrap();
        assert_eq!(fields.date, "October 17, 2026 (Edited)");
    }

    #[test]
    fn blank_title_is_dropped() {
        let fields = NoteDraft::new("Sam", "Hello")
            .with_title("  ")
            .fields("October 17, 2026")
            .unwrap();
        assert_eq!(fields.title, None);
    }

    #[test]
    fn author_and_message_are_required() {
        assert!(matches!(
            NoteDraft::new("", "Hello").fields("today"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            NoteDraft::new("Sam", "   ").fields("today"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn preview_and_edited_flag() {
        let mut note = Note::from_fields(
            NoteId::from("n1"),
            1,
            NoteDraft::new("Sam", "First line\nSecond line")
                .fields("October 1, 2026")
                .unwrap(),
        );
        assert_eq!(note.preview(5), "First");
        assert!(!note.is_edited());

        note.apply(
            NoteDraft::from_note(&note)
                .edited_fields("October 2, 2026")
                .unwrap(),
        );
        assert!(note.is_edited());
        assert_eq!(note.message, "First line\nSecond line");
    }

    #[test]
    fn ids_parse_trimmed_and_reject_blank() {
        let id: NoteId = "  n1 \n".parse().unwrap();
        assert_eq!(id.as_str(), "n1");
        assert!(matches!(" ".parse::<NoteId>(), Err(Error::Validation(_))));
    }
}
