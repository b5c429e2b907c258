//! Data models for Keepsake

/// Declares a string-backed document identifier newtype.
///
/// Identifiers are assigned by the document store, so they are opaque
/// strings rather than parsed UUIDs.
macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a store-assigned identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(crate::Error::Validation(format!(
                        "{} cannot be empty",
                        stringify!($name)
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

mod comment;
mod note;
mod photo;

pub use comment::{Comment, CommentDraft, CommentFields, CommentId};
pub use note::{Note, NoteDraft, NoteFields, NoteId, EDITED_MARKER};
pub use photo::{InlineComment, Photo, PhotoDraft, PhotoFields, PhotoId, DEFAULT_ALT_TEXT};

/// Trim a required form field, rejecting whitespace-only values.
pub(crate) fn required_field(value: &str, label: &str) -> crate::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(crate::Error::Validation(format!("{label} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}
