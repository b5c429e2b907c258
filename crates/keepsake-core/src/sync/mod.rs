//! Confirmation-first synchronization between local state and the stores.
//!
//! Local collections change only after the remote call they depend on has
//! succeeded. Each sync object tracks its latest mutation as a
//! [`MutationState`]; failures are logged, reported through a [`Notifier`]
//! and returned, leaving local state as it was.

mod gallery;
mod notes;
mod retry;

use std::fmt;

pub use self::gallery::{GallerySync, COMMENTS_COLLECTION, PHOTOS_COLLECTION};
pub use self::notes::{NotesSync, NOTES_COLLECTION};
pub use self::retry::RetryPolicy;

use crate::Error;

/// A user-triggered remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreatePhoto,
    DeletePhoto,
    AddComment,
    EditComment,
    DeleteComment,
    CreateNote,
    UpdateNote,
    DeleteNote,
}

impl Operation {
    /// Alert text shown when the operation fails remotely.
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::CreatePhoto => "Failed to upload photo.",
            Self::DeletePhoto => "Failed to delete photo. It may have already been removed.",
            Self::AddComment => "Failed to add comment.",
            Self::EditComment => "Failed to save comment.",
            Self::DeleteComment => "Failed to delete comment.",
            Self::CreateNote => "Failed to save note.",
            Self::UpdateNote => "Failed to update note.",
            Self::DeleteNote => "Failed to delete note.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreatePhoto => "create photo",
            Self::DeletePhoto => "delete photo",
            Self::AddComment => "add comment",
            Self::EditComment => "edit comment",
            Self::DeleteComment => "delete comment",
            Self::CreateNote => "create note",
            Self::UpdateNote => "update note",
            Self::DeleteNote => "delete note",
        };
        f.write_str(name)
    }
}

/// State of the most recent mutation: `Idle → Submitting → {Committed, Failed}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationState {
    #[default]
    Idle,
    Submitting(Operation),
    Committed(Operation),
    /// Terminal until the user triggers the action again
    Failed {
        operation: Operation,
        message: String,
    },
}

impl MutationState {
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting(_))
    }
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The document existed and was removed
    Deleted,
    /// The document was already gone remotely; local state is now in step
    AlreadyGone,
    /// The user declined the confirmation; nothing was sent
    Declined,
}

/// Blocking user-facing alert.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Blocking yes/no prompt.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Notifier that only logs; for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Confirm that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Drives one sync object's [`MutationState`].
#[derive(Debug, Default)]
pub(crate) struct MutationTracker {
    state: MutationState,
}

impl MutationTracker {
    pub(crate) const fn state(&self) -> &MutationState {
        &self.state
    }

    pub(crate) fn begin(&mut self, operation: Operation) {
        tracing::debug!("Submitting {operation}");
        self.state = MutationState::Submitting(operation);
    }

    pub(crate) fn commit(&mut self) {
        if let MutationState::Submitting(operation) = self.state {
            tracing::info!("Committed {operation}");
            self.state = MutationState::Committed(operation);
        }
    }

    /// Record a remote failure, alert the user and hand the error back.
    pub(crate) fn fail(&mut self, notifier: &dyn Notifier, error: Error) -> Error {
        if let MutationState::Submitting(operation) = self.state {
            tracing::error!("Failed to {operation}: {error}");
            notifier.alert(operation.failure_message());
            self.state = MutationState::Failed {
                operation,
                message: error.to_string(),
            };
        }
        error
    }
}

/// Reject input before any remote call, alerting the user with `hint`.
pub(crate) fn rejected(notifier: &dyn Notifier, hint: &str, error: Error) -> Error {
    if matches!(error, Error::Validation(_)) {
        tracing::debug!("Rejected input: {error}");
        notifier.alert(hint);
    }
    error
}
