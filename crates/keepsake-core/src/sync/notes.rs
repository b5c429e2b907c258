//! Notes board sync.

use std::sync::Arc;

use chrono::Local;

use super::{
    rejected, Confirm, DeleteOutcome, MutationState, MutationTracker, Notifier, Operation,
    RetryPolicy,
};
use crate::models::{Note, NoteDraft, NoteId};
use crate::store::{encode_fields, Direction, DocumentStore, CREATED_AT};
use crate::util::long_display_date;
use crate::{Error, Result};

pub const NOTES_COLLECTION: &str = "notes";

const ALERT_NOTE_FORM: &str = "Please fill in at least your name and a message!";
const CONFIRM_DELETE_NOTE: &str = "Are you sure you want to delete this sweet note?";

/// Local notes, newest first, kept in step with the document store.
pub struct NotesSync {
    documents: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    notes: Vec<Note>,
    mutation: MutationTracker,
}

impl NotesSync {
    pub fn new(documents: Arc<dyn DocumentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            documents,
            notifier,
            retry: RetryPolicy::default(),
            notes: Vec::new(),
            mutation: MutationTracker::default(),
        }
    }

    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    pub const fn last_mutation(&self) -> &MutationState {
        self.mutation.state()
    }

    /// Replace local state with every note in the store.
    ///
    /// On failure the local collection is left empty and the error returned.
    pub async fn load(&mut self) -> Result<usize> {
        let listed = self
            .retry
            .run("list notes", || {
                self.documents
                    .list_ordered(NOTES_COLLECTION, CREATED_AT, Direction::Descending)
            })
            .await;

        match listed {
            Ok(documents) => {
                self.notes = documents
                    .iter()
                    .filter_map(|document| {
                        Note::from_document(document)
                            .map_err(|error| {
                                tracing::warn!(
                                    id = %document.id,
                                    "Skipping malformed note: {error}"
                                );
                            })
                            .ok()
                    })
                    .collect();
                Ok(self.notes.len())
            }
            Err(error) => {
                tracing::error!("Failed to load notes: {error}");
                self.notes.clear();
                Err(error)
            }
        }
    }

    pub async fn create_note(&mut self, draft: &NoteDraft) -> Result<NoteId> {
        let fields = draft
            .fields(&long_display_date(Local::now()))
            .map_err(|error| rejected(self.notifier.as_ref(), ALERT_NOTE_FORM, error))?;
        let body = encode_fields(&fields)?;

        self.mutation.begin(Operation::CreateNote);
        match self.documents.insert(NOTES_COLLECTION, body).await {
            Ok(reference) => {
                let note =
                    Note::from_fields(NoteId::new(reference.id), reference.created_at, fields);
                let id = note.id.clone();
                self.notes.insert(0, note);
                self.mutation.commit();
                Ok(id)
            }
            Err(error) => Err(self.mutation.fail(self.notifier.as_ref(), error)),
        }
    }

    /// Rewrite a note in place; its date becomes today's, marked edited.
    pub async fn update_note(&mut self, id: &NoteId, draft: &NoteDraft) -> Result<()> {
        let fields = draft
            .edited_fields(&long_display_date(Local::now()))
            .map_err(|error| rejected(self.notifier.as_ref(), ALERT_NOTE_FORM, error))?;
        let index = self
            .notes
            .iter()
            .position(|note| &note.id == id)
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
        let patch = encode_fields(&fields)?;

        self.mutation.begin(Operation::UpdateNote);
        match self
            .retry
            .run("update note", || {
                self.documents
                    .replace_fields(NOTES_COLLECTION, id.as_str(), patch.clone())
            })
            .await
        {
            Ok(()) => {
                self.notes[index].apply(fields);
                self.mutation.commit();
                Ok(())
            }
            Err(error) => Err(self.mutation.fail(self.notifier.as_ref(), error)),
        }
    }

    /// Delete a note after confirmation.
    ///
    /// A note already removed elsewhere counts as deleted; the local filter is
    /// then a no-op when it was never loaded here.
    pub async fn delete_note(
        &mut self,
        id: &NoteId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome> {
        if !confirm.confirm(CONFIRM_DELETE_NOTE) {
            return Ok(DeleteOutcome::Declined);
        }

        self.mutation.begin(Operation::DeleteNote);
        let outcome = match self
            .retry
            .run("delete note", || {
                self.documents.remove(NOTES_COLLECTION, id.as_str())
            })
            .await
        {
            Ok(()) => DeleteOutcome::Deleted,
            Err(Error::NotFound(_)) => {
                tracing::info!(note = %id, "Note was already removed");
                DeleteOutcome::AlreadyGone
            }
            Err(error) => return Err(self.mutation.fail(self.notifier.as_ref(), error)),
        };

        self.notes.retain(|note| &note.id != id);
        self.mutation.commit();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::EDITED_MARKER;
    use crate::store::MemoryDocumentStore;
    use crate::sync::testing::{CountingConfirm, RecordingNotifier};
    use crate::sync::AutoConfirm;

    fn setup() -> (Arc<MemoryDocumentStore>, Arc<RecordingNotifier>, NotesSync) {
        let documents = Arc::new(MemoryDocumentStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let notes = NotesSync::new(documents.clone(), notifier.clone())
            .with_retry_policy(RetryPolicy::single_attempt());
        (documents, notifier, notes)
    }

    #[tokio::test]
    async fn create_prepends_with_store_id() {
        let (documents, _, mut notes) = setup();
        notes
            .create_note(&NoteDraft::new("Sam", "older"))
            .await
            .unwrap();
        let id = notes
            .create_note(&NoteDraft::new("Alex", "newer").with_title("Hi"))
            .await
            .unwrap();

        assert_eq!(notes.notes()[0].id, id);
        assert_eq!(notes.notes()[0].title.as_deref(), Some("Hi"));
        assert!(!notes.notes()[0].is_edited());
        assert_eq!(documents.count(NOTES_COLLECTION).await, 2);
    }

    #[tokio::test]
    async fn missing_author_is_rejected_before_any_write() {
        let (documents, notifier, mut notes) = setup();
        let result = notes.create_note(&NoteDraft::new("  ", "hello")).await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(documents.count(NOTES_COLLECTION).await, 0);
        assert_eq!(notifier.alerts(), vec![ALERT_NOTE_FORM.to_string()]);
    }

    #[tokio::test]
    async fn update_marks_the_note_edited_remotely_and_locally() {
        let (documents, _, mut notes) = setup();
        let id = notes
            .create_note(&NoteDraft::new("Sam", "hello"))
            .await
            .unwrap();

        notes
            .update_note(&id, &NoteDraft::new("Sam", "hello again"))
            .await
            .unwrap();

        let local = notes.note(&id).unwrap();
        assert_eq!(local.message, "hello again");
        assert!(local.date.ends_with(EDITED_MARKER));

        let mut reader = NotesSync::new(documents, Arc::new(RecordingNotifier::default()));
        reader.load().await.unwrap();
        assert_eq!(reader.note(&id).unwrap(), local);
    }

    #[tokio::test]
    async fn failed_update_keeps_local_note() {
        let (documents, notifier, mut notes) = setup();
        let id = notes
            .create_note(&NoteDraft::new("Sam", "hello"))
            .await
            .unwrap();
        documents.fail_next_writes(1);

        assert!(notes
            .update_note(&id, &NoteDraft::new("Sam", "changed"))
            .await
            .is_err());
        assert_eq!(notes.note(&id).unwrap().message, "hello");
        assert_eq!(
            notifier.alerts(),
            vec![Operation::UpdateNote.failure_message().to_string()]
        );
    }

    #[tokio::test]
    async fn deleting_a_note_removed_elsewhere_is_a_no_op() {
        let (documents, _, mut notes) = setup();
        let id = notes
            .create_note(&NoteDraft::new("Sam", "hello"))
            .await
            .unwrap();
        let mut other = NotesSync::new(documents.clone(), Arc::new(RecordingNotifier::default()));
        other.load().await.unwrap();
        other.delete_note(&id, &AutoConfirm(true)).await.unwrap();

        let confirm = CountingConfirm::default();
        let outcome = other.delete_note(&id, &confirm).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyGone);
        assert_eq!(confirm.prompts.lock().unwrap().len(), 1);

        let outcome = notes.delete_note(&id, &AutoConfirm(true)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyGone);
        assert!(notes.notes().is_empty());
        assert_eq!(
            notes.last_mutation(),
            &MutationState::Committed(Operation::DeleteNote)
        );
    }

    #[tokio::test]
    async fn declined_delete_keeps_the_note() {
        let (documents, _, mut notes) = setup();
        let id = notes
            .create_note(&NoteDraft::new("Sam", "hello"))
            .await
            .unwrap();

        let outcome = notes.delete_note(&id, &AutoConfirm(false)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(notes.notes().len(), 1);
        assert_eq!(documents.count(NOTES_COLLECTION).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn load_retries_then_orders_newest_first() {
        let (documents, notifier, mut writer) = setup();
        let first = writer
            .create_note(&NoteDraft::new("Sam", "one"))
            .await
            .unwrap();
        let second = writer
            .create_note(&NoteDraft::new("Sam", "two"))
            .await
            .unwrap();

        let mut reader = NotesSync::new(documents.clone(), notifier);
        documents.fail_next_lists(1);
        assert_eq!(reader.load().await.unwrap(), 2);
        let ids = reader.notes().iter().map(|note| note.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids, vec![second, first]);
    }
}
