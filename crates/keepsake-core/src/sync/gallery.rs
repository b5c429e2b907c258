//! Photo gallery sync: photos, their image blobs and their comments.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use serde_json::Value;

use super::{
    rejected, Confirm, DeleteOutcome, MutationState, MutationTracker, Notifier, Operation,
    RetryPolicy,
};
use crate::models::{required_field, Comment, CommentDraft, CommentId, Photo, PhotoDraft, PhotoId};
use crate::store::{
    build_image_key, encode_fields, Direction, DocumentStore, Fields, ObjectStore, CREATED_AT,
};
use crate::util::short_display_date;
use crate::{Error, Result};

pub const PHOTOS_COLLECTION: &str = "photos";
/// One document per comment, linked to its photo by `photoId`
pub const COMMENTS_COLLECTION: &str = "photo_comments";

const ALERT_NO_IMAGE: &str = "Please select an image file.";
const ALERT_COMMENT_FORM: &str = "Please enter your name and a comment.";
const CONFIRM_DELETE_PHOTO: &str =
    "Are you sure you want to delete this photo? This action cannot be undone.";

/// Local photo collection, newest first, kept in step with the stores.
pub struct GallerySync {
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    photos: Vec<Photo>,
    mutation: MutationTracker,
}

impl GallerySync {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            documents,
            objects,
            notifier,
            retry: RetryPolicy::default(),
            photos: Vec::new(),
            mutation: MutationTracker::default(),
        }
    }

    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Photos, newest first
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn photo(&self, id: &PhotoId) -> Option<&Photo> {
        self.photos.iter().find(|photo| &photo.id == id)
    }

    pub const fn last_mutation(&self) -> &MutationState {
        self.mutation.state()
    }

    /// Replace local state with every photo and comment in the store.
    ///
    /// On failure the local collection is left empty and the error returned.
    pub async fn load(&mut self) -> Result<usize> {
        match self.fetch().await {
            Ok(photos) => {
                tracing::debug!("Loaded {} photos", photos.len());
                self.photos = photos;
                Ok(self.photos.len())
            }
            Err(error) => {
                tracing::error!("Failed to load photos: {error}");
                self.photos.clear();
                Err(error)
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<Photo>> {
        let photo_documents = self
            .retry
            .run("list photos", || {
                self.documents
                    .list_ordered(PHOTOS_COLLECTION, CREATED_AT, Direction::Descending)
            })
            .await?;
        let comment_documents = self
            .retry
            .run("list comments", || {
                self.documents
                    .list_ordered(COMMENTS_COLLECTION, CREATED_AT, Direction::Ascending)
            })
            .await?;

        let mut comments: HashMap<PhotoId, Vec<Comment>> = HashMap::new();
        for document in &comment_documents {
            match Comment::from_document(document) {
                Ok(comment) => comments
                    .entry(comment.photo_id.clone())
                    .or_default()
                    .push(comment),
                Err(error) => {
                    tracing::warn!(id = %document.id, "Skipping malformed comment: {error}");
                }
            }
        }

        Ok(photo_documents
            .iter()
            .filter_map(|document| match Photo::from_document(document) {
                Ok(mut photo) => {
                    if !photo.comments.is_empty() {
                        tracing::debug!(
                            id = %photo.id,
                            count = photo.comments.len(),
                            "Photo document carries embedded comments"
                        );
                    }
                    if let Some(found) = comments.remove(&photo.id) {
                        photo.comments.extend(found);
                    }
                    Some(photo)
                }
                Err(error) => {
                    tracing::warn!(id = %document.id, "Skipping malformed photo: {error}");
                    None
                }
            })
            .collect())
    }

    /// Upload an image, record it, and prepend it locally.
    ///
    /// Single attempt: a failure is reported and the user decides whether to
    /// try again.
    pub async fn create_photo(&mut self, draft: PhotoDraft) -> Result<PhotoId> {
        let format = draft
            .validate()
            .map_err(|error| rejected(self.notifier.as_ref(), ALERT_NO_IMAGE, error))?;

        self.mutation.begin(Operation::CreatePhoto);
        let key = build_image_key(&draft.file_name);
        match self.submit_photo(&draft, &key, format.to_mime_type()).await {
            Ok(photo) => {
                let id = photo.id.clone();
                self.photos.insert(0, photo);
                self.mutation.commit();
                Ok(id)
            }
            Err(error) => Err(self.mutation.fail(self.notifier.as_ref(), error)),
        }
    }

    async fn submit_photo(
        &self,
        draft: &PhotoDraft,
        key: &str,
        content_type: &str,
    ) -> Result<Photo> {
        self.objects
            .upload(key, &draft.bytes, Some(content_type))
            .await?;

        let stored: Result<Photo> = async {
            let src = self
                .retry
                .run("resolve image url", || self.objects.resolve_url(key))
                .await?;
            let fields = draft.fields(src, key.to_string());
            let reference = self
                .documents
                .insert(PHOTOS_COLLECTION, encode_fields(&fields)?)
                .await?;
            Ok(Photo::from_fields(
                PhotoId::new(reference.id),
                reference.created_at,
                fields,
            ))
        }
        .await;

        if stored.is_err() {
            self.remove_blob(key).await;
        }
        stored
    }

    /// Delete a photo after confirmation, then clean up its blob and comments.
    ///
    /// The photo leaves local state as soon as its document is gone; cleanup
    /// failures are only logged.
    pub async fn delete_photo(
        &mut self,
        id: &PhotoId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome> {
        if !confirm.confirm(CONFIRM_DELETE_PHOTO) {
            return Ok(DeleteOutcome::Declined);
        }

        self.mutation.begin(Operation::DeletePhoto);
        let outcome = match self
            .retry
            .run("delete photo", || {
                self.documents.remove(PHOTOS_COLLECTION, id.as_str())
            })
            .await
        {
            Ok(()) => DeleteOutcome::Deleted,
            Err(Error::NotFound(_)) => {
                tracing::info!(photo = %id, "Photo was already removed");
                DeleteOutcome::AlreadyGone
            }
            Err(error) => return Err(self.mutation.fail(self.notifier.as_ref(), error)),
        };

        let removed = self
            .photos
            .iter()
            .position(|photo| &photo.id == id)
            .map(|index| self.photos.remove(index));
        match removed.as_ref().map(|photo| photo.image_key.as_deref()) {
            Some(Some(key)) => self.remove_blob(key).await,
            Some(None) => tracing::warn!(photo = %id, "Photo has no image key; blob left in place"),
            None => {}
        }
        self.remove_comments_of(id).await;

        self.mutation.commit();
        Ok(outcome)
    }

    async fn remove_blob(&self, key: &str) {
        match self
            .retry
            .run("delete image", || self.objects.remove(key))
            .await
        {
            Ok(()) | Err(Error::NotFound(_)) => {}
            Err(error) => tracing::warn!("Failed to delete image {key}: {error}"),
        }
    }

    async fn remove_comments_of(&self, photo_id: &PhotoId) {
        let documents = match self
            .retry
            .run("list comments", || {
                self.documents
                    .list_ordered(COMMENTS_COLLECTION, CREATED_AT, Direction::Ascending)
            })
            .await
        {
            Ok(documents) => documents,
            Err(error) => {
                tracing::warn!(photo = %photo_id, "Failed to list comments for cleanup: {error}");
                return;
            }
        };

        let owned = documents.iter().filter(|document| {
            document.fields.get("photoId").and_then(Value::as_str) == Some(photo_id.as_str())
        });
        for document in owned {
            match self
                .retry
                .run("delete comment", || {
                    self.documents.remove(COMMENTS_COLLECTION, &document.id)
                })
                .await
            {
                Ok(()) | Err(Error::NotFound(_)) => {}
                Err(error) => {
                    tracing::warn!(
                        comment = %document.id,
                        "Failed to delete orphaned comment: {error}"
                    );
                }
            }
        }
    }

    /// Append a comment to a photo.
    pub async fn add_comment(
        &mut self,
        photo_id: &PhotoId,
        draft: &CommentDraft,
    ) -> Result<CommentId> {
        let fields = draft
            .fields(photo_id, short_display_date(Local::now()))
            .map_err(|error| rejected(self.notifier.as_ref(), ALERT_COMMENT_FORM, error))?;
        let index = self.photo_index(photo_id)?;
        let body = encode_fields(&fields)?;

        self.mutation.begin(Operation::AddComment);
        match self.documents.insert(COMMENTS_COLLECTION, body).await {
            Ok(reference) => {
                let comment = Comment::from_fields(
                    CommentId::new(reference.id),
                    reference.created_at,
                    fields,
                );
                let id = comment.id.clone();
                self.photos[index].comments.push(comment);
                self.mutation.commit();
                Ok(id)
            }
            Err(error) => Err(self.mutation.fail(self.notifier.as_ref(), error)),
        }
    }

    /// Replace a comment's text, stamping today's date.
    ///
    /// Returns `false` without touching the store when the text is unchanged.
    pub async fn edit_comment(
        &mut self,
        photo_id: &PhotoId,
        comment_id: &CommentId,
        text: &str,
    ) -> Result<bool> {
        let text = required_field(text, "comment text")
            .map_err(|error| rejected(self.notifier.as_ref(), ALERT_COMMENT_FORM, error))?;
        let (photo_index, comment_index) = self.comment_position(photo_id, comment_id)?;
        if self.photos[photo_index].comments[comment_index].text == text {
            tracing::debug!(comment = %comment_id, "Comment text unchanged, nothing to save");
            return Ok(false);
        }

        let date = short_display_date(Local::now());
        let mut patch = Fields::new();
        patch.insert("text".to_string(), Value::String(text.clone()));
        patch.insert("date".to_string(), Value::String(date.clone()));

        self.mutation.begin(Operation::EditComment);
        match self
            .retry
            .run("edit comment", || {
                self.documents
                    .replace_fields(COMMENTS_COLLECTION, comment_id.as_str(), patch.clone())
            })
            .await
        {
            Ok(()) => {
                let comment = &mut self.photos[photo_index].comments[comment_index];
                comment.text = text;
                comment.date = date;
                self.mutation.commit();
                Ok(true)
            }
            Err(error) => Err(self.mutation.fail(self.notifier.as_ref(), error)),
        }
    }

    pub async fn delete_comment(
        &mut self,
        photo_id: &PhotoId,
        comment_id: &CommentId,
    ) -> Result<DeleteOutcome> {
        let (photo_index, comment_index) = self.comment_position(photo_id, comment_id)?;

        self.mutation.begin(Operation::DeleteComment);
        let outcome = match self
            .retry
            .run("delete comment", || {
                self.documents.remove(COMMENTS_COLLECTION, comment_id.as_str())
            })
            .await
        {
            Ok(()) => DeleteOutcome::Deleted,
            Err(Error::NotFound(_)) => DeleteOutcome::AlreadyGone,
            Err(error) => return Err(self.mutation.fail(self.notifier.as_ref(), error)),
        };

        self.photos[photo_index].comments.remove(comment_index);
        self.mutation.commit();
        Ok(outcome)
    }

    fn photo_index(&self, photo_id: &PhotoId) -> Result<usize> {
        self.photos
            .iter()
            .position(|photo| &photo.id == photo_id)
            .ok_or_else(|| Error::NotFound(format!("photo {photo_id}")))
    }

    fn comment_position(
        &self,
        photo_id: &PhotoId,
        comment_id: &CommentId,
    ) -> Result<(usize, usize)> {
        let photo_index = self.photo_index(photo_id)?;
        let comment_index = self.photos[photo_index]
            .comments
            .iter()
            .position(|comment| &comment.id == comment_id)
            .ok_or_else(|| Error::NotFound(format!("comment {comment_id}")))?;
        Ok((photo_index, comment_index))
    }
}
