use std::path::Path;
use std::sync::Arc;

use keepsake_core::models::{CommentDraft, CommentId, PhotoDraft, PhotoId};
use keepsake_core::routes::Route;
use keepsake_core::sync::{DeleteOutcome, GallerySync};
use keepsake_core::ui::render_photo_card;

use crate::cli::{CommentCommands, GalleryCommands};
use crate::commands::common::{
    confirmer, now_ms, open_context, photo_to_list_item, require_page, resolve_id, PhotoListItem,
};
use crate::error::CliError;
use crate::prompts::StderrNotifier;

pub async fn run_gallery(
    command: GalleryCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = open_context(global_profile).await?;
    require_page(Route::Gallery, &context.session)?;

    let mut gallery = context.backend.gallery(Arc::new(StderrNotifier));
    gallery.load().await?;

    match command {
        GalleryCommands::List { json } => list_photos(&gallery, json),
        GalleryCommands::Add { file, caption } => add_photo(&mut gallery, &file, caption).await,
        GalleryCommands::Delete { id, yes } => {
            let id = resolve_photo(&gallery, &id)?;
            let outcome = gallery.delete_photo(&id, confirmer(yes).as_ref()).await?;
            print_delete_outcome("photo", &id.to_string(), outcome);
            Ok(())
        }
        GalleryCommands::Comment { command } => run_comment(&mut gallery, command).await,
    }
}

fn list_photos(gallery: &GallerySync, as_json: bool) -> Result<(), CliError> {
    if as_json {
        let now = now_ms();
        let items = gallery
            .photos()
            .iter()
            .map(|photo| photo_to_list_item(photo, now))
            .collect::<Vec<PhotoListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if gallery.photos().is_empty() {
        println!("No photos yet.");
    } else {
        for photo in gallery.photos() {
            println!("{}", render_photo_card(photo));
        }
    }
    Ok(())
}

async fn add_photo(
    gallery: &mut GallerySync,
    file: &Path,
    caption: Option<String>,
) -> Result<(), CliError> {
    let bytes = std::fs::read(file)?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let id = gallery
        .create_photo(PhotoDraft::new(bytes, file_name, caption))
        .await?;
    println!("{id}");
    Ok(())
}

async fn run_comment(gallery: &mut GallerySync, command: CommentCommands) -> Result<(), CliError> {
    match command {
        CommentCommands::Add {
            photo,
            author,
            text,
        } => {
            let photo_id = resolve_photo(gallery, &photo)?;
            let id = gallery
                .add_comment(&photo_id, &CommentDraft::new(author, text))
                .await?;
            println!("{id}");
        }
        CommentCommands::Edit {
            photo,
            comment,
            text,
        } => {
            let photo_id = resolve_photo(gallery, &photo)?;
            let comment_id = resolve_comment(gallery, &photo_id, &comment)?;
            if gallery.edit_comment(&photo_id, &comment_id, &text).await? {
                println!("Updated comment {comment_id}");
            } else {
                println!("Comment {comment_id} unchanged");
            }
        }
        CommentCommands::Delete { photo, comment } => {
            let photo_id = resolve_photo(gallery, &photo)?;
            let comment_id = resolve_comment(gallery, &photo_id, &comment)?;
            let outcome = gallery.delete_comment(&photo_id, &comment_id).await?;
            print_delete_outcome("comment", comment_id.as_str(), outcome);
        }
    }
    Ok(())
}

fn resolve_photo(gallery: &GallerySync, query: &str) -> Result<PhotoId, CliError> {
    let ids = gallery.photos().iter().map(|photo| photo.id.as_str());
    resolve_id("photo", query, ids).map(PhotoId::new)
}

fn resolve_comment(
    gallery: &GallerySync,
    photo_id: &PhotoId,
    query: &str,
) -> Result<CommentId, CliError> {
    let comments = gallery
        .photo(photo_id)
        .map(|photo| photo.comments.as_slice())
        .unwrap_or_default();
    let ids = comments.iter().map(|comment| comment.id.as_str());
    resolve_id("comment", query, ids).map(CommentId::new)
}

pub fn print_delete_outcome(kind: &str, id: &str, outcome: DeleteOutcome) {
    match outcome {
        DeleteOutcome::Deleted => println!("Deleted {kind} {id}"),
        DeleteOutcome::AlreadyGone => println!("The {kind} {id} was already removed"),
        DeleteOutcome::Declined => println!("Kept {kind} {id}"),
    }
}
