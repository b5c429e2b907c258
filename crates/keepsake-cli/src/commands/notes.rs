use std::sync::Arc;

use keepsake_core::models::{NoteDraft, NoteId};
use keepsake_core::routes::Route;
use keepsake_core::sync::NotesSync;
use keepsake_core::ui::render_note_card;
use keepsake_core::Note;

use crate::cli::NotesCommands;
use crate::commands::common::{
    confirmer, note_to_list_item, now_ms, open_context, require_page, resolve_id, NoteListItem,
};
use crate::commands::gallery::print_delete_outcome;
use crate::error::CliError;
use crate::prompts::StderrNotifier;

pub async fn run_notes(
    command: NotesCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = open_context(global_profile).await?;
    require_page(Route::Notes, &context.session)?;

    let mut notes = context.backend.notes(Arc::new(StderrNotifier));
    notes.load().await?;

    match command {
        NotesCommands::List { json } => list_notes(&notes, json)?,
        NotesCommands::Add {
            author,
            message,
            title,
        } => {
            let mut draft = NoteDraft::new(author, message);
            draft.title = title;
            let id = notes.create_note(&draft).await?;
            println!("{id}");
        }
        NotesCommands::Edit {
            id,
            author,
            message,
            title,
        } => {
            let id = resolve_note(&notes, &id)?;
            let current = notes.note(&id).ok_or_else(|| CliError::NotFound {
                kind: "note",
                query: id.to_string(),
            })?;
            let draft = edited_draft(current, author, message, title);
            notes.update_note(&id, &draft).await?;
            println!("Updated note {id}");
        }
        NotesCommands::Delete { id, yes } => {
            let id = resolve_note(&notes, &id)?;
            let outcome = notes.delete_note(&id, confirmer(yes).as_ref()).await?;
            print_delete_outcome("note", id.as_str(), outcome);
        }
    }

    Ok(())
}

fn list_notes(notes: &NotesSync, as_json: bool) -> Result<(), CliError> {
    if as_json {
        let now = now_ms();
        let items = notes
            .notes()
            .iter()
            .map(|note| note_to_list_item(note, now))
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if notes.notes().is_empty() {
        println!("No notes yet.");
    } else {
        for note in notes.notes() {
            println!("{}", render_note_card(note));
        }
    }
    Ok(())
}

/// Start from the note as stored and overlay the fields given on the command line.
pub fn edited_draft(
    current: &Note,
    author: Option<String>,
    message: Option<String>,
    title: Option<String>,
) -> NoteDraft {
    let mut draft = NoteDraft::from_note(current);
    if let Some(author) = author {
        draft.author = author;
    }
    if let Some(message) = message {
        draft.message = message;
    }
    if let Some(title) = title {
        draft.title = Some(title);
    }
    draft
}

fn resolve_note(notes: &NotesSync, query: &str) -> Result<NoteId, CliError> {
    let ids = notes.notes().iter().map(|note| note.id.as_str());
    resolve_id("note", query, ids).map(NoteId::new)
}
