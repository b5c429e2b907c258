//! Plain-text photo and note cards.

use std::fmt::Write as _;

use crate::models::{Note, Photo};

/// Heading used when a note has no title.
pub const NOTE_FALLBACK_TITLE: &str = "A Sweet Note";

/// Collapse whitespace and cut to `max_chars`, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut truncated = collapsed
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    truncated.push_str("...");
    truncated
}

pub fn render_photo_card(photo: &Photo) -> String {
    let mut card = format!("[{}] {}\n  {}\n", photo.id, photo.display_caption(), photo.src);
    if photo.comments.is_empty() {
        card.push_str("  No comments yet.\n");
    }
    for comment in &photo.comments {
        let _ = writeln!(
            card,
            "  - {} ({}): {}",
            comment.author,
            comment.date,
            truncate_chars(&comment.text, 60)
        );
    }
    card
}

pub fn render_note_card(note: &Note) -> String {
    let title = note.title.as_deref().unwrap_or(NOTE_FALLBACK_TITLE);
    let mut card = format!("[{}] {title}  {}\nFrom: {}\n", note.id, note.date, note.author);
    for line in note.message.lines() {
        let _ = writeln!(card, "  {line}");
    }
    card
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{Comment, CommentId, NoteId, PhotoId};

    fn photo() -> Photo {
        Photo {
            id: PhotoId::new("p1"),
            src: "https://img.example/p1.png".to_string(),
            alt: "A beautiful new memory".to_string(),
            caption: None,
            image_key: None,
            created_at: 1,
            comments: Vec::new(),
        }
    }

    #[test]
    fn photo_card_falls_back_to_alt_text() {
        assert_eq!(
            render_photo_card(&photo()),
            "[p1] A beautiful new memory\n  https://img.example/p1.png\n  No comments yet.\n"
        );
    }

    #[test]
    fn photo_card_lists_comments_in_order() {
        let mut photo = photo();
        photo.caption = Some("Our special day!".to_string());
        photo.comments.push(Comment {
            id: CommentId::new("c1"),
            photo_id: photo.id.clone(),
            author: "Sam".to_string(),
            text: "so   cute".to_string(),
            date: "Oct 17, 2026".to_string(),
            created_at: 2,
        });

        let card = render_photo_card(&photo);
        assert!(card.starts_with("[p1] Our special day!\n"));
        assert!(card.ends_with("  - Sam (Oct 17, 2026): so cute\n"));
    }

    #[test]
    fn note_card_uses_fallback_title() {
        let note = Note {
            id: NoteId::new("n1"),
            author: "Alex".to_string(),
            message: "line one\nline two".to_string(),
            title: None,
            date: "October 17, 2026 (Edited)".to_string(),
            created_at: 1,
        };
        assert_eq!(
            render_note_card(&note),
            "[n1] A Sweet Note  October 17, 2026 (Edited)\nFrom: Alex\n  line one\n  line two\n"
        );
    }

    #[test]
    fn truncation_is_character_aware() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("💌💌💌💌💌💌", 5), "💌💌...");
    }
}
