use std::env;
use std::sync::Arc;

use chrono::Utc;
use keepsake_core::auth::{AuthUser, Session};
use keepsake_core::config::BackendConfig;
use keepsake_core::routes::{self, Resolution, Route};
use keepsake_core::sync::{AutoConfirm, Confirm};
use keepsake_core::{Backend, Note, Photo};
use serde::Serialize;

use crate::config_profiles::{default_data_dir, CliProfile, CliProfilesConfig};
use crate::error::CliError;
use crate::prompts::StdinConfirm;
use crate::session_store::KeychainSessionStore;

/// Everything a command needs once the profile is resolved.
pub struct CommandContext {
    pub profile_name: String,
    pub backend: Backend,
    pub session: Session,
}

pub async fn open_context(global_profile: Option<&str>) -> Result<CommandContext, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let backend_config = backend_config_for(&profile_name, &profile, |key| env::var(key).ok())?;

    let persistence = Arc::new(KeychainSessionStore::new(&profile_name));
    let backend = Backend::open(&backend_config, persistence).await?;
    let session = backend.start_session().await?;
    tracing::debug!(profile = %profile_name, backend = %backend_config.kind(), "Opened backend");

    Ok(CommandContext {
        profile_name,
        backend,
        session,
    })
}

/// Environment first, then the profile, then the per-profile data directory.
pub fn backend_config_for(
    profile_name: &str,
    profile: &CliProfile,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<BackendConfig, CliError> {
    let data_dir = default_data_dir(profile_name).map_err(CliError::Config)?;
    Ok(BackendConfig::from_lookup(
        |key| env_lookup(key).or_else(|| profile.lookup(key)),
        &data_dir,
    )?)
}

/// Apply the route gate for `route`, returning the signed-in user.
pub fn require_page(route: Route, session: &Session) -> Result<AuthUser, CliError> {
    match routes::resolve(route.path(), session.is_active()) {
        Resolution::Show(_) => Ok(session.require()?),
        Resolution::RedirectToLogin { requested } => {
            Err(CliError::SignInRequired { page: requested })
        }
    }
}

pub fn confirmer(skip_prompt: bool) -> Box<dyn Confirm> {
    if skip_prompt {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinConfirm)
    }
}

/// Resolve a full id or a unique prefix among `ids`.
pub fn resolve_id<'a>(
    kind: &'static str,
    query: &str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<String, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::EmptyId { kind });
    }

    let matching = ids
        .into_iter()
        .filter(|id| id.starts_with(query))
        .collect::<Vec<_>>();
    if let Some(exact) = matching.iter().find(|id| **id == query) {
        return Ok((*exact).to_string());
    }

    match matching.as_slice() {
        [] => Err(CliError::NotFound {
            kind,
            query: query.to_string(),
        }),
        [only] => Ok((*only).to_string()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|id| id.chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentListItem {
    pub id: String,
    pub author: String,
    pub text: String,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct PhotoListItem {
    pub id: String,
    pub caption: String,
    pub src: String,
    pub created_at: i64,
    pub relative_time: String,
    pub comments: Vec<CommentListItem>,
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: Option<String>,
    pub author: String,
    pub message: String,
    pub date: String,
    pub edited: bool,
    pub created_at: i64,
    pub relative_time: String,
}

pub fn photo_to_list_item(photo: &Photo, now_ms: i64) -> PhotoListItem {
    PhotoListItem {
        id: photo.id.to_string(),
        caption: photo.display_caption().to_string(),
        src: photo.src.clone(),
        created_at: photo.created_at,
        relative_time: format_relative_time(photo.created_at, now_ms),
        comments: photo
            .comments
            .iter()
            .map(|comment| CommentListItem {
                id: comment.id.to_string(),
                author: comment.author.clone(),
                text: comment.text.clone(),
                date: comment.date.clone(),
            })
            .collect(),
    }
}

pub fn note_to_list_item(note: &Note, now_ms: i64) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        author: note.author.clone(),
        message: note.message.clone(),
        date: note.date.clone(),
        edited: note.is_edited(),
        created_at: note.created_at,
        relative_time: format_relative_time(note.created_at, now_ms),
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
