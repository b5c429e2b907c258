//! keepsake-core - Core library for Keepsake
//!
//! A small shared album, a notes board and a scripted proposal letter. This
//! crate holds the models, the document/object store and identity
//! boundaries with their backends, the confirmation-first sync layer, the
//! proposal sequencer and the presentation helpers used by front ends.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod proposal;
pub mod routes;
pub mod services;
pub mod store;
pub mod sync;
pub mod ui;
pub mod util;

pub use error::{Error, Result};
pub use models::{Comment, CommentId, Note, NoteId, Photo, PhotoId};
pub use services::Backend;
