//! Presentation helpers shared by front ends.
//!
//! Nothing here touches the stores; these types only shape what is shown.

mod cards;
mod overlay;
mod typewriter;

pub use self::cards::{render_note_card, render_photo_card, truncate_chars, NOTE_FALLBACK_TITLE};
pub use self::overlay::{Overlay, OverlayEvent, OverlaySize};
pub use self::typewriter::{Frames, Typewriter};
