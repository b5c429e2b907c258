//! Character-by-character text reveal.

use std::str::CharIndices;
use std::time::Duration;

/// A text revealed one character at a time on a fixed delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typewriter {
    text: String,
    delay: Duration,
}

impl Typewriter {
    pub fn new(text: impl Into<String>, delay: Duration) -> Self {
        Self {
            text: text.into(),
            delay,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of frames, one per character.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Time until the whole text is visible.
    pub fn total_duration(&self) -> Duration {
        self.delay
            .saturating_mul(u32::try_from(self.len()).unwrap_or(u32::MAX))
    }

    /// Visible prefixes, shortest first. Each call starts over.
    pub fn frames(&self) -> Frames<'_> {
        Frames {
            text: &self.text,
            chars: self.text.char_indices(),
        }
    }

    /// Emit each frame after waiting `delay`, ending with the full text.
    pub async fn play<F>(&self, mut on_frame: F)
    where
        F: FnMut(&str),
    {
        for frame in self.frames() {
            tokio::time::sleep(self.delay).await;
            on_frame(frame);
        }
    }
}

/// Lazy iterator over the visible prefixes of a [`Typewriter`].
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    text: &'a str,
    chars: CharIndices<'a>,
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, ch) = self.chars.next()?;
        Some(&self.text[..start + ch.len_utf8()])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chars.size_hint()
    }
}
