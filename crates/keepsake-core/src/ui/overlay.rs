//! Dismissible modal overlay state.

/// Input reaching an open overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent<'a> {
    /// A key press, named like DOM key values (`"Escape"`, `"Enter"`, ...)
    Key(&'a str),
    /// Click on the dimmed area around the content
    BackdropClick,
    /// Click anywhere inside the content box
    ContentClick,
    CloseButton,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlaySize {
    Small,
    Medium,
    #[default]
    Large,
    ExtraLarge,
}

impl OverlaySize {
    /// Maximum content width in columns when rendered in a terminal.
    pub const fn max_width(self) -> usize {
        match self {
            Self::Small => 40,
            Self::Medium => 56,
            Self::Large => 72,
            Self::ExtraLarge => 96,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    is_open: bool,
    title: Option<String>,
    size: OverlaySize,
}

impl Overlay {
    pub fn new(title: Option<String>, size: OverlaySize) -> Self {
        Self {
            is_open: false,
            title,
            size,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub const fn size(&self) -> OverlaySize {
        self.size
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    /// Apply an event. Returns `true` if it dismissed the overlay.
    pub fn handle(&mut self, event: OverlayEvent<'_>) -> bool {
        if !self.is_open {
            return false;
        }
        let dismiss = match event {
            OverlayEvent::Key(key) => key == "Escape",
            OverlayEvent::BackdropClick | OverlayEvent::CloseButton => true,
            OverlayEvent::ContentClick => false,
        };
        if dismiss {
            self.close();
        }
        dismiss
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> Overlay {
        let mut overlay = Overlay::new(Some("Add a memory".to_string()), OverlaySize::default());
        overlay.open();
        overlay
    }

    #[test]
    fn escape_backdrop_and_close_button_dismiss() {
        for event in [
            OverlayEvent::Key("Escape"),
            OverlayEvent::BackdropClick,
            OverlayEvent::CloseButton,
        ] {
            let mut overlay = opened();
            assert!(overlay.handle(event), "{event:?} should dismiss");
            assert!(!overlay.is_open());
        }
    }

    #[test]
    fn clicks_inside_and_other_keys_keep_it_open() {
        let mut overlay = opened();
        assert!(!overlay.handle(OverlayEvent::ContentClick));
        assert!(!overlay.handle(OverlayEvent::Key("Enter")));
        assert!(overlay.is_open());
        assert_eq!(overlay.title(), Some("Add a memory"));
    }

    #[test]
    fn closed_overlay_ignores_events() {
        let mut overlay = Overlay::default();
        assert!(!overlay.handle(OverlayEvent::Key("Escape")));
        assert_eq!(overlay.size().max_width(), 72);
    }
}
