#![forbid(unsafe_code)]

//! Minimal UI toolkit surface: tappable buttons.

use std::fmt;

use rxmap_reactive::{Property, Stream, Subject};

/// A push button. Taps on a disabled button are ignored.
#[derive(Clone)]
pub struct Button {
    title: String,
    taps: Subject<()>,
    enabled: Property<bool>,
}

impl Button {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            taps: Subject::named(format!("{title}.tap")),
            enabled: Property::new(format!("{title}.enabled"), true),
            title,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn taps(&self) -> Stream<()> {
        self.taps.stream()
    }

    pub fn enabled(&self) -> &Property<bool> {
        &self.enabled
    }

    /// Simulate a tap. Returns whether it was delivered.
    pub fn tap(&self) -> bool {
        if !self.enabled.get() {
            #[cfg(feature = "tracing")]
            tracing::debug!(button = %self.title, "tap on disabled button ignored");
            return false;
        }
        self.taps.next(());
        true
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.taps.subscriber_count() + self.enabled.subscriber_count()
    }
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("title", &self.title)
            .field("enabled", &self.enabled.get())
            .finish()
    }
}
