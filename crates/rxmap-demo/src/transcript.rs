#![forbid(unsafe_code)]

//! Ordered record of what the screen logged.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

/// Shared, append-only list of log lines. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Rc<RefCell<Vec<String>>>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and emit it as an `info` event.
    pub fn record(&self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "rxmap_demo::transcript", "{line}");
        self.lines.borrow_mut().push(line);
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }

    #[must_use]
    pub fn contains(&self, line: &str) -> bool {
        self.lines.borrow().iter().any(|l| l == line)
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_lines() {
        let transcript = Transcript::new();
        let writer = transcript.clone();
        writer.record("Did tap my location button");
        writer.record(String::from("Snapshot ready"));

        assert_eq!(transcript.len(), 2);
        assert!(transcript.contains("Snapshot ready"));
        assert_eq!(
            transcript.take(),
            vec!["Did tap my location button", "Snapshot ready"]
        );
        assert!(writer.is_empty());
    }
}
