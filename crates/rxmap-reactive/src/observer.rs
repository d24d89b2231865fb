#![forbid(unsafe_code)]

//! Notifications and the observers that consume them.
//!
//! An observer follows the usual grammar: any number of `Next` followed by
//! at most one `Error` or `Completed`. Once a terminal notification has been
//! delivered the observer ignores everything that follows.

use tracing::warn;

use crate::error::StreamError;

/// One occurrence delivered to an observer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
    Next(T),
    Error(StreamError),
    Completed,
}

impl<T> Notification<T> {
    /// `true` for `Error` and `Completed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }

    /// Transform the payload of a `Next`, passing terminals through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Notification<U> {
        match self {
            Self::Next(value) => Notification::Next(f(value)),
            Self::Error(err) => Notification::Error(err),
            Self::Completed => Notification::Completed,
        }
    }
}

/// Receiving end of a stream.
pub struct Observer<T> {
    sink: Box<dyn FnMut(Notification<T>)>,
    stopped: bool,
}

impl<T: 'static> Observer<T> {
    /// Build an observer from a single notification handler.
    pub fn from_fn(sink: impl FnMut(Notification<T>) + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            stopped: false,
        }
    }

    /// Observer that only handles values. Errors are logged, completion is
    /// ignored.
    pub fn new(mut on_next: impl FnMut(T) + 'static) -> Self {
        Self::from_fn(move |notification| match notification {
            Notification::Next(value) => on_next(value),
            Notification::Error(err) => warn!(error = %err, "unhandled stream error"),
            Notification::Completed => {}
        })
    }

    /// Observer with value and error handlers.
    pub fn with_error(
        mut on_next: impl FnMut(T) + 'static,
        mut on_error: impl FnMut(StreamError) + 'static,
    ) -> Self {
        Self::from_fn(move |notification| match notification {
            Notification::Next(value) => on_next(value),
            Notification::Error(err) => on_error(err),
            Notification::Completed => {}
        })
    }

    /// Observer with all three handlers.
    pub fn with_handlers(
        mut on_next: impl FnMut(T) + 'static,
        mut on_error: impl FnMut(StreamError) + 'static,
        mut on_completed: impl FnMut() + 'static,
    ) -> Self {
        Self::from_fn(move |notification| match notification {
            Notification::Next(value) => on_next(value),
            Notification::Error(err) => on_error(err),
            Notification::Completed => on_completed(),
        })
    }

    pub fn notify(&mut self, notification: Notification<T>) {
        if self.stopped {
            return;
        }
        if notification.is_terminal() {
            self.stopped = true;
        }
        (self.sink)(notification);
    }

    pub fn next(&mut self, value: T) {
        self.notify(Notification::Next(value));
    }

    pub fn error(&mut self, err: StreamError) {
        self.notify(Notification::Error(err));
    }

    pub fn complete(&mut self) {
        self.notify(Notification::Completed);
    }

    /// `true` after a terminal notification was delivered.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl<T> std::fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording() -> (Observer<i32>, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let observer = Observer::with_handlers(
            move |v| a.borrow_mut().push(format!("next {v}")),
            move |e| b.borrow_mut().push(format!("error {e}")),
            move || c.borrow_mut().push("completed".into()),
        );
        (observer, log)
    }

    #[test]
    fn nothing_after_completed() {
        let (mut observer, log) = recording();
        observer.next(1);
        observer.complete();
        observer.next(2);
        observer.error(StreamError::Source("late".into()));

        assert!(observer.is_stopped());
        assert_eq!(*log.borrow(), vec!["next 1", "completed"]);
    }

    #[test]
    fn nothing_after_error() {
        let (mut observer, log) = recording();
        observer.error(StreamError::Source("boom".into()));
        observer.complete();

        assert_eq!(*log.borrow(), vec!["error source failed: boom"]);
    }

    #[test]
    fn notification_map_keeps_terminals() {
        let n: Notification<i32> = Notification::Next(2);
        assert_eq!(n.map(|v| v * 10), Notification::Next(20));

        let done: Notification<i32> = Notification::Completed;
        assert_eq!(done.map(|v| v * 10), Notification::<i32>::Completed);
        assert!(Notification::<()>::Completed.is_terminal());
    }
}
