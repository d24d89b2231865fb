#![forbid(unsafe_code)]

//! Disposal scopes: one teardown hook for everything a screen wired up.
//!
//! A [`Scope`] owns the subscriptions added to it and releases all of them,
//! in insertion order, when [`Scope::dispose`] runs or the scope is dropped.
//! Bindings made through [`Scope::bind`] report setter failures on the
//! scope's error channel instead of panicking or dropping them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{BindError, StreamError};
use crate::observer::{Notification, Observer};
use crate::operators::Link;
use crate::stream::Stream;
use crate::subject::Subject;
use crate::subscription::{Subscription, SubscriptionHandle};

#[derive(Clone)]
struct ErrorChannel {
    scope: Rc<str>,
    log: Rc<RefCell<Vec<StreamError>>>,
    subject: Subject<StreamError>,
}

impl ErrorChannel {
    fn report(&self, error: StreamError) {
        warn!(scope = %self.scope, %error, "scope error");
        self.log.borrow_mut().push(error.clone());
        self.subject.next(error);
    }
}

/// Owner of a group of subscriptions with a single teardown hook.
pub struct Scope {
    name: Rc<str>,
    subscriptions: RefCell<Vec<Subscription>>,
    disposed: Cell<bool>,
    errors: ErrorChannel,
}

impl Scope {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name: Rc<str> = Rc::from(name.into());
        Self {
            errors: ErrorChannel {
                scope: Rc::clone(&name),
                log: Rc::new(RefCell::new(Vec::new())),
                subject: Subject::named(format!("{name}.errors")),
            },
            name,
            subscriptions: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take ownership of `subscription`. On a disposed scope it is released
    /// immediately.
    pub fn add(&self, subscription: Subscription) {
        if self.disposed.get() {
            debug!(scope = %self.name, "add after dispose; releasing");
            subscription.dispose();
            return;
        }
        self.subscriptions.borrow_mut().push(subscription);
    }

    /// Subscribe `handler` for the lifetime of the scope. Stream errors go
    /// to the error channel.
    pub fn subscribe<T: Clone + 'static>(
        &self,
        stream: &Stream<T>,
        handler: impl FnMut(T) + 'static,
    ) -> SubscriptionHandle {
        let channel = self.errors.clone();
        let subscription =
            stream.subscribe_with(Observer::with_error(handler, move |err| channel.report(err)));
        let handle = subscription.handle();
        self.add(subscription);
        handle
    }

    /// One-way binding from `stream` to `setter`.
    ///
    /// A rejected value is reported as [`StreamError::BindTarget`] and ends
    /// this binding; other bindings of the scope stay live.
    pub fn bind<T: Clone + 'static>(
        &self,
        stream: &Stream<T>,
        mut setter: impl FnMut(T) -> Result<(), BindError> + 'static,
    ) -> SubscriptionHandle {
        let channel = self.errors.clone();
        let link = Link::new();
        let guard = Rc::clone(&link);
        let slot: Rc<RefCell<Option<SubscriptionHandle>>> = Rc::new(RefCell::new(None));
        let own = Rc::clone(&slot);
        let upstream = stream.subscribe_with(Observer::from_fn(move |notification: Notification<T>| {
            if guard.is_finished() {
                return;
            }
            match notification {
                Notification::Next(value) => {
                    if let Err(err) = setter(value) {
                        channel.report(StreamError::BindTarget(err));
                        guard.finish();
                        if let Some(handle) = own.borrow().as_ref() {
                            handle.dispose();
                        }
                    }
                }
                Notification::Error(err) => channel.report(err),
                Notification::Completed => {}
            }
        }));
        let subscription = link.attach(upstream);
        let handle = subscription.handle();
        *slot.borrow_mut() = Some(handle.clone());
        self.add(subscription);
        handle
    }

    /// Errors reported from now on.
    #[must_use]
    pub fn errors(&self) -> Stream<StreamError> {
        self.errors.subject.stream()
    }

    /// Drain every error reported so far.
    pub fn take_errors(&self) -> Vec<StreamError> {
        std::mem::take(&mut *self.errors.log.borrow_mut())
    }

    /// Number of owned subscriptions, disposed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.borrow().is_empty()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Release every owned subscription in insertion order. Returns how many
    /// were still active; a second call returns 0.
    pub fn dispose(&self) -> usize {
        if self.disposed.replace(true) {
            return 0;
        }
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        let released = subscriptions.iter().filter(|sub| sub.dispose()).count();
        debug!(scope = %self.name, released, "scope disposed");
        released
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("subscriptions", &self.len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;

    #[test]
    fn dispose_releases_in_insertion_order() {
        let scope = Scope::new("screen");
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            scope.add(Subscription::new(move || order.borrow_mut().push(tag)));
        }

        assert_eq!(scope.dispose(), 3);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
        assert!(scope.is_empty());
    }

    #[test]
    fn dispose_is_idempotent() {
        let scope = Scope::new("screen");
        let runs = Rc::new(Cell::new(0));
        let runs_clone = Rc::clone(&runs);
        scope.add(Subscription::new(move || runs_clone.set(runs_clone.get() + 1)));

        assert_eq!(scope.dispose(), 1);
        assert_eq!(scope.dispose(), 0);
        drop(scope);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn already_disposed_members_are_not_counted() {
        let scope = Scope::new("screen");
        let sub = Subscription::new(|| {});
        let handle = sub.handle();
        scope.add(sub);
        scope.add(Subscription::new(|| {}));

        handle.dispose();
        assert_eq!(scope.dispose(), 1);
    }

    #[test]
    fn add_after_dispose_releases_immediately() {
        let scope = Scope::new("screen");
        scope.dispose();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = Rc::clone(&runs);
        scope.add(Subscription::new(move || runs_clone.set(runs_clone.get() + 1)));
        assert_eq!(runs.get(), 1);
        assert!(scope.is_empty());
    }

    #[test]
    fn drop_tears_down() {
        let source: Subject<i32> = Subject::new();
        {
            let scope = Scope::new("screen");
            scope.subscribe(&source.stream(), |_| {});
            assert_eq!(source.subscriber_count(), 1);
        }
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn no_handler_runs_after_dispose() {
        let scope = Scope::new("screen");
        let source = Subject::new();
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        scope.subscribe(&source.stream(), move |_: i32| seen_clone.set(seen_clone.get() + 1));

        source.next(1);
        scope.dispose();
        source.next(2);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn bind_writes_target() {
        let scope = Scope::new("screen");
        let taps: Subject<()> = Subject::new();
        let enabled = Property::new("enabled", false);
        scope.bind(&taps.stream().map(|()| true), enabled.setter());

        taps.next(());
        assert!(enabled.get());
        assert!(scope.take_errors().is_empty());
    }

    #[test]
    fn bind_failure_reported_and_binding_released() {
        let scope = Scope::new("screen");
        let source = Subject::new();
        let zoom = Property::new("zoom", 12).with_validator(|z| {
            if *z <= 21 { Ok(()) } else { Err("too far".into()) }
        });
        let mirror = Property::new("mirror", 0);
        let failing = scope.bind(&source.stream(), zoom.setter());
        let sibling = scope.bind(&source.stream(), mirror.setter());

        let reported = Rc::new(RefCell::new(Vec::new()));
        let reported_clone = Rc::clone(&reported);
        let _watch = scope
            .errors()
            .subscribe(move |err| reported_clone.borrow_mut().push(err));

        source.next(30);
        source.next(14);

        assert_eq!(zoom.get(), 12);
        assert_eq!(mirror.get(), 14);
        assert!(failing.is_disposed());
        assert!(!sibling.is_disposed());

        let errors = scope.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            StreamError::BindTarget(err) if err.target() == "zoom"
        ));
        assert_eq!(reported.borrow().len(), 1);
        assert!(scope.take_errors().is_empty());
    }

    #[test]
    fn bind_failure_on_replayed_value() {
        let scope = Scope::new("screen");
        let source = Subject::new().replay_latest();
        source.next(-1);
        let positive = Property::new("positive", 1).with_validator(|v| {
            if *v > 0 { Ok(()) } else { Err("not positive".into()) }
        });
        let handle = scope.bind(&source.stream(), positive.setter());

        assert!(handle.is_disposed());
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(scope.take_errors().len(), 1);
    }

    #[test]
    fn subscribe_routes_stream_errors_to_channel() {
        let scope = Scope::new("screen");
        let source: Subject<i32> = Subject::new();
        let checked = source
            .stream()
            .try_map(|v| if v > 0 { Ok(v) } else { Err("negative") });
        scope.subscribe(&checked, |_| {});

        source.next(-5);
        assert!(matches!(
            scope.take_errors().as_slice(),
            [StreamError::Transform { operator: "try_map", .. }]
        ));
    }

    #[test]
    fn debug_reports_counts() {
        let scope = Scope::new("screen");
        scope.add(Subscription::new(|| {}));
        let dbg = format!("{scope:?}");
        assert!(dbg.contains("screen"));
        assert!(dbg.contains("subscriptions: 1"));
    }
}
