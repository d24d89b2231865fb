#![forbid(unsafe_code)]

//! Deferred multicast: `publish()` + `connect()`.
//!
//! Building a [`Connectable`] and subscribing to it has no effect on the
//! upstream source. Only [`Connectable::connect`] subscribes upstream, once,
//! and every downstream subscriber observes the same emissions from then on.
//! This is how a one-time side effect is gated behind the first occurrence of
//! an event without triggering it while the graph is being wired up.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::observer::{Notification, Observer};
use crate::stream::{Operator, Stream};
use crate::subject::Subject;
use crate::subscription::{Subscription, SubscriptionHandle};

/// A multicast stream whose upstream subscription waits for `connect()`.
pub struct Connectable<T> {
    source: Stream<T>,
    relay: Subject<T>,
    connection: Rc<RefCell<Option<SubscriptionHandle>>>,
}

impl<T> Clone for Connectable<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            relay: self.relay.clone(),
            connection: Rc::clone(&self.connection),
        }
    }
}

impl<T> fmt::Debug for Connectable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connectable")
            .field("source", &self.source)
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

/// Multicast `source`, deferring its subscription until `connect()`.
pub fn publish<T: Clone + 'static>(source: &Stream<T>) -> Connectable<T> {
    Connectable {
        source: source.clone(),
        relay: Subject::new(),
        connection: Rc::new(RefCell::new(None)),
    }
}

impl<T: Clone + 'static> Connectable<T> {
    /// The shared downstream side.
    #[must_use]
    pub fn stream(&self) -> Stream<T> {
        let relay = self.relay.clone();
        self.source
            .derive(Operator::Deferred, move |observer| relay.subscribe_with(observer))
    }

    pub fn subscribe(&self, on_next: impl FnMut(T) + 'static) -> Subscription {
        self.relay.subscribe(on_next)
    }

    /// Subscribe upstream. The returned subscription is the connection;
    /// disposing it disconnects. Connecting while connected returns an
    /// already-disposed handle and leaves the live connection alone.
    pub fn connect(&self) -> Subscription {
        if self.is_connected() {
            debug!(source = ?self.source.operators(), "already connected");
            return Subscription::disposed();
        }
        let relay = self.relay.clone();
        let upstream = self
            .source
            .subscribe_with(Observer::from_fn(move |notification: Notification<T>| {
                relay.emit(notification);
            }));
        *self.connection.borrow_mut() = Some(upstream.handle());
        debug!(source = ?self.source.operators(), "connected");
        upstream
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection
            .borrow()
            .as_ref()
            .is_some_and(|handle| !handle.is_disposed())
    }

    /// Number of downstream subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.relay.subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn nothing_flows_before_connect() {
        let source = Subject::new();
        let published = source.stream().publish();
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        let _sub = published.subscribe(move |_: i32| seen_clone.set(seen_clone.get() + 1));

        source.next(1);
        assert_eq!(seen.get(), 0);
        assert_eq!(source.subscriber_count(), 0);

        let _connection = published.connect();
        source.next(2);
        assert_eq!(seen.get(), 1);
        assert_eq!(source.subscriber_count(), 1);
    }

    #[test]
    fn single_upstream_for_many_subscribers() {
        let source = Subject::new();
        let published = source.stream().publish();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut subs = Vec::new();
        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            subs.push(published.stream().subscribe(move |v: i32| {
                log.borrow_mut().push(format!("{tag}:{v}"));
            }));
        }
        let _connection = published.connect();
        source.next(5);

        assert_eq!(source.subscriber_count(), 1);
        assert_eq!(*log.borrow(), vec!["first:5", "second:5"]);
    }

    #[test]
    fn connect_twice_is_noop() {
        let source: Subject<i32> = Subject::new();
        let published = source.stream().publish();
        let first = published.connect();
        let second = published.connect();

        assert!(second.is_disposed());
        assert!(published.is_connected());
        assert_eq!(source.subscriber_count(), 1);

        first.dispose();
        assert!(!published.is_connected());
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn take_one_publish_gates_side_effect() {
        let taps: Subject<()> = Subject::new();
        let gate = taps.stream().take(1).publish();
        let requests = Rc::new(Cell::new(0));
        let enabled = Rc::new(Cell::new(false));

        let requests_clone = Rc::clone(&requests);
        let _request = gate.subscribe(move |()| requests_clone.set(requests_clone.get() + 1));
        let enabled_clone = Rc::clone(&enabled);
        let _enable = gate.stream().map(|()| true).subscribe(move |v| enabled_clone.set(v));
        assert_eq!(requests.get(), 0);

        let _connection = gate.connect();
        assert_eq!(requests.get(), 0);

        taps.next(());
        taps.next(());
        taps.next(());
        assert_eq!(requests.get(), 1);
        assert!(enabled.get());
        assert_eq!(taps.subscriber_count(), 0);
    }

    #[test]
    fn lineage_marks_deferred() {
        let source: Subject<i32> = Subject::named("taps");
        let stream = source.stream().take(1).publish().stream();
        assert_eq!(
            stream.operators(),
            &[
                Operator::Source("taps".into()),
                Operator::Take(1),
                Operator::Deferred
            ]
        );
    }
}
