#![forbid(unsafe_code)]

//! Multicast event sources.
//!
//! # Design
//!
//! A [`Subject<T>`] keeps an ordered map from subscriber id to observer.
//! Subscribing inserts under a fresh id; disposing the returned
//! [`Subscription`] removes that id. Ids increase monotonically, so map order
//! is registration order.
//!
//! # Invariants
//!
//! 1. Emissions are delivered one at a time, in emission order. An emission
//!    raised from inside a handler is queued and delivered after the current
//!    fan-out finishes.
//! 2. Each observer is looked up again right before it is called, so a
//!    subscription disposed mid-fan-out receives nothing further, not even
//!    the rest of the in-flight emission.
//! 3. After `error` or `complete` the subject is terminated: later emissions
//!    are dropped and new subscribers receive the terminal notification
//!    immediately.
//!
//! # Failure Modes
//!
//! - **Observer cycle**: an observer whose handler synchronously routes an
//!   emission back into itself through another subject panics (`RefCell`
//!   borrow). Such a graph has no well-defined order.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::StreamError;
use crate::observer::{Notification, Observer};
use crate::stream::Stream;
use crate::subscription::Subscription;

type SharedObserver<T> = Rc<RefCell<Observer<T>>>;

struct SubjectInner<T> {
    name: Option<String>,
    next_id: u64,
    observers: BTreeMap<u64, SharedObserver<T>>,
    queue: VecDeque<Notification<T>>,
    dispatching: bool,
    /// A terminal notification has been accepted (it may still be queued).
    stopping: bool,
    /// The terminal notification, once delivered.
    terminal: Option<Notification<T>>,
    replay: bool,
    latest: Option<T>,
}

/// A named, multicast event source.
///
/// Cloning yields another handle to the same source.
pub struct Subject<T> {
    inner: Rc<RefCell<SubjectInner<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Subject")
            .field("name", &inner.name)
            .field("subscriber_count", &inner.observers.len())
            .field("terminated", &inner.terminal.is_some())
            .finish()
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Subject<T> {
    /// Create an anonymous subject without replay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SubjectInner {
                name: None,
                next_id: 0,
                observers: BTreeMap::new(),
                queue: VecDeque::new(),
                dispatching: false,
                stopping: false,
                terminal: None,
                replay: false,
                latest: None,
            })),
        }
    }

    /// Create a subject that identifies itself as `name` in logs and
    /// stream lineage.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let subject = Self::new();
        subject.inner.borrow_mut().name = Some(name.into());
        subject
    }

    /// Make new subscribers receive the most recent value on subscribe.
    #[must_use]
    pub fn replay_latest(self) -> Self {
        self.inner.borrow_mut().replay = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.inner.borrow().name.clone()
    }

    /// The most recent value, if this subject replays.
    #[must_use]
    pub fn latest(&self) -> Option<T> {
        self.inner.borrow().latest.clone()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.borrow().stopping
    }

    pub fn next(&self, value: T) {
        self.emit(Notification::Next(value));
    }

    pub fn error(&self, err: StreamError) {
        self.emit(Notification::Error(err));
    }

    pub fn complete(&self) {
        self.emit(Notification::Completed);
    }

    /// Deliver a notification to every current subscriber.
    pub fn emit(&self, notification: Notification<T>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.stopping {
                return;
            }
            if notification.is_terminal() {
                inner.stopping = true;
            }
            inner.queue.push_back(notification);
            if inner.dispatching {
                return;
            }
            inner.dispatching = true;
        }
        self.drain();
    }

    fn drain(&self) {
        loop {
            let (notification, observers) = {
                let mut inner = self.inner.borrow_mut();
                let Some(notification) = inner.queue.pop_front() else {
                    inner.dispatching = false;
                    return;
                };
                match &notification {
                    Notification::Next(value) => {
                        if inner.replay {
                            inner.latest = Some(value.clone());
                        }
                    }
                    _ => inner.terminal = Some(notification.clone()),
                }
                let observers: Vec<(u64, SharedObserver<T>)> = inner
                    .observers
                    .iter()
                    .map(|(id, observer)| (*id, Rc::clone(observer)))
                    .collect();
                (notification, observers)
            };

            let terminal = notification.is_terminal();
            for (id, observer) in observers {
                let live = self.inner.borrow().observers.contains_key(&id);
                if live {
                    observer.borrow_mut().notify(notification.clone());
                }
            }

            if terminal {
                let released = std::mem::take(&mut self.inner.borrow_mut().observers);
                drop(released);
            }
        }
    }

    /// Register an observer. The returned subscription removes it again.
    pub fn subscribe_with(&self, observer: Observer<T>) -> Subscription {
        let observer = Rc::new(RefCell::new(observer));
        let (id, replay) = {
            let mut inner = self.inner.borrow_mut();
            if let Some(terminal) = inner.terminal.clone() {
                drop(inner);
                observer.borrow_mut().notify(terminal);
                return Subscription::disposed();
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.insert(id, Rc::clone(&observer));
            trace!(subject = ?inner.name, id, "subscribed");
            let replay = if inner.replay { inner.latest.clone() } else { None };
            (id, replay)
        };

        if let Some(value) = replay {
            observer.borrow_mut().next(value);
        }

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let removed = inner.borrow_mut().observers.remove(&id);
                trace!(id, removed = removed.is_some(), "unsubscribed");
                drop(removed);
            }
        })
    }

    /// Register a value handler.
    pub fn subscribe(&self, on_next: impl FnMut(T) + 'static) -> Subscription {
        self.subscribe_with(Observer::new(on_next))
    }

    /// Observe this subject as a [`Stream`].
    #[must_use]
    pub fn stream(&self) -> Stream<T> {
        let name = self.name().unwrap_or_else(|| "subject".to_string());
        let subject = self.clone();
        Stream::from_source(name, move |observer| subject.subscribe_with(observer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn collect(subject: &Subject<i32>) -> (Subscription, Rc<RefCell<Vec<i32>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let sub = subject.subscribe(move |v| seen_clone.borrow_mut().push(v));
        (sub, seen)
    }

    #[test]
    fn delivers_in_emission_order() {
        let subject = Subject::new();
        let (_sub, seen) = collect(&subject);

        for v in [3, 1, 2] {
            subject.next(v);
        }
        assert_eq!(*seen.borrow(), vec![3, 1, 2]);
    }

    #[test]
    fn fan_out_in_registration_order() {
        let subject = Subject::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut subs = Vec::new();
        for tag in ['A', 'B', 'C'] {
            let log = Rc::clone(&log);
            subs.push(subject.subscribe(move |v: i32| log.borrow_mut().push((tag, v))));
        }

        subject.next(1);
        assert_eq!(*log.borrow(), vec![('A', 1), ('B', 1), ('C', 1)]);
    }

    #[test]
    fn dispose_removes_by_id() {
        let subject = Subject::new();
        let (sub, seen) = collect(&subject);
        assert_eq!(subject.subscriber_count(), 1);

        subject.next(1);
        sub.dispose();
        subject.next(2);

        assert_eq!(subject.subscriber_count(), 0);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn reentrant_emission_is_queued() {
        let subject: Subject<i32> = Subject::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let feedback = subject.clone();
        let log_a = Rc::clone(&log);
        let _a = subject.subscribe(move |v| {
            log_a.borrow_mut().push(format!("a{v}"));
            if v == 1 {
                feedback.next(2);
            }
        });
        let log_b = Rc::clone(&log);
        let _b = subject.subscribe(move |v| log_b.borrow_mut().push(format!("b{v}")));

        subject.next(1);
        // b sees 1 before anyone sees 2: no overlap.
        assert_eq!(*log.borrow(), vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn dispose_sibling_mid_fan_out() {
        let subject: Subject<i32> = Subject::new();
        let victim_calls = Rc::new(Cell::new(0));
        let victim_handle = Rc::new(RefCell::new(None));

        let handle_slot = Rc::clone(&victim_handle);
        let _killer = subject.subscribe(move |_| {
            if let Some(handle) = handle_slot.borrow().as_ref() {
                crate::SubscriptionHandle::dispose(handle);
            }
        });
        let calls = Rc::clone(&victim_calls);
        let victim = subject.subscribe(move |_| calls.set(calls.get() + 1));
        *victim_handle.borrow_mut() = Some(victim.handle());

        subject.next(1);
        assert_eq!(victim_calls.get(), 0);
        assert!(victim.is_disposed());
    }

    #[test]
    fn complete_terminates() {
        let subject = Subject::new();
        let done = Rc::new(Cell::new(false));
        let done_clone = Rc::clone(&done);
        let _sub = subject.subscribe_with(Observer::with_handlers(
            |_: i32| {},
            |_| {},
            move || done_clone.set(true),
        ));

        subject.complete();
        subject.next(1);

        assert!(done.get());
        assert!(subject.is_terminated());
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn late_subscriber_sees_terminal() {
        let subject: Subject<i32> = Subject::new();
        subject.error(StreamError::Source("gone".into()));

        let got = Rc::new(RefCell::new(None));
        let got_clone = Rc::clone(&got);
        let sub = subject.subscribe_with(Observer::with_error(
            |_| {},
            move |e| *got_clone.borrow_mut() = Some(e),
        ));

        assert!(sub.is_disposed());
        assert_eq!(*got.borrow(), Some(StreamError::Source("gone".into())));
    }

    #[test]
    fn replay_latest_on_subscribe() {
        let subject = Subject::named("position").replay_latest();
        subject.next(1);
        subject.next(2);

        let (_sub, seen) = collect(&subject);
        subject.next(3);
        assert_eq!(*seen.borrow(), vec![2, 3]);
        assert_eq!(subject.latest(), Some(3));
    }

    #[test]
    fn plain_subject_does_not_replay() {
        let subject = Subject::new();
        subject.next(1);
        let (_sub, seen) = collect(&subject);
        assert!(seen.borrow().is_empty());
        assert_eq!(subject.latest(), None);
    }

    #[test]
    fn stream_lineage_names_source() {
        let subject: Subject<i32> = Subject::named("did_tap_at");
        assert_eq!(
            subject.stream().operators(),
            &[crate::Operator::Source("did_tap_at".into())]
        );
    }

    #[test]
    fn debug_format() {
        let subject: Subject<i32> = Subject::named("snapshot_ready");
        let dbg = format!("{subject:?}");
        assert!(dbg.contains("snapshot_ready"));
        assert!(dbg.contains("subscriber_count"));
    }
}
