#![forbid(unsafe_code)]

//! The closed operator set: map, try_map, pairwise, take, skip.
//!
//! Each operator is a plain function from a stream to a derived stream, so
//! compositions read as nested calls or as the equivalent `Stream` method
//! chain. `publish` and `as_driver` live in their own modules.
//!
//! # Invariants
//!
//! 1. Derived values are produced in source emission order.
//! 2. An operator that finishes early (`take` reaching its count, `try_map`
//!    failing) releases its upstream subscription immediately.
//! 3. Terminal notifications from upstream are forwarded unchanged.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::StreamError;
use crate::observer::{Notification, Observer};
use crate::stream::{Operator, Stream};
use crate::subscription::Subscription;

/// Slot for an upstream subscription that may be released from inside the
/// upstream's own emission, possibly before `subscribe` has even returned.
pub(crate) struct Link {
    upstream: RefCell<Option<Subscription>>,
    finished: Cell<bool>,
}

impl Link {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            upstream: RefCell::new(None),
            finished: Cell::new(false),
        })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Release upstream now; a subscription attached later is released on
    /// arrival.
    pub(crate) fn finish(&self) {
        self.finished.set(true);
        let upstream = self.upstream.borrow_mut().take();
        drop(upstream);
    }

    /// Store `upstream` and return the downstream handle that releases it.
    pub(crate) fn attach(self: &Rc<Self>, upstream: Subscription) -> Subscription {
        if self.finished.get() {
            drop(upstream);
            return Subscription::disposed();
        }
        *self.upstream.borrow_mut() = Some(upstream);
        let link = Rc::clone(self);
        Subscription::new(move || link.finish())
    }
}

/// Values `transform(v)` for every `v` of `source`.
pub fn map<T, U, F>(source: &Stream<T>, transform: F) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
    F: Fn(T) -> U + 'static,
{
    let upstream = source.clone();
    let transform = Rc::new(transform);
    source.derive(Operator::Map, move |mut downstream: Observer<U>| {
        let transform = Rc::clone(&transform);
        upstream.subscribe_with(Observer::from_fn(move |notification: Notification<T>| {
            downstream.notify(notification.map(|value| (*transform)(value)));
        }))
    })
}

/// Like [`map`], but an `Err` from `transform` is delivered downstream as
/// [`StreamError::Transform`] and ends the derived stream.
pub fn try_map<T, U, E, F>(source: &Stream<T>, transform: F) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
    E: fmt::Display,
    F: Fn(T) -> Result<U, E> + 'static,
{
    let upstream = source.clone();
    let transform = Rc::new(transform);
    source.derive(Operator::TryMap, move |mut downstream: Observer<U>| {
        let transform = Rc::clone(&transform);
        let link = Link::new();
        let on_failure = Rc::clone(&link);
        let sub = upstream.subscribe_with(Observer::from_fn(move |notification: Notification<T>| {
            if on_failure.is_finished() {
                return;
            }
            match notification {
                Notification::Next(value) => match (*transform)(value) {
                    Ok(mapped) => downstream.next(mapped),
                    Err(err) => {
                        let error = StreamError::Transform {
                            operator: "try_map",
                            message: err.to_string(),
                        };
                        debug!(%error, "terminating derived stream");
                        downstream.error(error);
                        on_failure.finish();
                    }
                },
                Notification::Error(err) => downstream.error(err),
                Notification::Completed => downstream.complete(),
            }
        }));
        link.attach(sub)
    })
}

/// `(previous, current)` for every value after the first.
pub fn pairwise<T>(source: &Stream<T>) -> Stream<(T, T)>
where
    T: Clone + 'static,
{
    let upstream = source.clone();
    source.derive(Operator::Pairwise, move |mut downstream: Observer<(T, T)>| {
        let mut previous: Option<T> = None;
        upstream.subscribe_with(Observer::from_fn(move |notification: Notification<T>| {
            match notification {
                Notification::Next(current) => {
                    if let Some(prev) = previous.replace(current.clone()) {
                        downstream.next((prev, current));
                    }
                }
                Notification::Error(err) => downstream.error(err),
                Notification::Completed => downstream.complete(),
            }
        }))
    })
}

/// The first `count` values, then completion.
pub fn take<T>(source: &Stream<T>, count: usize) -> Stream<T>
where
    T: Clone + 'static,
{
    let upstream = source.clone();
    source.derive(Operator::Take(count), move |mut downstream: Observer<T>| {
        if count == 0 {
            downstream.complete();
            return Subscription::disposed();
        }
        let link = Link::new();
        let on_done = Rc::clone(&link);
        let mut remaining = count;
        let sub = upstream.subscribe_with(Observer::from_fn(move |notification: Notification<T>| {
            if on_done.is_finished() {
                return;
            }
            match notification {
                Notification::Next(value) => {
                    remaining -= 1;
                    downstream.next(value);
                    if remaining == 0 {
                        downstream.complete();
                        on_done.finish();
                    }
                }
                terminal => downstream.notify(terminal),
            }
        }));
        link.attach(sub)
    })
}

/// Every value after the first `count`.
pub fn skip<T>(source: &Stream<T>, count: usize) -> Stream<T>
where
    T: Clone + 'static,
{
    let upstream = source.clone();
    source.derive(Operator::Skip(count), move |mut downstream: Observer<T>| {
        let mut pending = count;
        upstream.subscribe_with(Observer::from_fn(move |notification: Notification<T>| {
            match notification {
                Notification::Next(_) if pending > 0 => pending -= 1,
                other => downstream.notify(other),
            }
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::Subject;

    fn record<T: Clone + fmt::Debug + 'static>(
        stream: &Stream<T>,
    ) -> (Subscription, Rc<RefCell<Vec<Notification<T>>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let sub = stream.subscribe_notifications(move |n| log_clone.borrow_mut().push(n));
        (sub, log)
    }

    #[test]
    fn map_transforms_in_order() {
        let source = Subject::new();
        let (_sub, log) = record(&map(&source.stream(), |v: i32| v * 10));

        source.next(1);
        source.next(2);
        assert_eq!(
            *log.borrow(),
            vec![Notification::Next(10), Notification::Next(20)]
        );
    }

    #[test]
    fn try_map_failure_terminates_only_derived() {
        let source = Subject::new();
        let parsed = source.stream().try_map(|s: &'static str| s.parse::<i32>());
        let (_derived, log) = record(&parsed);
        let (_sibling, sibling_log) = record(&source.stream());

        source.next("1");
        source.next("x");
        source.next("3");

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], Notification::Next(1));
        assert!(matches!(
            log[1],
            Notification::Error(StreamError::Transform { operator: "try_map", .. })
        ));
        // Upstream released, sibling untouched.
        assert_eq!(source.subscriber_count(), 1);
        assert_eq!(sibling_log.borrow().len(), 3);
    }

    #[test]
    fn pairwise_pairs_consecutive_values() {
        let source = Subject::new();
        let (_sub, log) = record(&pairwise(&source.stream()));

        source.next('A');
        assert!(log.borrow().is_empty());
        source.next('B');
        source.next('C');

        assert_eq!(
            *log.borrow(),
            vec![
                Notification::Next(('A', 'B')),
                Notification::Next(('B', 'C'))
            ]
        );
    }

    #[test]
    fn pairwise_state_is_per_subscription() {
        let source = Subject::new();
        let pairs = source.stream().pairwise();
        let (_first, first_log) = record(&pairs);
        source.next(1);
        let (_second, second_log) = record(&pairs);
        source.next(2);

        assert_eq!(first_log.borrow().len(), 1);
        assert!(second_log.borrow().is_empty());
    }

    #[test]
    fn take_one_of_five() {
        let source = Subject::new();
        let (sub, log) = record(&take(&source.stream(), 1));

        for v in 0..5 {
            source.next(v);
        }

        assert_eq!(
            *log.borrow(),
            vec![Notification::Next(0), Notification::Completed]
        );
        assert_eq!(source.subscriber_count(), 0);
        assert!(!sub.is_disposed());
    }

    #[test]
    fn take_zero_completes_without_subscribing() {
        let source: Subject<i32> = Subject::new();
        let (sub, log) = record(&source.stream().take(0));

        assert_eq!(*log.borrow(), vec![Notification::Completed]);
        assert_eq!(source.subscriber_count(), 0);
        assert!(sub.is_disposed());
    }

    #[test]
    fn take_from_replaying_source_finishes_during_subscribe() {
        let source = Subject::new().replay_latest();
        source.next(7);
        let (sub, log) = record(&source.stream().take(1));

        assert_eq!(
            *log.borrow(),
            vec![Notification::Next(7), Notification::Completed]
        );
        assert_eq!(source.subscriber_count(), 0);
        assert!(sub.is_disposed());
    }

    #[test]
    fn take_stops_cold_source() {
        let (_sub, log) = record(&Stream::from_values(vec![1, 2, 3, 4, 5]).take(1));
        assert_eq!(
            *log.borrow(),
            vec![Notification::Next(1), Notification::Completed]
        );
    }

    #[test]
    fn skip_drops_prefix() {
        let (_sub, log) = record(&Stream::from_values(vec![1, 2, 3]).skip(2));
        assert_eq!(
            *log.borrow(),
            vec![Notification::Next(3), Notification::Completed]
        );
    }

    #[test]
    fn pairwise_on_replaying_source() {
        let source = Subject::new().replay_latest();
        source.next(0);
        let (_sub, log) = record(&source.stream().pairwise());
        source.next(1);
        assert_eq!(*log.borrow(), vec![Notification::Next((0, 1))]);
    }

    #[test]
    fn pairwise_clones_owned_values() {
        let source: Subject<String> = Subject::new();
        let (_sub, log) = record(&pairwise(&source.stream()));
        source.next("a".to_string());
        source.next("b".to_string());
        source.complete();
        assert_eq!(
            *log.borrow(),
            vec![
                Notification::Next(("a".to_string(), "b".to_string())),
                Notification::Completed,
            ]
        );
    }

    #[test]
    fn disposing_derived_releases_upstream() {
        let source: Subject<i32> = Subject::new();
        let derived = source.stream().map(|v| v + 1).pairwise().take(3);
        let (sub, _log) = record(&derived);
        assert_eq!(source.subscriber_count(), 1);

        sub.dispose();
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn upstream_error_forwarded() {
        let source: Subject<i32> = Subject::new();
        let (_sub, log) = record(&source.stream().map(|v| v * 2));
        source.error(StreamError::Source("offline".into()));
        assert_eq!(
            *log.borrow(),
            vec![Notification::Error(StreamError::Source("offline".into()))]
        );
    }
}
