#![forbid(unsafe_code)]

//! Composable, subscribable streams.
//!
//! A [`Stream<T>`] is a recipe: subscribing runs it and returns the
//! [`Subscription`] that tears it down. Streams are built from a source
//! (a [`Subject`](crate::Subject), a [`Property`](crate::Property), a fixed
//! list of values) and then derived through the closed operator set in
//! [`operators`](crate::operators). Every stream records its lineage as a
//! list of [`Operator`] tags.

use std::fmt;
use std::rc::Rc;

use crate::connectable::{Connectable, publish};
use crate::driver::{Driver, as_driver};
use crate::observer::{Notification, Observer};
use crate::operators;
use crate::subscription::Subscription;

/// Tag of one stage in a stream's lineage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Source(String),
    Map,
    TryMap,
    Pairwise,
    Take(usize),
    Skip(usize),
    /// Multicast gated on an explicit `connect()`.
    Deferred,
    /// Shared, replaying driver.
    Replay,
}

type SubscribeFn<T> = dyn Fn(Observer<T>) -> Subscription;

pub struct Stream<T> {
    lineage: Rc<[Operator]>,
    subscribe: Rc<SubscribeFn<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            lineage: Rc::clone(&self.lineage),
            subscribe: Rc::clone(&self.subscribe),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("lineage", &self.lineage)
            .finish()
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Create a source stream from a subscribe function.
    pub fn from_source(
        name: impl Into<String>,
        subscribe: impl Fn(Observer<T>) -> Subscription + 'static,
    ) -> Self {
        Self {
            lineage: Rc::from(vec![Operator::Source(name.into())]),
            subscribe: Rc::new(subscribe),
        }
    }

    /// A cold stream that emits `values` synchronously on subscribe, then
    /// completes.
    pub fn from_values(values: Vec<T>) -> Self {
        Self::from_source("values", move |mut observer| {
            for value in values.iter().cloned() {
                if observer.is_stopped() {
                    break;
                }
                observer.next(value);
            }
            observer.complete();
            Subscription::disposed()
        })
    }

    /// Stack `op` on top of this stream's lineage.
    pub(crate) fn derive<U: Clone + 'static>(
        &self,
        op: Operator,
        subscribe: impl Fn(Observer<U>) -> Subscription + 'static,
    ) -> Stream<U> {
        let mut lineage = self.lineage.to_vec();
        lineage.push(op);
        Stream {
            lineage: Rc::from(lineage),
            subscribe: Rc::new(subscribe),
        }
    }

    /// Lineage of this stream, source first.
    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.lineage
    }

    pub fn subscribe_with(&self, observer: Observer<T>) -> Subscription {
        (self.subscribe)(observer)
    }

    /// Run `on_next` for every value. Errors are logged.
    pub fn subscribe(&self, on_next: impl FnMut(T) + 'static) -> Subscription {
        self.subscribe_with(Observer::new(on_next))
    }

    /// Run `handler` for every notification, terminals included.
    pub fn subscribe_notifications(
        &self,
        handler: impl FnMut(Notification<T>) + 'static,
    ) -> Subscription {
        self.subscribe_with(Observer::from_fn(handler))
    }

    pub fn map<U: Clone + 'static>(&self, transform: impl Fn(T) -> U + 'static) -> Stream<U> {
        operators::map(self, transform)
    }

    pub fn try_map<U, E>(&self, transform: impl Fn(T) -> Result<U, E> + 'static) -> Stream<U>
    where
        U: Clone + 'static,
        E: fmt::Display,
    {
        operators::try_map(self, transform)
    }

    pub fn pairwise(&self) -> Stream<(T, T)> {
        operators::pairwise(self)
    }

    pub fn take(&self, count: usize) -> Stream<T> {
        operators::take(self, count)
    }

    pub fn skip(&self, count: usize) -> Stream<T> {
        operators::skip(self, count)
    }

    /// Multicast this stream, deferring the upstream subscription until
    /// [`Connectable::connect`].
    pub fn publish(&self) -> Connectable<T> {
        publish(self)
    }

    /// Share this stream among UI consumers with latest-value replay.
    pub fn as_driver(&self) -> Driver<T> {
        as_driver(self)
    }
}
