#![forbid(unsafe_code)]

//! Shared, replaying streams for UI consumers.
//!
//! A [`Driver`] wraps a stream so that:
//!
//! - all drivers share one upstream subscription, opened by the first
//!   `drive` and closed when the last driving subscription is released;
//! - a new driver immediately receives the most recent value seen by the
//!   current connection, never one from before a full release;
//! - upstream errors never reach handlers: they are logged and end the
//!   driver for good. Later drives see only the completion.
//!
//! Delivery happens on the emitting thread. All types here are `!Send`, so
//! that thread is the UI thread that owns the widget.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::observer::{Notification, Observer};
use crate::stream::{Operator, Stream};
use crate::subject::Subject;
use crate::subscription::Subscription;

struct DriverInner<T> {
    source: Stream<T>,
    /// Replaced on disconnect so a later connection starts without the
    /// previous connection's latest value. Kept once terminated.
    relay: RefCell<Subject<T>>,
    connected: Cell<bool>,
    connection: RefCell<Option<Subscription>>,
    drivers: Cell<usize>,
}

pub struct Driver<T> {
    inner: Rc<DriverInner<T>>,
}

impl<T> Clone for Driver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Driver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("source", &self.inner.source)
            .field("connected", &self.inner.connected.get())
            .field("drivers", &self.inner.drivers.get())
            .finish()
    }
}

/// Share `source` with replay of the latest value.
pub fn as_driver<T: Clone + 'static>(source: &Stream<T>) -> Driver<T> {
    Driver {
        inner: Rc::new(DriverInner {
            source: source.clone(),
            relay: RefCell::new(Subject::new().replay_latest()),
            connected: Cell::new(false),
            connection: RefCell::new(None),
            drivers: Cell::new(0),
        }),
    }
}

impl<T: Clone + 'static> Driver<T> {
    /// Run `on_next` for the latest value (if any) and every later one.
    pub fn drive(&self, on_next: impl FnMut(T) + 'static) -> Subscription {
        Self::attach(&self.inner, Observer::new(on_next))
    }

    /// This driver as a plain stream; each subscription counts as a driver.
    #[must_use]
    pub fn stream(&self) -> Stream<T> {
        let inner = Rc::clone(&self.inner);
        self.inner
            .source
            .derive(Operator::Replay, move |observer| Self::attach(&inner, observer))
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    /// Number of live driving subscriptions.
    #[must_use]
    pub fn driver_count(&self) -> usize {
        self.inner.drivers.get()
    }

    fn attach(inner: &Rc<DriverInner<T>>, observer: Observer<T>) -> Subscription {
        let relay = inner.relay.borrow().clone();
        if relay.is_terminated() {
            // Delivers the terminal and returns a disposed subscription.
            return relay.subscribe_with(observer);
        }
        inner.drivers.set(inner.drivers.get() + 1);
        let downstream = relay.subscribe_with(observer);
        Self::connect(inner);

        let inner = Rc::clone(inner);
        Subscription::new(move || {
            drop(downstream);
            let remaining = inner.drivers.get().saturating_sub(1);
            inner.drivers.set(remaining);
            if remaining == 0 {
                Self::disconnect(&inner);
                if !inner.relay.borrow().is_terminated() {
                    *inner.relay.borrow_mut() = Subject::new().replay_latest();
                }
                debug!(source = ?inner.source.operators(), "driver disconnected");
            }
        })
    }

    fn connect(inner: &Rc<DriverInner<T>>) {
        // Set before subscribing: a replaying upstream emits during the call.
        if inner.connected.replace(true) {
            return;
        }
        let relay = inner.relay.borrow().clone();
        let owner = Rc::downgrade(inner);
        let upstream = inner
            .source
            .subscribe_with(Observer::from_fn(move |notification: Notification<T>| {
                match notification {
                    Notification::Next(value) => {
                        relay.next(value);
                        return;
                    }
                    Notification::Error(err) => {
                        warn!(error = %err, "driver source failed; completing driver");
                        relay.complete();
                    }
                    Notification::Completed => relay.complete(),
                }
                if let Some(inner) = owner.upgrade() {
                    Self::disconnect(&inner);
                }
            }));
        if inner.connected.get() && !inner.relay.borrow().is_terminated() {
            *inner.connection.borrow_mut() = Some(upstream);
            debug!(source = ?inner.source.operators(), "driver connected");
        }
    }

    /// Release the upstream subscription, if any.
    fn disconnect(inner: &DriverInner<T>) {
        inner.connected.set(false);
        let connection = inner.connection.borrow_mut().take();
        drop(connection);
    }
}
