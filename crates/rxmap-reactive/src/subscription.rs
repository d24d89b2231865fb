#![forbid(unsafe_code)]

//! Disposable subscription handles.
//!
//! # Invariants
//!
//! 1. A subscription moves from [`SubscriptionState::Active`] to
//!    [`SubscriptionState::Disposed`] exactly once; the teardown registered at
//!    construction runs on that transition and never again.
//! 2. `dispose()` on a disposed subscription is a no-op returning `false`.
//! 3. Dropping a [`Subscription`] disposes it (RAII), so every handle that is
//!    owned by a [`Scope`](crate::Scope) is released when the scope goes away.
//! 4. A [`SubscriptionHandle`] never keeps the subscription alive; disposing
//!    through a stale handle reports `false`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::scope::Scope;

type Teardown = Box<dyn FnOnce()>;

/// Lifecycle of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Disposed,
}

struct SubscriptionCell {
    disposed: Cell<bool>,
    teardown: RefCell<Option<Teardown>>,
}

impl SubscriptionCell {
    fn dispose(&self) -> bool {
        if self.disposed.replace(true) {
            return false;
        }
        // Take the teardown out first: it may re-enter this cell.
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
        true
    }
}

/// Owning handle for an active binding between a source and an observer.
#[must_use = "dropping a Subscription disposes it"]
pub struct Subscription {
    cell: Rc<SubscriptionCell>,
}

impl Subscription {
    /// Create an active subscription that runs `teardown` when disposed.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            cell: Rc::new(SubscriptionCell {
                disposed: Cell::new(false),
                teardown: RefCell::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// A subscription that is already disposed.
    ///
    /// Returned when there is nothing to release, e.g. subscribing to a
    /// terminated subject or connecting an already connected stream.
    pub fn disposed() -> Self {
        Self {
            cell: Rc::new(SubscriptionCell {
                disposed: Cell::new(true),
                teardown: RefCell::new(None),
            }),
        }
    }

    /// Release the subscription. Returns `true` if this call performed the
    /// release, `false` if it was already disposed.
    pub fn dispose(&self) -> bool {
        self.cell.dispose()
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        if self.cell.disposed.get() {
            SubscriptionState::Disposed
        } else {
            SubscriptionState::Active
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cell.disposed.get()
    }

    /// A non-owning handle that can dispose this subscription later, e.g.
    /// from inside its own handler.
    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            cell: Rc::downgrade(&self.cell),
        }
    }

    /// Hand ownership to `scope`; the subscription is released on scope
    /// teardown.
    pub fn add_to(self, scope: &Scope) {
        scope.add(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cell.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("state", &self.state())
            .finish()
    }
}

/// Weak counterpart of [`Subscription`].
#[derive(Clone)]
pub struct SubscriptionHandle {
    cell: Weak<SubscriptionCell>,
}

impl SubscriptionHandle {
    /// Dispose the referenced subscription if it is still active.
    pub fn dispose(&self) -> bool {
        self.cell.upgrade().is_some_and(|cell| cell.dispose())
    }

    /// `true` once the subscription is disposed or its owner dropped it.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cell.upgrade().is_none_or(|cell| cell.disposed.get())
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting() -> (Subscription, Rc<Cell<u32>>) {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = Rc::clone(&runs);
        let sub = Subscription::new(move || runs_clone.set(runs_clone.get() + 1));
        (sub, runs)
    }

    #[test]
    fn dispose_runs_teardown_once() {
        let (sub, runs) = counting();
        assert_eq!(sub.state(), SubscriptionState::Active);

        assert!(sub.dispose());
        assert!(!sub.dispose());
        assert_eq!(runs.get(), 1);
        assert_eq!(sub.state(), SubscriptionState::Disposed);
    }

    #[test]
    fn drop_disposes() {
        let (sub, runs) = counting();
        drop(sub);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn drop_after_dispose_does_not_rerun() {
        let (sub, runs) = counting();
        sub.dispose();
        drop(sub);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn handle_disposes_owner() {
        let (sub, runs) = counting();
        let handle = sub.handle();

        assert!(!handle.is_disposed());
        assert!(handle.dispose());
        assert!(sub.is_disposed());
        assert!(!handle.dispose());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn stale_handle_is_noop() {
        let (sub, runs) = counting();
        let handle = sub.handle();
        drop(sub);

        assert!(handle.is_disposed());
        assert!(!handle.dispose());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn disposed_constructor() {
        let sub = Subscription::disposed();
        assert!(sub.is_disposed());
        assert!(!sub.dispose());
    }

    #[test]
    fn reentrant_dispose_from_teardown() {
        let slot: Rc<RefCell<Option<SubscriptionHandle>>> = Rc::new(RefCell::new(None));
        let slot_clone = Rc::clone(&slot);
        let sub = Subscription::new(move || {
            let again = slot_clone.borrow().as_ref().map(SubscriptionHandle::dispose);
            assert_eq!(again, Some(false));
        });
        *slot.borrow_mut() = Some(sub.handle());
        assert!(sub.dispose());
    }
}
