#![forbid(unsafe_code)]

//! Settable, version-tracked display values with change notification.
//!
//! # Design
//!
//! [`Property<T>`] stores a value in shared, reference-counted storage
//! (`Rc<RefCell<..>>`) next to a replaying [`Subject`] that carries changes.
//! When a new value differs from the current one (by `PartialEq`) the version
//! is bumped and the change is emitted. An optional validator guards every
//! write; rejected writes surface as [`BindError`] and leave value and version
//! untouched.
//!
//! # Performance
//!
//! | Operation     | Complexity                 |
//! |---------------|----------------------------|
//! | `get()`       | O(1) + clone               |
//! | `set()`       | O(S) where S = subscribers |
//! | `subscribe()` | O(log S)                   |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: calling `set()` from inside a subscriber is allowed;
//!   the nested change is queued and delivered after the current one.
//! - **Validator reads the property**: the validator runs outside the
//!   borrow, so it may call `get()`.
//! - **Write inside `with`**: `f` sees the value from before the write.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::BindError;
use crate::stream::Stream;
use crate::subject::Subject;
use crate::subscription::Subscription;

type Validator<T> = Rc<dyn Fn(&T) -> Result<(), String>>;

struct PropertyInner<T> {
    value: T,
    version: u64,
    validator: Option<Validator<T>>,
}

/// A named display value that can be bound to and observed.
///
/// Cloning a `Property` creates a new handle to the **same** value and
/// subscribers.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing write.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Subscribers are notified in registration order.
/// 4. `stream()` delivers the current value first, then every change.
pub struct Property<T> {
    name: Rc<str>,
    inner: Rc<RefCell<PropertyInner<T>>>,
    changes: Subject<T>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            inner: Rc::clone(&self.inner),
            changes: self.changes.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// Create a property with the given initial value at version 0.
    #[must_use]
    pub fn new(name: impl Into<String>, value: T) -> Self {
        let name: String = name.into();
        let changes = Subject::named(name.clone()).replay_latest();
        changes.next(value.clone());
        Self {
            name: Rc::from(name),
            inner: Rc::new(RefCell::new(PropertyInner {
                value,
                version: 0,
                validator: None,
            })),
            changes,
        }
    }

    /// Reject writes for which `validate` returns `Err(reason)`.
    #[must_use]
    pub fn with_validator(self, validate: impl Fn(&T) -> Result<(), String> + 'static) -> Self {
        self.inner.borrow_mut().validator = Some(Rc::new(validate));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Run `f` on a snapshot of the current value. The property is not
    /// borrowed while `f` runs, so `f` may write it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.get();
        f(&value)
    }

    /// Write a new value. Equal values are accepted without notification.
    pub fn set(&self, value: T) -> Result<(), BindError> {
        self.validate(&value)?;
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return Ok(());
            }
            inner.value = value.clone();
            inner.version += 1;
        }
        self.changes.next(value);
        Ok(())
    }

    /// Modify a copy of the value and write it back through [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), BindError> {
        let mut value = self.get();
        f(&mut value);
        self.set(value)
    }

    fn validate(&self, value: &T) -> Result<(), BindError> {
        let validator = self.inner.borrow().validator.clone();
        match validator {
            Some(validate) => validate(value).map_err(|reason| BindError::new(&*self.name, reason)),
            None => Ok(()),
        }
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live change subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.subscriber_count()
    }

    /// Run `callback` with each new value. The current value is not replayed.
    pub fn subscribe(&self, callback: impl FnMut(T) + 'static) -> Subscription {
        self.changes().subscribe(callback)
    }

    /// Changes only.
    #[must_use]
    pub fn changes(&self) -> Stream<T> {
        self.changes.stream().skip(1)
    }

    /// Current value, then changes.
    #[must_use]
    pub fn stream(&self) -> Stream<T> {
        self.changes.stream()
    }

    /// A setter suitable for [`Scope::bind`](crate::Scope::bind).
    pub fn setter(&self) -> impl FnMut(T) -> Result<(), BindError> + 'static {
        let property = self.clone();
        move |value| property.set(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
