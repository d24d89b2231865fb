#![forbid(unsafe_code)]

//! Reactive event-stream adapter for rxmap.
//!
//! This crate turns callback-style event sources into composable streams:
//!
//! - [`Subject`]: a named, multicast event source.
//! - [`Stream`]: a subscribable recipe derived through the closed operator set
//!   in [`operators`] (`map`, `try_map`, `pairwise`, `take`, `skip`), plus
//!   [`Stream::publish`] and [`Stream::as_driver`].
//! - [`Subscription`]: RAII handle with states {Active, Disposed}.
//! - [`Property`]: a version-tracked settable value with change notification.
//! - [`Scope`]: owner of subscriptions and bindings with one teardown hook.
//!
//! # Architecture
//!
//! Everything is `Rc<RefCell<..>>` based and therefore `!Send`: delivery is
//! synchronous on the emitting thread, one emission at a time per source.
//!
//! # Invariants
//!
//! 1. Same-source emissions reach subscribers in emission order; subscribers
//!    are called in registration order.
//! 2. A disposed subscription's handler is never called again.
//! 3. Every subscription owned by a [`Scope`] is released exactly once.

mod connectable;
mod driver;
mod error;
mod observer;
pub mod operators;
mod property;
mod scope;
mod stream;
mod subject;
mod subscription;

pub use connectable::Connectable;
pub use driver::Driver;
pub use error::{BindError, StreamError};
pub use observer::{Notification, Observer};
pub use property::Property;
pub use scope::Scope;
pub use stream::{Operator, Stream};
pub use subject::Subject;
pub use subscription::{Subscription, SubscriptionHandle, SubscriptionState};
