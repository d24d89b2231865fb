#![forbid(unsafe_code)]

//! Location authorization.
//!
//! The manager models the permission prompt only. Whether the user grants
//! or denies is fixed at construction ([`AuthorizationPolicy`]); the first
//! request resolves the status and later requests leave it unchanged.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use rxmap_reactive::{Property, Stream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Denied,
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::AuthorizedWhenInUse)
    }
}

/// How the simulated user answers the permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationPolicy {
    #[default]
    Grant,
    Deny,
}

impl AuthorizationPolicy {
    /// Parse `grant` or `deny`, ignoring ASCII case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("grant") {
            Some(Self::Grant)
        } else if value.eq_ignore_ascii_case("deny") {
            Some(Self::Deny)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct LocationManager {
    policy: AuthorizationPolicy,
    status: Property<AuthorizationStatus>,
    requests: Rc<Cell<u32>>,
}

impl LocationManager {
    #[must_use]
    pub fn new(policy: AuthorizationPolicy) -> Self {
        Self {
            policy,
            status: Property::new("authorization_status", AuthorizationStatus::NotDetermined),
            requests: Rc::new(Cell::new(0)),
        }
    }

    #[must_use]
    pub fn status(&self) -> AuthorizationStatus {
        self.status.get()
    }

    /// Current status, then every change.
    #[must_use]
    pub fn authorization(&self) -> Stream<AuthorizationStatus> {
        self.status.stream()
    }

    /// Number of times authorization was requested.
    #[must_use]
    pub fn request_count(&self) -> u32 {
        self.requests.get()
    }

    /// Ask for when-in-use authorization. Only the first request while the
    /// status is undetermined prompts.
    pub fn request_when_in_use_authorization(&self) {
        self.requests.set(self.requests.get() + 1);
        if self.status.get() != AuthorizationStatus::NotDetermined {
            return;
        }
        let decided = match self.policy {
            AuthorizationPolicy::Grant => AuthorizationStatus::AuthorizedWhenInUse,
            AuthorizationPolicy::Deny => AuthorizationStatus::Denied,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(status = ?decided, "location authorization decided");
        // Unvalidated property: the write cannot fail.
        let _ = self.status.set(decided);
    }
}

impl fmt::Debug for LocationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationManager")
            .field("policy", &self.policy)
            .field("status", &self.status.get())
            .field("requests", &self.requests.get())
            .finish()
    }
}
