#![forbid(unsafe_code)]

//! Failures that travel through streams and bindings.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Transform | `try_map` closure returned `Err` | Derived stream errors, then terminates |
//! | Bind target | Bound setter rejected a value | Reported on the scope's error channel, binding released |
//! | Source | Producer called `Subject::error` | Delivered to every subscriber, subject terminates |
//!
//! Disposal never fails: releasing a stale or already-disposed subscription
//! is a no-op that reports `false`.

use std::fmt;

/// A settable target rejected a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindError {
    target: String,
    message: String,
}

impl BindError {
    /// Create a bind error for the named target.
    #[must_use]
    pub fn new(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Name of the property or setter that rejected the value.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Human-readable rejection reason.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot set {}: {}", self.target, self.message)
    }
}

impl std::error::Error for BindError {}

/// Errors delivered to observers as [`Notification::Error`](crate::Notification::Error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A fallible transform failed; the derived stream it belongs to is over.
    Transform {
        operator: &'static str,
        message: String,
    },
    /// A bound setter rejected a value.
    BindTarget(BindError),
    /// The source itself signalled a failure.
    Source(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transform { operator, message } => {
                write!(f, "{operator} transform failed: {message}")
            }
            Self::BindTarget(err) => write!(f, "binding failed: {err}"),
            Self::Source(message) => write!(f, "source failed: {message}"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BindTarget(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BindError> for StreamError {
    fn from(err: BindError) -> Self {
        Self::BindTarget(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn bind_error_display_names_target() {
        let err = BindError::new("camera", "zoom 40 outside [2, 21]");
        assert_eq!(err.to_string(), "cannot set camera: zoom 40 outside [2, 21]");
        assert_eq!(err.target(), "camera");
    }

    #[test]
    fn bind_target_exposes_source() {
        let err = StreamError::from(BindError::new("rotation", "not finite"));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("binding failed"));
    }

    #[test]
    fn transform_display() {
        let err = StreamError::Transform {
            operator: "try_map",
            message: "bad input".into(),
        };
        assert_eq!(err.to_string(), "try_map transform failed: bad input");
        assert!(err.source().is_none());
    }
}
