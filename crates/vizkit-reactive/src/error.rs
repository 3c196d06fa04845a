#![forbid(unsafe_code)]

//! Listener outcomes and listener failures.

use std::error::Error;

use thiserror::Error;

/// Whether dispatch continues after a listener returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Hand the value on to the next listener.
    #[default]
    Continue,
    /// Stop: no further listener runs for the current `set` call.
    Consume,
}

impl Dispatch {
    /// `Consume` when `consumed` is true, `Continue` otherwise.
    #[inline]
    #[must_use]
    pub fn consume_if(consumed: bool) -> Self {
        if consumed {
            Self::Consume
        } else {
            Self::Continue
        }
    }

    #[inline]
    #[must_use]
    pub fn is_consumed(self) -> bool {
        matches!(self, Self::Consume)
    }
}

impl From<bool> for Dispatch {
    fn from(consumed: bool) -> Self {
        Self::consume_if(consumed)
    }
}

/// Result type every listener callback returns.
pub type ListenerResult = Result<Dispatch, ListenerError>;

/// A failure raised by a listener.
///
/// Listener failures are fail-fast: the error aborts the rest of the
/// dispatch and is returned from the `set` call that started it. The value
/// written by that `set` stays stored.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listener received input that breaks its contract with the
    /// producer (for example an action code the receiver cannot handle).
    #[error("contract violation: {0}")]
    Contract(#[source] Box<dyn Error + 'static>),

    /// The listener's own work failed.
    #[error("listener failed: {0}")]
    Callback(#[source] Box<dyn Error + 'static>),
}

impl ListenerError {
    #[must_use]
    pub fn contract(err: impl Into<Box<dyn Error + 'static>>) -> Self {
        Self::Contract(err.into())
    }

    #[must_use]
    pub fn callback(err: impl Into<Box<dyn Error + 'static>>) -> Self {
        Self::Callback(err.into())
    }

    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    /// Borrow the wrapped error as a concrete type, if it is one.
    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Contract(inner) | Self::Callback(inner) => inner.downcast_ref::<E>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn consume_if_maps_bool() {
        assert_eq!(Dispatch::consume_if(true), Dispatch::Consume);
        assert_eq!(Dispatch::from(false), Dispatch::Continue);
        assert!(Dispatch::Consume.is_consumed());
        assert!(!Dispatch::default().is_consumed());
    }

    #[test]
    fn downcast_reaches_wrapped_error() {
        let err = ListenerError::callback(Boom);
        assert!(err.downcast_ref::<Boom>().is_some());
        assert!(!err.is_contract_violation());
        assert_eq!(err.to_string(), "listener failed: boom");
    }

    #[test]
    fn contract_accepts_plain_messages() {
        let err = ListenerError::contract("unexpected action");
        assert!(err.is_contract_violation());
        assert_eq!(err.to_string(), "contract violation: unexpected action");
        assert!(std::error::Error::source(&err).is_some());
    }
}
