#![forbid(unsafe_code)]

use thiserror::Error;
use vizkit_reactive::ListenerError;

use crate::input::{Action, InputSource};

pub type Result<T> = std::result::Result<T, EventError>;

/// Input contract violations and delivery failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("{origin} state received an action it cannot apply: {action:?}")]
    UnexpectedAction { origin: InputSource, action: Action },

    #[error("unknown action code: {0}")]
    UnknownActionCode(i32),

    #[error("unknown mouse button code: {0}")]
    UnknownMouseButtonCode(i32),

    #[error("input channel closed")]
    ChannelClosed,
}

impl From<EventError> for ListenerError {
    fn from(err: EventError) -> Self {
        ListenerError::contract(err)
    }
}
