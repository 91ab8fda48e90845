use super::event::DispatchEvent;
use super::model::DispatchState;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid dispatch transition: from {from:?} using event {event:?}")]
    InvalidStateTransition {
        from: DispatchState,
        event: DispatchEvent,
    },
}
