use super::model::DispatchState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEvent {
    LaunchPrimary,
    ForwardCommand,
    RejectCommand,
}

impl DispatchEvent {
    /// Role the process settles in when this event is applied to `Start`.
    pub const fn target(self) -> DispatchState {
        match self {
            Self::LaunchPrimary => DispatchState::PrimaryRunning,
            Self::ForwardCommand => DispatchState::CommandForwarded,
            Self::RejectCommand => DispatchState::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: DispatchState,
    pub event: DispatchEvent,
    pub to: DispatchState,
}
