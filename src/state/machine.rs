use std::fmt;

use super::error::{StateError, StateResult};
use super::{event::StateTransition, DispatchEvent, DispatchState};

/// Records the single role decision a process makes. Once settled, every
/// further event is rejected.
#[derive(Debug, Default)]
pub struct StateMachine {
    settled: Option<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DispatchState {
        self.settled.map_or(DispatchState::Start, |transition| transition.to)
    }

    pub fn can_transition(&self, event: DispatchEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: DispatchEvent) -> Option<DispatchState> {
        self.settled.is_none().then(|| event.target())
    }

    pub fn transition(&mut self, event: DispatchEvent) -> StateResult<DispatchState> {
        let from = self.state();
        let Some(to) = self.next_state(event) else {
            tracing::warn!(?from, ?event, "process role already decided");
            return Err(StateError::InvalidStateTransition { from, event });
        };
        tracing::debug!(?from, ?event, ?to, "process role decided");
        self.settled = Some(StateTransition { from, event, to });
        Ok(to)
    }

    /// The transition that settled the role, if any.
    pub fn settled_by(&self) -> Option<StateTransition> {
        self.settled
    }
}

impl fmt::Display for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.state() {
            DispatchState::Start => "start",
            DispatchState::PrimaryRunning => "primary",
            DispatchState::CommandForwarded => "forwarded",
            DispatchState::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: [DispatchEvent; 3] = [
        DispatchEvent::LaunchPrimary,
        DispatchEvent::ForwardCommand,
        DispatchEvent::RejectCommand,
    ];

    #[test]
    fn fresh_machine_starts_unsettled() {
        let machine = StateMachine::new();
        assert_eq!(machine.state(), DispatchState::Start);
        assert!(machine.settled_by().is_none());
        assert_eq!(machine.to_string(), "start");
    }

    #[test]
    fn each_event_settles_into_its_terminal_role() {
        for event in EVENTS {
            let mut machine = StateMachine::new();
            let state = machine.transition(event).unwrap();
            assert_eq!(state, event.target());
            assert!(state.is_terminal());
            assert_eq!(
                machine.settled_by(),
                Some(StateTransition {
                    from: DispatchState::Start,
                    event,
                    to: state
                })
            );
        }
    }

    #[test]
    fn settled_machine_rejects_every_event_and_keeps_role() {
        let mut machine = StateMachine::new();
        machine.transition(DispatchEvent::ForwardCommand).unwrap();

        for event in EVENTS {
            assert!(!machine.can_transition(event));
            let err = machine.transition(event).unwrap_err();
            assert!(matches!(
                err,
                StateError::InvalidStateTransition {
                    from: DispatchState::CommandForwarded,
                    ..
                }
            ));
        }
        assert_eq!(machine.state(), DispatchState::CommandForwarded);
        assert_eq!(machine.to_string(), "forwarded");
    }
}
