//! SAO negotiation states.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Lifecycle states of a negotiation session.
///
/// `idle -> proposing -> responding -> { agreed | broken | timed_out }`.
/// `proposing` collapses into `responding` on the first buyer offer;
/// `responding` repeats once per round. The three closing states are
/// absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationState {
    Idle,
    Proposing,
    Responding,
    Agreed,
    Broken,
    TimedOut,
}

impl NegotiationState {
    /// Wire tag for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationState::Idle => "idle",
            NegotiationState::Proposing => "proposing",
            NegotiationState::Responding => "responding",
            NegotiationState::Agreed => "agreed",
            NegotiationState::Broken => "broken",
            NegotiationState::TimedOut => "timed_out",
        }
    }
}

impl StateMachine for NegotiationState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use NegotiationState::*;
        matches!(
            (self, target),
            (Idle, Proposing)
                | (Proposing, Responding)
                | (Proposing, Agreed)
                | (Proposing, Broken)
                | (Proposing, TimedOut)
                | (Responding, Responding)
                | (Responding, Agreed)
                | (Responding, Broken)
                | (Responding, TimedOut)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use NegotiationState::*;
        match self {
            Idle => vec![Proposing],
            Proposing => vec![Responding, Agreed, Broken, TimedOut],
            Responding => vec![Responding, Agreed, Broken, TimedOut],
            Agreed | Broken | TimedOut => vec![],
        }
    }
}
