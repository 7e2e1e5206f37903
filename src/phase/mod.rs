//! # Processing Phases
//!
//! The asynchronous message-processing phase pipeline.
//!
//! ## Overview
//!
//! A [`MessagePhase`] is a named stage with a defined position in the total
//! ordering of phases; the flow-processing phase always sorts after
//! validation. [`FlowProcessingPhase`] drives one message from reception
//! through policy application, routed execution, and response delivery,
//! signalling its one-shot [`PhaseResultNotifier`] exactly once per message.
//!
//! ## Components
//!
//! - [`FlowProcessingPhase`]: the phase state machine itself
//! - [`MessageProcessContext`]: per-message collaborators (source, handler,
//!   transaction config)
//! - [`PhaseResultNotifier`] / [`PhaseResultHandle`]: one-shot completion
//!   token and its awaiting side
//! - [`ResponseCompletion`]: at-most-once response-delivery token
//! - [`WorkScheduler`] / [`TokioWorkScheduler`]: bounded worker pool the
//!   asynchronous phase unit is submitted to

pub mod context;
pub mod flow_processing;
pub mod notifier;

pub use context::{
    MessageProcessContext, MessageSource, PhaseWork, ScheduledWorkPermit, SchedulingError,
    TokioWorkScheduler, WorkScheduler,
};
pub use flow_processing::{FlowProcessingPhase, FlowProcessingTemplate};
pub use notifier::{PhaseResult, PhaseResultHandle, PhaseResultNotifier, ResponseCompletion};

use std::fmt;

/// Position of a phase in the total phase ordering.
///
/// Validation always sorts before flow processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhaseRank {
    Validation,
    FlowProcessing,
}

/// A named stage in the message-processing pipeline.
pub trait MessagePhase: Send + Sync {
    fn name(&self) -> &str;

    fn rank(&self) -> PhaseRank;
}

/// States the flow-processing phase moves through for one message.
///
/// Transitions are strictly sequential per message; the terminal states are
/// entered exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseState {
    Received,
    PolicyApplied,
    Routed,
    Responding,
    Completed,
    Failed,
}

impl PhaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::PolicyApplied => write!(f, "policy_applied"),
            Self::Routed => write!(f, "routed"),
            Self::Responding => write!(f, "responding"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubPhase {
        rank: PhaseRank,
        name: &'static str,
    }

    impl MessagePhase for StubPhase {
        fn name(&self) -> &str {
            self.name
        }

        fn rank(&self) -> PhaseRank {
            self.rank
        }
    }

    #[test]
    fn test_validation_sorts_before_flow_processing() {
        assert!(PhaseRank::Validation < PhaseRank::FlowProcessing);

        let mut phases: Vec<Box<dyn MessagePhase>> = vec![
            Box::new(StubPhase {
                rank: PhaseRank::FlowProcessing,
                name: "flow-processing",
            }),
            Box::new(StubPhase {
                rank: PhaseRank::Validation,
                name: "validation",
            }),
        ];
        phases.sort_by_key(|phase| phase.rank());
        assert_eq!(phases[0].name(), "validation");
        assert_eq!(phases[1].name(), "flow-processing");
    }

    #[test]
    fn test_terminal_states() {
        assert!(PhaseState::Completed.is_terminal());
        assert!(PhaseState::Failed.is_terminal());
        assert!(!PhaseState::Received.is_terminal());
        assert!(!PhaseState::Responding.is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PhaseState::PolicyApplied.to_string(), "policy_applied");
    }
}
