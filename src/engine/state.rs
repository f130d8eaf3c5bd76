//! engine::state
//!
//! Per-controller bookkeeping for one run pair.

use crate::core::types::{BranchName, RunId};

/// Branch bookkeeping between pre-run and post-run.
///
/// Both fields are set together, and only when the run asked for a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchState {
    /// The branch the run asked to operate on.
    pub requested_branch: Option<BranchName>,
    /// The branch that was active before the switch.
    pub original_branch: Option<BranchName>,
}

impl BranchState {
    /// State for a run that switched from `original` to `requested`.
    pub fn switched(requested: BranchName, original: BranchName) -> Self {
        Self {
            requested_branch: Some(requested),
            original_branch: Some(original),
        }
    }

    pub fn is_switched(&self) -> bool {
        self.original_branch.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Lifecycle phase of a controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    /// No run in flight.
    #[default]
    Idle,
    /// Pre-run completed; waiting for the run to finish.
    AwaitingRun { run_id: RunId },
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let state = BranchState::default();
        assert!(state.requested_branch.is_none());
        assert!(!state.is_switched());
    }

    #[test]
    fn clear_resets_both_fields() {
        let mut state = BranchState::switched(
            BranchName::new("exp").unwrap(),
            BranchName::new("main").unwrap(),
        );
        assert!(state.is_switched());
        state.clear();
        assert_eq!(state, BranchState::default());
    }

    #[test]
    fn phase_defaults_to_idle() {
        assert!(Phase::default().is_idle());
        let awaiting = Phase::AwaitingRun {
            run_id: RunId::new("r").unwrap(),
        };
        assert!(!awaiting.is_idle());
    }
}
