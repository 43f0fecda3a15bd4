//! Pipeline state machine

use serde::Serialize;
use std::fmt;

/// Where a run currently stands
///
/// Each non-terminal state names the stage that runs next. `Done` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Discovering,
    Transferring,
    Verifying,
    AwaitingDeletionConfirmation,
    Deleting,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }

        matches!(
            (self, next),
            (Discovering, Transferring)
                // empty manifest
                | (Discovering, Done)
                // copy declined before it started
                | (Transferring, Done)
                | (Transferring, Verifying)
                | (Verifying, AwaitingDeletionConfirmation)
                | (AwaitingDeletionConfirmation, Deleting)
                // deletion declined
                | (AwaitingDeletionConfirmation, Done)
                | (Deleting, Done)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Discovering => "discovering",
            PipelineState::Transferring => "transferring",
            PipelineState::Verifying => "verifying",
            PipelineState::AwaitingDeletionConfirmation => "awaiting deletion confirmation",
            PipelineState::Deleting => "deleting",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(label)
    }
}
