//! Pending-changes notice state machine for feedq.
//!
//! This module provides a pure, side-effect-free state machine for the notice
//! shown while remote changes are queued, and for the submit gate it drives.
//! It takes events as input and produces a new state plus a list of actions.
//!
//! Rendering the notice and blocking the form are performed by feed-client's
//! render adapter, not by this module.

use crate::queue::QueueCounts;

/// Prompt shown when submitting with unacknowledged changes.
pub const CONFIRM_PROMPT: &str = "New posts have been published or removed since you began \
editing the feed. Press Cancel to go back, or OK to save the feed without them.";

/// Notice state - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoticeState {
    /// Nothing pending; submission allowed.
    #[default]
    Idle,
    /// Changes pending; notice shown and submission blocked.
    Pending {
        /// Latest queue counts.
        counts: QueueCounts,
    },
    /// Submit requested while pending; waiting on the confirmation prompt.
    Confirming {
        /// Latest queue counts.
        counts: QueueCounts,
    },
}

/// Events that drive the notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeEvent {
    /// The queue reported new counts.
    QueueChanged(QueueCounts),
    /// The user clicked the notice to pull pending changes in.
    Acknowledged,
    /// The surrounding form is being submitted.
    SubmitRequested,
    /// The user accepted the confirmation prompt.
    SubmitConfirmed,
    /// The user cancelled the confirmation prompt.
    SubmitDeclined,
}

/// Actions for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeAction {
    /// Show or update the notice with this message.
    Show(String),
    /// Hide the notice.
    Hide,
    /// Flush the full pending queue.
    FlushAll,
    /// Let the form submit.
    AllowSubmit,
    /// Hold form submission until changes are acknowledged.
    BlockSubmit,
    /// Ask the user to confirm with this prompt.
    PromptConfirm(String),
    /// Continue the submission in progress.
    ProceedSubmit,
    /// Cancel the submission in progress.
    AbortSubmit,
}

impl NoticeState {
    /// Create a notice in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    pub fn on_event(self, event: NoticeEvent) -> (Self, Vec<NoticeAction>) {
        match (self, event) {
            // Confirming holds until the prompt is answered
            (Self::Confirming { .. }, NoticeEvent::QueueChanged(counts)) => {
                (Self::Confirming { counts }, vec![])
            }
            (Self::Confirming { .. }, NoticeEvent::SubmitConfirmed) => (
                Self::Idle,
                vec![NoticeAction::Hide, NoticeAction::AllowSubmit, NoticeAction::ProceedSubmit],
            ),
            (Self::Confirming { counts }, NoticeEvent::SubmitDeclined) => {
                (Self::Pending { counts }, vec![NoticeAction::AbortSubmit])
            }

            (_, NoticeEvent::QueueChanged(counts)) => match summary(counts) {
                Some(message) => (
                    Self::Pending { counts },
                    vec![NoticeAction::Show(message), NoticeAction::BlockSubmit],
                ),
                None => (Self::Idle, vec![NoticeAction::Hide, NoticeAction::AllowSubmit]),
            },

            (Self::Pending { .. }, NoticeEvent::Acknowledged) => (
                Self::Idle,
                vec![NoticeAction::Hide, NoticeAction::FlushAll, NoticeAction::AllowSubmit],
            ),

            (Self::Idle, NoticeEvent::SubmitRequested) => {
                (Self::Idle, vec![NoticeAction::ProceedSubmit])
            }
            (Self::Pending { counts }, NoticeEvent::SubmitRequested) => (
                Self::Confirming { counts },
                vec![NoticeAction::PromptConfirm(CONFIRM_PROMPT.to_string())],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the form may submit without confirmation.
    pub fn allows_submit(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Counts behind the notice, if one is shown.
    pub fn counts(&self) -> Option<QueueCounts> {
        match self {
            Self::Idle => None,
            Self::Pending { counts } | Self::Confirming { counts } => Some(*counts),
        }
    }
}

/// Pluralized notice text, or `None` when nothing is pending.
pub fn summary(counts: QueueCounts) -> Option<String> {
    let mut parts = Vec::with_capacity(2);
    match counts.inserts {
        0 => {}
        1 => parts.push("There is 1 new post.".to_string()),
        n => parts.push(format!("There are {n} new posts.")),
    }
    match counts.removes {
        0 => {}
        1 => parts.push("There is 1 post that was deleted.".to_string()),
        n => parts.push(format!("There are {n} posts that were deleted.")),
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
