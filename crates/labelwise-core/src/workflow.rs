//! Client-side view of the line item status workflow.
//!
//! The backend owns every transition. The client only decides which
//! actions to offer for a given role and builds the snapshot each action
//! submits.

use std::fmt;

use tracing::trace;

use crate::content::normalize_content;
use crate::models::{
    LineItem, LineItemConfirmRequest, LineItemMessage, LineItemStatus, LineMessageSnapshot,
    MessageRole,
};

/// Action a reviewer can take on a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleAction {
    Confirm,
    Approve,
    Reject,
}

impl SampleAction {
    pub const ALL: [SampleAction; 3] = [
        SampleAction::Confirm,
        SampleAction::Approve,
        SampleAction::Reject,
    ];

    /// Status the snapshot asks the backend to set.
    pub fn target_status(&self) -> LineItemStatus {
        match self {
            SampleAction::Confirm => LineItemStatus::Confirmed,
            SampleAction::Approve => LineItemStatus::Approved,
            SampleAction::Reject => LineItemStatus::Rejected,
        }
    }

    pub fn requires_superuser(&self) -> bool {
        matches!(self, SampleAction::Approve | SampleAction::Reject)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            SampleAction::Confirm => "confirm",
            SampleAction::Approve => "approve",
            SampleAction::Reject => "reject",
        }
    }
}

impl fmt::Display for SampleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Actions offered to a user. Confirm is always offered; approve and reject
/// only to superusers. The current status does not narrow the set.
pub fn available_actions(is_superuser: bool) -> Vec<SampleAction> {
    SampleAction::ALL
        .into_iter()
        .filter(|action| is_superuser || !action.requires_superuser())
        .collect()
}

/// Whether `action` is offered to this user.
pub fn is_action_available(action: SampleAction, is_superuser: bool) -> bool {
    is_superuser || !action.requires_superuser()
}

/// Badge shown for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBadge {
    Pending,
    Confirmed,
    Completed,
    Rejected,
}

impl StatusBadge {
    pub fn label(&self) -> &'static str {
        match self {
            StatusBadge::Pending => "pending",
            StatusBadge::Confirmed => "confirmed",
            StatusBadge::Completed => "completed",
            StatusBadge::Rejected => "rejected",
        }
    }
}

impl From<LineItemStatus> for StatusBadge {
    fn from(status: LineItemStatus) -> Self {
        match status {
            LineItemStatus::Unlabeled => StatusBadge::Pending,
            LineItemStatus::Confirmed => StatusBadge::Confirmed,
            LineItemStatus::Approved => StatusBadge::Completed,
            LineItemStatus::Rejected => StatusBadge::Rejected,
        }
    }
}

/// Builds the snapshot submitted by `action`: every message with its content
/// passed through the think-block join rule, the item's tools, no feedback,
/// and the action's target status.
pub fn build_snapshot(item: &LineItem, action: SampleAction) -> LineItemConfirmRequest {
    let line_messages = item
        .line_messages
        .iter()
        .map(|message| {
            trace!(message_id = message.id, "Normalizing message for snapshot");
            LineMessageSnapshot {
                id: message.id,
                role: message.role.clone(),
                content: normalize_content(&message.content),
                feedback: None,
            }
        })
        .collect();

    LineItemConfirmRequest {
        line_messages,
        tools: Some(item.tools.clone()),
        feedback: None,
        status: action.target_status(),
    }
}

/// Messages shown to this user: system prompts are hidden from
/// non-superusers.
pub fn visible_messages(item: &LineItem, is_superuser: bool) -> Vec<&LineItemMessage> {
    item.line_messages
        .iter()
        .filter(|message| is_superuser || message.role != MessageRole::System)
        .collect()
}
