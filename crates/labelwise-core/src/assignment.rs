//! Task allocation rules used before calling the assignment endpoints.

use crate::error::{Error, Result};
use crate::models::{AssignTaskRequest, ModifyTaskRequest, UserPublic, UserTaskSummary};

/// State of the "assign new user" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentForm {
    selected_user: Option<i64>,
    num_samples: u64,
    num_task_not_assigned: u64,
}

impl AssignmentForm {
    pub fn new(num_task_not_assigned: u64) -> Self {
        Self {
            selected_user: None,
            num_samples: 1,
            num_task_not_assigned,
        }
    }

    pub fn selected_user(&self) -> Option<i64> {
        self.selected_user
    }

    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }

    pub fn num_task_not_assigned(&self) -> u64 {
        self.num_task_not_assigned
    }

    /// Largest value the sample count input accepts.
    pub fn max_samples(&self) -> u64 {
        self.num_task_not_assigned.max(1)
    }

    pub fn select_user(&mut self, user_id: Option<i64>) {
        self.selected_user = user_id;
    }

    /// Sets the sample count, clamped to `[1, max_samples()]`.
    pub fn set_num_samples(&mut self, value: u64) {
        self.num_samples = value.clamp(1, self.max_samples());
    }

    /// Refresh the unassigned count after the project status changes.
    pub fn set_num_task_not_assigned(&mut self, value: u64) {
        self.num_task_not_assigned = value;
        self.num_samples = self.num_samples.clamp(1, self.max_samples());
    }

    /// The assign action is enabled only with a selected user, a positive
    /// count, and unassigned samples left. No unassigned samples disables it
    /// whatever else the form holds.
    pub fn can_assign(&self) -> bool {
        self.num_task_not_assigned > 0 && self.selected_user.is_some() && self.num_samples > 0
    }

    /// Request body for the assign endpoint, resetting the form on success.
    pub fn submit(&mut self) -> Result<AssignTaskRequest> {
        if self.num_task_not_assigned == 0 {
            return Err(Error::InvalidInput(
                "No unassigned samples left in this project".to_string(),
            ));
        }
        let user_id = self
            .selected_user
            .ok_or_else(|| Error::InvalidInput("Select a user to assign".to_string()))?;
        let request = AssignTaskRequest {
            user_id,
            num_samples: self.num_samples,
        };
        self.selected_user = None;
        self.num_samples = 1;
        Ok(request)
    }
}

/// Users that do not hold tasks in the project yet.
pub fn available_users<'a>(
    users: &'a [UserPublic],
    summary: &[UserTaskSummary],
) -> Vec<&'a UserPublic> {
    users
        .iter()
        .filter(|user| !summary.iter().any(|s| s.user_id == user.id))
        .collect()
}

/// Case-insensitive match on full name or email.
pub fn filter_users<'a>(users: &[&'a UserPublic], query: &str) -> Vec<&'a UserPublic> {
    let query = query.to_lowercase();
    users
        .iter()
        .copied()
        .filter(|user| {
            user.full_name
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(&query)
                || user.email.to_lowercase().contains(&query)
        })
        .collect()
}

/// Largest task count an assigned user can be given: what they hold now
/// plus everything still unassigned.
pub fn max_modified_tasks(current_count: u64, num_task_not_assigned: u64) -> u64 {
    current_count.saturating_add(num_task_not_assigned)
}

/// Request for an edited task count, clamped to
/// `[0, max_modified_tasks(current_count, num_task_not_assigned)]`.
pub fn modify_request(
    user_id: i64,
    new_num_samples: u64,
    current_count: u64,
    num_task_not_assigned: u64,
) -> ModifyTaskRequest {
    ModifyTaskRequest {
        user_id,
        new_num_samples: new_num_samples.min(max_modified_tasks(current_count, num_task_not_assigned)),
    }
}
