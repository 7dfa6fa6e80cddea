//! Wire models for the labeling backend.
//!
//! Field names follow the backend's JSON exactly. Timestamps are naive
//! (the backend stores local wall-clock time without an offset).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;

// =============================================================================
// LINE ITEM STATUS
// =============================================================================

/// Labeling status of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    Unlabeled,
    Confirmed,
    Approved,
    Rejected,
}

impl LineItemStatus {
    /// Every status, in workflow order.
    pub const ALL: [LineItemStatus; 4] = [
        LineItemStatus::Unlabeled,
        LineItemStatus::Confirmed,
        LineItemStatus::Approved,
        LineItemStatus::Rejected,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemStatus::Unlabeled => "UNLABELED",
            LineItemStatus::Confirmed => "CONFIRMED",
            LineItemStatus::Approved => "APPROVED",
            LineItemStatus::Rejected => "REJECTED",
        }
    }

    /// Counts toward "completed" work on dashboards.
    pub fn is_completed(&self) -> bool {
        matches!(self, LineItemStatus::Confirmed | LineItemStatus::Approved)
    }
}

impl fmt::Display for LineItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineItemStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNLABELED" => Ok(LineItemStatus::Unlabeled),
            "CONFIRMED" => Ok(LineItemStatus::Confirmed),
            "APPROVED" => Ok(LineItemStatus::Approved),
            "REJECTED" => Ok(LineItemStatus::Rejected),
            other => Err(Error::InvalidInput(format!(
                "Unknown line item status '{}'. Expected one of: UNLABELED, CONFIRMED, APPROVED, REJECTED",
                other
            ))),
        }
    }
}

/// Per-status counts as sent by the backend (`{"UNLABELED": 3, ...}`).
pub type StatusCounts = BTreeMap<String, u64>;

/// Look up a status in a backend count map, treating absence as zero.
pub fn status_count(counts: &StatusCounts, status: LineItemStatus) -> u64 {
    counts.get(status.as_str()).copied().unwrap_or(0)
}

// =============================================================================
// MESSAGE ROLE
// =============================================================================

/// Speaker of a line message. Roles are free text on the backend; unknown
/// values are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    ToolCall,
    ToolResponse,
    Other(String),
}

impl MessageRole {
    /// Roles offered when editing a message.
    pub const EDITABLE: [MessageRole; 5] = [
        MessageRole::User,
        MessageRole::Assistant,
        MessageRole::System,
        MessageRole::ToolCall,
        MessageRole::ToolResponse,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::ToolCall => "tool_call",
            MessageRole::ToolResponse => "tool_response",
            MessageRole::Other(role) => role,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        match self {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
            MessageRole::System => "System",
            MessageRole::ToolCall => "Tool Call",
            MessageRole::ToolResponse => "Tool Response",
            MessageRole::Other(role) => role,
        }
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, MessageRole::ToolCall | MessageRole::ToolResponse)
    }
}

impl From<String> for MessageRole {
    fn from(role: String) -> Self {
        match role.to_lowercase().as_str() {
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            "system" => MessageRole::System,
            "tool_call" => MessageRole::ToolCall,
            "tool_response" => MessageRole::ToolResponse,
            _ => MessageRole::Other(role),
        }
    }
}

impl From<&str> for MessageRole {
    fn from(role: &str) -> Self {
        MessageRole::from(role.to_string())
    }
}

impl From<MessageRole> for String {
    fn from(role: MessageRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PROJECTS
// =============================================================================

/// Project as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    pub owner_id: i64,
}

/// Payload for creating a project (superuser only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

/// State of the backend's asynchronous import job for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectState {
    Pending,
    Started,
    Progress,
    Retry,
    Success,
    Failure,
    Revoked,
    Other(String),
}

impl ProjectState {
    pub fn as_str(&self) -> &str {
        match self {
            ProjectState::Pending => "PENDING",
            ProjectState::Started => "STARTED",
            ProjectState::Progress => "PROGRESS",
            ProjectState::Retry => "RETRY",
            ProjectState::Success => "SUCCESS",
            ProjectState::Failure => "FAILURE",
            ProjectState::Revoked => "REVOKED",
            ProjectState::Other(state) => state,
        }
    }

    /// Samples are available for review.
    pub fn is_ready(&self) -> bool {
        matches!(self, ProjectState::Success)
    }

    /// The import job will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProjectState::Success | ProjectState::Failure | ProjectState::Revoked
        )
    }
}

impl From<String> for ProjectState {
    fn from(state: String) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "PENDING" => ProjectState::Pending,
            "STARTED" => ProjectState::Started,
            "PROGRESS" => ProjectState::Progress,
            "RETRY" => ProjectState::Retry,
            "SUCCESS" => ProjectState::Success,
            "FAILURE" => ProjectState::Failure,
            "REVOKED" => ProjectState::Revoked,
            _ => ProjectState::Other(state),
        }
    }
}

impl From<ProjectState> for String {
    fn from(state: ProjectState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user task aggregate within a project. Status counts are only present
/// on dashboard responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTaskSummary {
    pub user_id: i64,
    #[serde(default)]
    pub full_name: Option<String>,
    pub email: String,
    pub task_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlabeled: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected: Option<u64>,
}

impl UserTaskSummary {
    /// Name to show, falling back to email.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

/// Import status plus task allocation overview for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub state: ProjectState,
    #[serde(default)]
    pub info: Option<JsonValue>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub num_samples: Option<u64>,
    #[serde(default)]
    pub num_task_assigned: Option<u64>,
    #[serde(default)]
    pub num_task_not_assigned: Option<u64>,
    #[serde(default)]
    pub user_task_summary: Option<Vec<UserTaskSummary>>,
}

impl ProjectStatus {
    pub fn num_samples(&self) -> u64 {
        self.num_samples.unwrap_or(0)
    }

    pub fn num_task_not_assigned(&self) -> u64 {
        self.num_task_not_assigned.unwrap_or(0)
    }

    pub fn user_task_summary(&self) -> &[UserTaskSummary] {
        self.user_task_summary.as_deref().unwrap_or(&[])
    }

    /// Import progress reported by the ingestion job in `info`, e.g.
    /// `"28.70% - 961/3349"` or `"45%"`.
    pub fn import_progress(&self) -> Option<ImportProgress> {
        let info = self.info.as_ref()?;
        let text = match info {
            JsonValue::Object(map) => match map.get("content").or_else(|| map.get("message")) {
                Some(JsonValue::String(s)) => s.clone(),
                _ => info.to_string(),
            },
            _ => return None,
        };
        ImportProgress::parse(&text)
    }
}

static PROGRESS_WITH_COUNTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+\.?\d*)%\s*-\s*(\d+)/(\d+)").expect("valid progress regex")
});
static PROGRESS_PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)%").expect("valid percent regex"));

/// Progress of a running import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportProgress {
    pub percentage: f64,
    pub current: Option<u64>,
    pub total: Option<u64>,
}

impl ImportProgress {
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(caps) = PROGRESS_WITH_COUNTS.captures(text) {
            return Some(Self {
                percentage: caps[1].parse().ok()?,
                current: caps[2].parse().ok(),
                total: caps[3].parse().ok(),
            });
        }
        let caps = PROGRESS_PERCENT.captures(text)?;
        Some(Self {
            percentage: caps[1].parse().ok()?,
            current: None,
            total: None,
        })
    }
}

// =============================================================================
// LINE ITEMS
// =============================================================================

/// One turn of a conversational sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemMessage {
    pub id: i64,
    pub line_message_index: i64,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub feedback: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A conversational sample (line item).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub project_id: i64,
    /// 1-based ordinal within the project.
    pub line_index: u32,
    pub status: LineItemStatus,
    #[serde(default)]
    pub tools: Vec<JsonValue>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub line_messages: Vec<LineItemMessage>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One page of line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemsPage {
    pub data: Vec<LineItem>,
    pub total_count: u64,
    pub num_pages: u32,
    #[serde(default)]
    pub status_counts: StatusCounts,
}

impl LineItemsPage {
    /// Row with the given ordinal, if it is on this page.
    pub fn find(&self, line_index: u32) -> Option<&LineItem> {
        self.data.iter().find(|item| item.line_index == line_index)
    }
}

/// Message entry of a confirm/approve/reject snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMessageSnapshot {
    pub id: i64,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Full content snapshot submitted together with a target status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemConfirmRequest {
    pub line_messages: Vec<LineMessageSnapshot>,
    pub tools: Option<Vec<JsonValue>>,
    pub feedback: Option<String>,
    pub status: LineItemStatus,
}

/// Single-message edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMessageRequest {
    pub role: MessageRole,
    pub content: String,
}

// =============================================================================
// TASK ALLOCATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignTaskRequest {
    pub user_id: i64,
    pub num_samples: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyTaskRequest {
    pub user_id: i64,
    pub new_num_samples: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteUserTasksRequest {
    pub user_id: i64,
}

// =============================================================================
// EXPORT
// =============================================================================

/// Filtered JSONL export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDownloadRequest {
    pub limit: Option<u64>,
    pub include_statuses: Vec<LineItemStatus>,
    pub file_name: String,
}

// =============================================================================
// DASHBOARDS
// =============================================================================

/// Admin dashboard row: one project with per-user status breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminDashboardProject {
    pub project_id: i64,
    pub project_name: String,
    #[serde(default)]
    pub project_description: Option<String>,
    pub num_samples: u64,
    #[serde(default)]
    pub user_task_summary: Vec<UserTaskSummary>,
}

/// User dashboard row: the caller's tasks in one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDashboardProject {
    #[serde(default)]
    pub project_id: Option<i64>,
    pub project_name: String,
    pub task_count: u64,
    #[serde(default)]
    pub status_counts: StatusCounts,
}

// =============================================================================
// USERS & AUTH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: i64,
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserPublic {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersPage {
    pub data: Vec<UserPublic>,
    pub count: u64,
}

/// Admin user creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

/// Self-service signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegister {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Admin user update; only present fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
}

/// Profile update for the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdateMe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserUpdateMe {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePassword {
    pub current_password: String,
    pub new_password: String,
}

/// Bearer token issued by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Plain acknowledgement body (`{"message": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

// =============================================================================
// AUDIT LOGS
// =============================================================================

/// Kind of change recorded in an audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    Create,
    Update,
    StatusChange,
    Delete,
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::StatusChange => "STATUS_CHANGE",
            AuditAction::Delete => "DELETE",
            AuditAction::Other(action) => action,
        }
    }
}

impl From<String> for AuditAction {
    fn from(action: String) -> Self {
        match action.to_ascii_uppercase().as_str() {
            "CREATE" => AuditAction::Create,
            "UPDATE" => AuditAction::Update,
            "STATUS_CHANGE" => AuditAction::StatusChange,
            "DELETE" => AuditAction::Delete,
            _ => AuditAction::Other(action),
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemAuditLog {
    pub id: i64,
    pub line_item_id: i64,
    pub project_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub action: AuditAction,
    #[serde(default)]
    pub old_status: Option<LineItemStatus>,
    #[serde(default)]
    pub new_status: Option<LineItemStatus>,
    #[serde(default)]
    pub old_feedback: Option<String>,
    #[serde(default)]
    pub new_feedback: Option<String>,
    #[serde(default)]
    pub old_tools: Option<JsonValue>,
    #[serde(default)]
    pub new_tools: Option<JsonValue>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub additional_data: Option<JsonValue>,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemMessageAuditLog {
    pub id: i64,
    pub line_item_message_id: i64,
    pub line_item_id: i64,
    pub project_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub action: AuditAction,
    #[serde(default)]
    pub old_role: Option<String>,
    #[serde(default)]
    pub new_role: Option<String>,
    #[serde(default)]
    pub old_content: Option<String>,
    #[serde(default)]
    pub new_content: Option<String>,
    #[serde(default)]
    pub old_feedback: Option<String>,
    #[serde(default)]
    pub new_feedback: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub additional_data: Option<JsonValue>,
    pub timestamp: NaiveDateTime,
}

/// One page of audit log entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogPage<T> {
    pub data: Vec<T>,
    pub total_count: u64,
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&LineItemStatus::Unlabeled).unwrap();
        assert_eq!(json, "\"UNLABELED\"");
        let parsed: LineItemStatus = serde_json::from_str("\"APPROVED\"").unwrap();
        assert_eq!(parsed, LineItemStatus::Approved);
    }

    #[test]
    fn test_status_from_str_case_insensitive() {
        assert_eq!(
            "confirmed".parse::<LineItemStatus>().unwrap(),
            LineItemStatus::Confirmed
        );
        assert!("done".parse::<LineItemStatus>().is_err());
    }

    #[test]
    fn test_status_completed() {
        assert!(LineItemStatus::Confirmed.is_completed());
        assert!(LineItemStatus::Approved.is_completed());
        assert!(!LineItemStatus::Unlabeled.is_completed());
        assert!(!LineItemStatus::Rejected.is_completed());
    }

    #[test]
    fn test_role_unknown_preserved() {
        let role: MessageRole = serde_json::from_str("\"narrator\"").unwrap();
        assert_eq!(role, MessageRole::Other("narrator".to_string()));
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"narrator\"");
    }

    #[test]
    fn test_role_known_values() {
        let role: MessageRole = serde_json::from_str("\"tool_call\"").unwrap();
        assert_eq!(role, MessageRole::ToolCall);
        assert!(role.is_tool());
        assert_eq!(role.label(), "Tool Call");
    }

    #[test]
    fn test_project_state_other_preserved() {
        let state: ProjectState = serde_json::from_str("\"INGESTING\"").unwrap();
        assert_eq!(state, ProjectState::Other("INGESTING".to_string()));
        assert!(!state.is_ready());
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_project_state_terminal() {
        assert!(ProjectState::Success.is_ready());
        assert!(ProjectState::Failure.is_terminal());
        assert!(!ProjectState::Pending.is_terminal());
    }

    #[test]
    fn test_line_items_page_parses_backend_shape() {
        let body = json!({
            "data": [{
                "id": 11,
                "project_id": 2,
                "line_index": 1,
                "status": "UNLABELED",
                "tools": [],
                "feedback": null,
                "line_messages": [{
                    "id": 100,
                    "line_message_index": 0,
                    "role": "user",
                    "content": "hi",
                    "feedback": null,
                    "created_at": "2025-03-01T10:00:00.123456",
                    "updated_at": "2025-03-01T10:00:00.123456"
                }],
                "created_at": "2025-03-01T10:00:00",
                "updated_at": "2025-03-01T10:00:00"
            }],
            "total_count": 1,
            "num_pages": 1,
            "status_counts": {"UNLABELED": 1}
        });
        let page: LineItemsPage = serde_json::from_value(body).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.find(1).map(|i| i.id), Some(11));
        assert!(page.find(2).is_none());
        assert_eq!(status_count(&page.status_counts, LineItemStatus::Unlabeled), 1);
        assert_eq!(status_count(&page.status_counts, LineItemStatus::Rejected), 0);
    }

    #[test]
    fn test_project_status_defaults() {
        let status: ProjectStatus = serde_json::from_value(json!({"state": "PENDING"})).unwrap();
        assert_eq!(status.num_samples(), 0);
        assert_eq!(status.num_task_not_assigned(), 0);
        assert!(status.user_task_summary().is_empty());
    }

    #[test]
    fn test_import_progress_from_info() {
        let status: ProjectStatus = serde_json::from_value(json!({
            "state": "PROGRESS",
            "info": {"content": "28.70% - 961/3349"}
        }))
        .unwrap();
        let progress = status.import_progress().unwrap();
        assert_eq!(progress.percentage, 28.70);
        assert_eq!(progress.current, Some(961));
        assert_eq!(progress.total, Some(3349));

        let bare = ImportProgress::parse("halfway: 45%").unwrap();
        assert_eq!(bare.percentage, 45.0);
        assert_eq!(bare.total, None);
        assert!(ImportProgress::parse("queued").is_none());
    }

    #[test]
    fn test_user_display_name_falls_back_to_email() {
        let user = UserPublic {
            id: 1,
            email: "a@example.com".into(),
            is_active: true,
            is_superuser: false,
            full_name: Some("  ".into()),
        };
        assert_eq!(user.display_name(), "a@example.com");
    }

    #[test]
    fn test_update_me_skips_absent_fields() {
        let update = UserUpdateMe {
            full_name: Some("New Name".into()),
            email: None,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"full_name": "New Name"})
        );
    }
}
