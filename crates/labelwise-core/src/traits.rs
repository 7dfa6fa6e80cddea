//! The labeling backend as seen by the client.
//!
//! `LabelingApi` is the seam between the workflows and the transport. The
//! HTTP implementation lives in `labelwise-client`; tests and the CLI talk
//! to it only through this trait.

use async_trait::async_trait;

use crate::defaults::{AUDIT_PAGE_LIMIT, LINE_ITEMS_PAGE_LIMIT};
use crate::error::Result;
use crate::models::*;

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// Query for one page of a project's line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListLineItemsRequest {
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
    /// Restrict to one status.
    pub status: Option<LineItemStatus>,
}

impl Default for ListLineItemsRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: LINE_ITEMS_PAGE_LIMIT,
            status: None,
        }
    }
}

/// Query for audit log pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    pub line_item_id: Option<i64>,
    pub page: u32,
    pub limit: u32,
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self {
            line_item_id: None,
            page: 1,
            limit: AUDIT_PAGE_LIMIT,
        }
    }
}

// =============================================================================
// API
// =============================================================================

/// Every operation the backend exposes to this client.
///
/// Implementations attach the bearer token themselves and map HTTP failures
/// onto [`crate::Error`]: 401 to `Unauthorized`, 403 to `Forbidden`, 404 to
/// `NotFound`, other non-2xx statuses to `Api` carrying the server message.
#[async_trait]
pub trait LabelingApi: Send + Sync {
    // --- auth & account ---

    /// Exchange credentials for a bearer token.
    async fn login(&self, username: &str, password: &str) -> Result<Token>;

    /// Self-service registration. Does not require a token.
    async fn signup(&self, user: &UserRegister) -> Result<UserPublic>;

    async fn read_me(&self) -> Result<UserPublic>;

    async fn update_me(&self, update: &UserUpdateMe) -> Result<UserPublic>;

    async fn update_password_me(&self, update: &UpdatePassword) -> Result<ApiMessage>;

    // --- user administration (superuser) ---

    async fn list_users(&self, skip: u32, limit: u32) -> Result<UsersPage>;

    async fn create_user(&self, user: &UserCreate) -> Result<UserPublic>;

    async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<UserPublic>;

    async fn delete_user(&self, user_id: i64) -> Result<ApiMessage>;

    // --- projects ---

    /// Projects visible to the caller.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn create_project(&self, project: &ProjectCreate) -> Result<Project>;

    async fn delete_project(&self, project_id: i64) -> Result<ApiMessage>;

    /// Import state and task allocation summary.
    async fn project_status(&self, project_id: i64) -> Result<ProjectStatus>;

    // --- samples ---

    async fn list_line_items(
        &self,
        project_id: i64,
        req: &ListLineItemsRequest,
    ) -> Result<LineItemsPage>;

    /// Fetch a sample by its 1-based ordinal.
    async fn sample_by_index(&self, project_id: i64, line_index: u32) -> Result<LineItem>;

    /// Submit a full snapshot together with the target status.
    async fn submit_snapshot(
        &self,
        project_id: i64,
        line_item_id: i64,
        snapshot: &LineItemConfirmRequest,
    ) -> Result<ApiMessage>;

    async fn update_message(
        &self,
        project_id: i64,
        message_id: i64,
        update: &UpdateMessageRequest,
    ) -> Result<LineItemMessage>;

    // --- task allocation (superuser) ---

    async fn assign_tasks(&self, project_id: i64, req: &AssignTaskRequest) -> Result<ApiMessage>;

    async fn modify_tasks(&self, project_id: i64, req: &ModifyTaskRequest) -> Result<ApiMessage>;

    async fn delete_user_tasks(
        &self,
        project_id: i64,
        req: &DeleteUserTasksRequest,
    ) -> Result<ApiMessage>;

    // --- dashboards ---

    async fn admin_dashboard(&self) -> Result<Vec<AdminDashboardProject>>;

    async fn user_dashboard(&self) -> Result<Vec<UserDashboardProject>>;

    // --- export & audit ---

    /// Filtered export as raw JSONL bytes.
    async fn download_export(
        &self,
        project_id: i64,
        req: &ProjectDownloadRequest,
    ) -> Result<Vec<u8>>;

    async fn line_item_audit_logs(
        &self,
        project_id: i64,
        query: &AuditLogQuery,
    ) -> Result<AuditLogPage<LineItemAuditLog>>;

    async fn message_audit_logs(
        &self,
        project_id: i64,
        query: &AuditLogQuery,
    ) -> Result<AuditLogPage<LineItemMessageAuditLog>>;
}
