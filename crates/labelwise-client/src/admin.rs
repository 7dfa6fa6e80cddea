//! Project and user administration, dashboards, export, and audit logs.
//!
//! Mutations go straight to the backend and then invalidate the cached
//! queries they affect. Reads go through the session cache.

use std::path::{Path, PathBuf};

use tracing::info;

use labelwise_core::assignment::modify_request;
use labelwise_core::defaults::{USERS_FETCH_ALL_LIMIT, USERS_PAGE_LIMIT};
use labelwise_core::forms::UserForm;
use labelwise_core::{
    available_users, AdminDashboardProject, ApiMessage, AssignmentForm, AuditLogPage,
    AuditLogQuery, DeleteUserTasksRequest, Error, ExportOptions, LabelingApi, LineItemAuditLog,
    LineItemMessageAuditLog, Project, ProjectCreate, ProjectStatus, Result, UserDashboardProject,
    UserPublic, UsersPage,
};

use crate::cache::keys;
use crate::session::Session;

// =============================================================================
// PROJECTS
// =============================================================================

/// Project-level operations.
#[derive(Clone)]
pub struct ProjectAdmin {
    session: Session,
}

impl ProjectAdmin {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn list(&self) -> Result<Vec<Project>> {
        let api = self.session.api();
        self.session
            .query(keys::projects(), move || api.list_projects())
            .await
    }

    pub async fn create(&self, project: &ProjectCreate) -> Result<Project> {
        let created = self.session.api().create_project(project).await?;
        self.session.invalidate(&[keys::projects()]).await;
        info!(subsystem = "admin", project_id = created.id, "Project created");
        Ok(created)
    }

    pub async fn delete(&self, project_id: i64) -> Result<ApiMessage> {
        let response = self.session.api().delete_project(project_id).await?;
        self.session
            .invalidate(&[
                keys::projects(),
                keys::project_status(project_id),
                keys::line_items(project_id),
                keys::admin_dashboard(),
            ])
            .await;
        info!(subsystem = "admin", project_id, "Project deleted");
        Ok(response)
    }

    pub async fn status(&self, project_id: i64) -> Result<ProjectStatus> {
        let api = self.session.api();
        self.session
            .query(keys::project_status(project_id), move || {
                api.project_status(project_id)
            })
            .await
    }

    /// Every user, for the assignment picker.
    pub async fn all_users(&self) -> Result<Vec<UserPublic>> {
        let api = self.session.api();
        let page: UsersPage = self
            .session
            .query(keys::users_page(1, USERS_FETCH_ALL_LIMIT), move || {
                api.list_users(0, USERS_FETCH_ALL_LIMIT)
            })
            .await?;
        Ok(page.data)
    }

    /// Users without tasks in the project.
    pub async fn assignable_users(&self, project_id: i64) -> Result<Vec<UserPublic>> {
        let (status, users) = futures::try_join!(self.status(project_id), self.all_users())?;
        Ok(available_users(&users, status.user_task_summary())
            .into_iter()
            .cloned()
            .collect())
    }

    /// Submit the assignment form. The form is reset only when the backend
    /// accepts the request.
    pub async fn assign(&self, project_id: i64, form: &mut AssignmentForm) -> Result<ApiMessage> {
        let mut next = form.clone();
        let request = next.submit()?;
        let response = self
            .session
            .api()
            .assign_tasks(project_id, &request)
            .await?;
        *form = next;
        self.after_allocation(project_id).await;
        info!(
            subsystem = "admin",
            project_id,
            user_id = request.user_id,
            num_samples = request.num_samples,
            "Tasks assigned"
        );
        Ok(response)
    }

    /// Change how many tasks an assigned user holds. The count is clamped to
    /// what the user holds plus what is still unassigned; zero is allowed.
    pub async fn modify_tasks(
        &self,
        project_id: i64,
        user_id: i64,
        new_num_samples: u64,
    ) -> Result<ApiMessage> {
        let status = self.status(project_id).await?;
        let current_count = status
            .user_task_summary()
            .iter()
            .find(|s| s.user_id == user_id)
            .map(|s| s.task_count)
            .ok_or_else(|| {
                Error::NotFound(format!("User {} has no tasks in project {}", user_id, project_id))
            })?;
        let request = modify_request(
            user_id,
            new_num_samples,
            current_count,
            status.num_task_not_assigned(),
        );
        let response = self
            .session
            .api()
            .modify_tasks(project_id, &request)
            .await?;
        self.after_allocation(project_id).await;
        info!(
            subsystem = "admin",
            project_id,
            user_id,
            new_num_samples = request.new_num_samples,
            "Tasks modified"
        );
        Ok(response)
    }

    pub async fn delete_user_tasks(&self, project_id: i64, user_id: i64) -> Result<ApiMessage> {
        let response = self
            .session
            .api()
            .delete_user_tasks(project_id, &DeleteUserTasksRequest { user_id })
            .await?;
        self.after_allocation(project_id).await;
        info!(subsystem = "admin", project_id, user_id, "User tasks deleted");
        Ok(response)
    }

    async fn after_allocation(&self, project_id: i64) {
        self.session
            .invalidate(&[
                keys::project_status(project_id),
                keys::line_items(project_id),
                keys::admin_dashboard(),
            ])
            .await;
    }

    /// Request a filtered export and write it to `<dir>/<file_name>.jsonl`.
    pub async fn download(
        &self,
        project_id: i64,
        options: &ExportOptions,
        dir: &Path,
    ) -> Result<PathBuf> {
        let request = options.to_request()?;
        let bytes = self
            .session
            .api()
            .download_export(project_id, &request)
            .await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(options.output_file_name());
        tokio::fs::write(&path, &bytes).await?;

        info!(
            subsystem = "admin",
            project_id,
            bytes = bytes.len(),
            path = %path.display(),
            "Export written"
        );
        Ok(path)
    }

    pub async fn admin_dashboard(&self) -> Result<Vec<AdminDashboardProject>> {
        let api = self.session.api();
        self.session
            .query(keys::admin_dashboard(), move || api.admin_dashboard())
            .await
    }

    pub async fn user_dashboard(&self) -> Result<Vec<UserDashboardProject>> {
        let api = self.session.api();
        self.session
            .query(keys::user_dashboard(), move || api.user_dashboard())
            .await
    }

    pub async fn line_item_audit_logs(
        &self,
        project_id: i64,
        query: &AuditLogQuery,
    ) -> Result<AuditLogPage<LineItemAuditLog>> {
        let api = self.session.api();
        let key = keys::audit_logs(project_id, "line-items", query.line_item_id, query.page);
        self.session
            .query(key, move || api.line_item_audit_logs(project_id, query))
            .await
    }

    pub async fn message_audit_logs(
        &self,
        project_id: i64,
        query: &AuditLogQuery,
    ) -> Result<AuditLogPage<LineItemMessageAuditLog>> {
        let api = self.session.api();
        let key = keys::audit_logs(project_id, "messages", query.line_item_id, query.page);
        self.session
            .query(key, move || api.message_audit_logs(project_id, query))
            .await
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Paged user management.
#[derive(Clone)]
pub struct UserAdmin {
    session: Session,
    page_size: u32,
}

impl UserAdmin {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            page_size: USERS_PAGE_LIMIT,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// 1-based page of users.
    pub async fn list(&self, page: u32) -> Result<UsersPage> {
        let page = page.max(1);
        let limit = self.page_size;
        let skip = (page - 1) * limit;
        let api = self.session.api();
        self.session
            .query(keys::users_page(page, limit), move || api.list_users(skip, limit))
            .await
    }

    /// Number of pages for `count` users, at least one.
    pub fn total_pages(&self, count: u64) -> u32 {
        (count.div_ceil(self.page_size as u64) as u32).max(1)
    }

    pub async fn create(&self, form: &UserForm) -> Result<UserPublic> {
        let request = form.to_create()?;
        let created = self.session.api().create_user(&request).await?;
        self.session.invalidate(&[keys::users()]).await;
        info!(subsystem = "admin", user_id = created.id, "User created");
        Ok(created)
    }

    pub async fn update(&self, user_id: i64, form: &UserForm) -> Result<UserPublic> {
        let request = form.to_update()?;
        let updated = self.session.api().update_user(user_id, &request).await?;
        self.session.invalidate(&[keys::users()]).await;
        info!(subsystem = "admin", user_id, "User updated");
        Ok(updated)
    }

    pub async fn delete(&self, user_id: i64) -> Result<ApiMessage> {
        let response = self.session.api().delete_user(user_id).await?;
        self.session.invalidate(&[keys::users()]).await;
        info!(subsystem = "admin", user_id, "User deleted");
        Ok(response)
    }
}
