//! HTTP implementation of [`LabelingApi`] on top of `reqwest`.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use labelwise_core::{
    AdminDashboardProject, ApiMessage, AssignTaskRequest, AuditLogPage, AuditLogQuery,
    DeleteUserTasksRequest, Error, LabelingApi, LineItem, LineItemAuditLog, LineItemConfirmRequest,
    LineItemMessage, LineItemMessageAuditLog, LineItemsPage, ListLineItemsRequest,
    ModifyTaskRequest, Project, ProjectCreate, ProjectDownloadRequest, ProjectStatus, Result,
    Token, UpdateMessageRequest, UpdatePassword, UserCreate, UserDashboardProject, UserPublic,
    UserRegister, UserUpdate, UserUpdateMe, UsersPage,
};

use crate::config::ClientConfig;

/// Correlation header attached to every request.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Pulls the human-readable message out of a FastAPI error body.
///
/// Handles `{"detail": "..."}` and validation errors of the form
/// `{"detail": [{"msg": "..."}, ...]}`. Returns an empty string when the body
/// carries no usable message.
pub fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Option<JsonValue>,
    }

    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return String::new();
    };
    match parsed.detail {
        Some(JsonValue::String(message)) => message,
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(JsonValue::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    }
}

/// REST client for the labeling backend.
///
/// Cheap to share behind an `Arc`; the bearer token is interior state so a
/// login in one place is visible to every holder.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "client",
            base_url = %config.base_url(),
            timeout_secs = config.timeout_secs,
            "Initializing labeling API client"
        );

        Ok(Self {
            client,
            base_url: config.base_url(),
            token: RwLock::new(config.token.clone()),
        })
    }

    pub fn shared(config: &ClientConfig) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(config)?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a request, attaching the token when `authenticated` and mapping
    /// non-2xx responses to errors. Without a token an authenticated request
    /// fails before touching the network.
    async fn send(
        &self,
        op: &'static str,
        builder: RequestBuilder,
        authenticated: bool,
    ) -> Result<Response> {
        let builder = if authenticated {
            let token = self
                .token
                .read()
                .await
                .clone()
                .ok_or_else(|| Error::Unauthorized("Not logged in".to_string()))?;
            builder.bearer_auth(token)
        } else {
            builder
        };

        let request_id = Uuid::now_v7();
        let start = Instant::now();
        debug!(subsystem = "client", op, request_id = %request_id, "Sending request");

        let response = builder
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .await
            .map_err(|e| {
                warn!(subsystem = "client", op, request_id = %request_id, error = %e, "Request failed");
                Error::from(e)
            })?;

        let status = response.status();
        let duration_ms = start.elapsed().as_millis() as u64;

        if status.is_success() {
            debug!(
                subsystem = "client",
                op,
                request_id = %request_id,
                http_status = status.as_u16(),
                duration_ms,
                "Request completed"
            );
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_detail(&body);
        warn!(
            subsystem = "client",
            op,
            request_id = %request_id,
            http_status = status.as_u16(),
            duration_ms,
            error = %message,
            "Backend returned an error"
        );
        Err(Error::from_status(status.as_u16(), message))
    }

    async fn json<T: DeserializeOwned>(
        &self,
        op: &'static str,
        builder: RequestBuilder,
        authenticated: bool,
    ) -> Result<T> {
        let response = self.send(op, builder, authenticated).await?;
        response.json::<T>().await.map_err(Error::from)
    }
}

#[async_trait]
impl LabelingApi for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<Token> {
        let builder = self
            .request(Method::POST, "/login/access-token")
            .form(&[("username", username), ("password", password)]);
        self.json("login", builder, false).await
    }

    async fn signup(&self, user: &UserRegister) -> Result<UserPublic> {
        let builder = self.request(Method::POST, "/users/").json(user);
        self.json("signup", builder, false).await
    }

    async fn read_me(&self) -> Result<UserPublic> {
        self.json("read_me", self.request(Method::GET, "/users/me"), true)
            .await
    }

    async fn update_me(&self, update: &UserUpdateMe) -> Result<UserPublic> {
        let builder = self.request(Method::PATCH, "/users/me").json(update);
        self.json("update_me", builder, true).await
    }

    async fn update_password_me(&self, update: &UpdatePassword) -> Result<ApiMessage> {
        let builder = self.request(Method::PATCH, "/users/me/password").json(update);
        self.json("update_password_me", builder, true).await
    }

    async fn list_users(&self, skip: u32, limit: u32) -> Result<UsersPage> {
        let builder = self
            .request(Method::GET, "/users/")
            .query(&[("skip", skip), ("limit", limit)]);
        self.json("list_users", builder, true).await
    }

    async fn create_user(&self, user: &UserCreate) -> Result<UserPublic> {
        let builder = self.request(Method::POST, "/users/").json(user);
        self.json("create_user", builder, true).await
    }

    async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<UserPublic> {
        let builder = self
            .request(Method::PATCH, &format!("/users/{}", user_id))
            .json(update);
        self.json("update_user", builder, true).await
    }

    async fn delete_user(&self, user_id: i64) -> Result<ApiMessage> {
        let builder = self.request(Method::DELETE, &format!("/users/{}", user_id));
        self.json("delete_user", builder, true).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.json("list_projects", self.request(Method::GET, "/projects/"), true)
            .await
    }

    async fn create_project(&self, project: &ProjectCreate) -> Result<Project> {
        let builder = self.request(Method::POST, "/projects/").json(project);
        self.json("create_project", builder, true).await
    }

    async fn delete_project(&self, project_id: i64) -> Result<ApiMessage> {
        let builder = self.request(Method::DELETE, &format!("/projects/{}", project_id));
        self.json("delete_project", builder, true).await
    }

    async fn project_status(&self, project_id: i64) -> Result<ProjectStatus> {
        let builder = self.request(Method::GET, &format!("/projects/{}/status", project_id));
        self.json("project_status", builder, true).await
    }

    async fn list_line_items(
        &self,
        project_id: i64,
        req: &ListLineItemsRequest,
    ) -> Result<LineItemsPage> {
        let mut builder = self
            .request(Method::GET, &format!("/projects/{}/samples", project_id))
            .query(&[("page", req.page), ("limit", req.limit)]);
        if let Some(status) = req.status {
            builder = builder.query(&[("status", status.as_str())]);
        }
        self.json("list_line_items", builder, true).await
    }

    async fn sample_by_index(&self, project_id: i64, line_index: u32) -> Result<LineItem> {
        let builder = self.request(
            Method::GET,
            &format!("/projects/{}/samples/{}", project_id, line_index),
        );
        self.json("sample_by_index", builder, true).await
    }

    async fn submit_snapshot(
        &self,
        project_id: i64,
        line_item_id: i64,
        snapshot: &LineItemConfirmRequest,
    ) -> Result<ApiMessage> {
        let builder = self
            .request(
                Method::POST,
                &format!("/projects/{}/confirm/{}", project_id, line_item_id),
            )
            .json(snapshot);
        self.json("submit_snapshot", builder, true).await
    }

    async fn update_message(
        &self,
        project_id: i64,
        message_id: i64,
        update: &UpdateMessageRequest,
    ) -> Result<LineItemMessage> {
        let builder = self
            .request(
                Method::PUT,
                &format!("/projects/{}/messages/{}", project_id, message_id),
            )
            .json(update);
        self.json("update_message", builder, true).await
    }

    async fn assign_tasks(&self, project_id: i64, req: &AssignTaskRequest) -> Result<ApiMessage> {
        let builder = self
            .request(Method::POST, &format!("/projects/{}/assign", project_id))
            .json(req);
        self.json("assign_tasks", builder, true).await
    }

    async fn modify_tasks(&self, project_id: i64, req: &ModifyTaskRequest) -> Result<ApiMessage> {
        let builder = self
            .request(Method::PUT, &format!("/projects/{}/tasks", project_id))
            .json(req);
        self.json("modify_tasks", builder, true).await
    }

    async fn delete_user_tasks(
        &self,
        project_id: i64,
        req: &DeleteUserTasksRequest,
    ) -> Result<ApiMessage> {
        let builder = self
            .request(Method::DELETE, &format!("/projects/{}/tasks", project_id))
            .json(req);
        self.json("delete_user_tasks", builder, true).await
    }

    async fn admin_dashboard(&self) -> Result<Vec<AdminDashboardProject>> {
        let builder = self.request(Method::GET, "/projects/dashboard");
        self.json("admin_dashboard", builder, true).await
    }

    async fn user_dashboard(&self) -> Result<Vec<UserDashboardProject>> {
        let builder = self.request(Method::GET, "/projects/dashboard_user");
        self.json("user_dashboard", builder, true).await
    }

    async fn download_export(
        &self,
        project_id: i64,
        req: &ProjectDownloadRequest,
    ) -> Result<Vec<u8>> {
        let builder = self
            .request(Method::POST, &format!("/projects/{}/download", project_id))
            .json(req);
        let response = self.send("download_export", builder, true).await?;
        let bytes = response.bytes().await.map_err(Error::from)?;
        Ok(bytes.to_vec())
    }

    async fn line_item_audit_logs(
        &self,
        project_id: i64,
        query: &AuditLogQuery,
    ) -> Result<AuditLogPage<LineItemAuditLog>> {
        let builder = audit_query(
            self.request(
                Method::GET,
                &format!("/projects/{}/audit-logs/line-items", project_id),
            ),
            query,
        );
        self.json("line_item_audit_logs", builder, true).await
    }

    async fn message_audit_logs(
        &self,
        project_id: i64,
        query: &AuditLogQuery,
    ) -> Result<AuditLogPage<LineItemMessageAuditLog>> {
        let builder = audit_query(
            self.request(
                Method::GET,
                &format!("/projects/{}/audit-logs/messages", project_id),
            ),
            query,
        );
        self.json("message_audit_logs", builder, true).await
    }
}

fn audit_query(builder: RequestBuilder, query: &AuditLogQuery) -> RequestBuilder {
    let builder = builder.query(&[("page", query.page), ("limit", query.limit)]);
    match query.line_item_id {
        Some(id) => builder.query(&[("line_item_id", id)]),
        None => builder,
    }
}
