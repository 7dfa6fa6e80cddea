//! Reviewing samples of one project: loading, navigating, status actions,
//! and message edits.

use tracing::{debug, info};

use labelwise_core::workflow::is_action_available;
use labelwise_core::{
    available_actions, build_snapshot, ApiMessage, Error, LabelingApi, LineItem, LineItemMessage,
    LineItemsPage, ListLineItemsRequest, MessageDraft, Navigation, Result, SampleAction,
    SampleNavigator,
};

use crate::cache::keys;
use crate::session::Session;

/// Review workflow bound to a project.
#[derive(Clone)]
pub struct SampleReview {
    session: Session,
    project_id: i64,
}

impl SampleReview {
    pub fn new(session: Session, project_id: i64) -> Self {
        Self {
            session,
            project_id,
        }
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    /// Actions offered to the logged-in user.
    pub fn available_actions(&self) -> Vec<SampleAction> {
        available_actions(self.session.is_superuser())
    }

    /// Sample by 1-based ordinal.
    pub async fn load(&self, line_index: u32) -> Result<LineItem> {
        let api = self.session.api();
        let project_id = self.project_id;
        self.session
            .query(keys::sample(project_id, line_index), move || {
                api.sample_by_index(project_id, line_index)
            })
            .await
    }

    /// One page of the samples table.
    pub async fn page(&self, request: &ListLineItemsRequest) -> Result<LineItemsPage> {
        let api = self.session.api();
        let project_id = self.project_id;
        let key = keys::line_items_page(project_id, request.page, request.limit, request.status);
        self.session
            .query(key, move || api.list_line_items(project_id, request))
            .await
    }

    /// Page the navigator currently points at.
    pub async fn current_page(&self, nav: &SampleNavigator) -> Result<LineItemsPage> {
        self.page(&ListLineItemsRequest {
            page: nav.page(),
            limit: nav.limit(),
            status: nav.status_filter(),
        })
        .await
    }

    /// Bring sample `line_index` into view. When the navigator changes page
    /// the new page is fetched and delivered; the returned page is the one
    /// that now holds the row, if any.
    pub async fn navigate(
        &self,
        nav: &mut SampleNavigator,
        line_index: u32,
        loaded: Option<&LineItemsPage>,
    ) -> Result<(Navigation, Option<LineItemsPage>)> {
        let outcome = nav.request(Some(line_index), loaded);
        match outcome {
            Navigation::ChangePage(_) => {
                let page = self.current_page(nav).await?;
                let selected = nav.on_page_loaded(&page).map(|item| item.line_index);
                debug!(
                    subsystem = "review",
                    project_id = self.project_id,
                    line_index,
                    page = nav.page(),
                    auto_selected = ?selected,
                    "Navigated to page"
                );
                Ok((outcome, Some(page)))
            }
            Navigation::ScrollTo(_) => {
                nav.finish_scroll();
                Ok((outcome, loaded.cloned()))
            }
            Navigation::Ignored(_) => Ok((outcome, None)),
        }
    }

    /// Submit a snapshot of `item` with the action's target status.
    pub async fn submit(&self, item: &LineItem, action: SampleAction) -> Result<ApiMessage> {
        if !is_action_available(action, self.session.is_superuser()) {
            return Err(Error::Forbidden(format!(
                "Only superusers can {} samples",
                action.verb()
            )));
        }

        let snapshot = build_snapshot(item, action);
        let response = self
            .session
            .api()
            .submit_snapshot(self.project_id, item.id, &snapshot)
            .await?;

        self.session
            .invalidate(&[
                keys::sample(self.project_id, item.line_index),
                keys::line_items(self.project_id),
                keys::admin_dashboard(),
                keys::user_dashboard(),
            ])
            .await;

        info!(
            subsystem = "review",
            project_id = self.project_id,
            line_item_id = item.id,
            line_index = item.line_index,
            status = %action.target_status(),
            "Sample submitted"
        );
        Ok(response)
    }

    /// Load sample `line_index` and submit it unchanged.
    pub async fn submit_index(&self, line_index: u32, action: SampleAction) -> Result<ApiMessage> {
        let item = self.load(line_index).await?;
        self.submit(&item, action).await
    }

    /// Save one edited message of sample `line_index`.
    pub async fn edit_message(
        &self,
        line_index: u32,
        draft: &MessageDraft,
    ) -> Result<LineItemMessage> {
        let updated = self
            .session
            .api()
            .update_message(self.project_id, draft.message_id, &draft.to_request())
            .await?;

        self.session
            .invalidate(&[
                keys::sample(self.project_id, line_index),
                keys::line_items(self.project_id),
            ])
            .await;

        debug!(
            subsystem = "review",
            project_id = self.project_id,
            line_index,
            message_id = draft.message_id,
            "Message updated"
        );
        Ok(updated)
    }
}
