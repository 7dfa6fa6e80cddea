//! Background refresh of read queries on a fixed interval.
//!
//! A poller refetches one query key per tick through the session, so results
//! land in the shared cache and 401s end the session like any other read.
//! The latest value is published on a `watch` channel. Polling stops on
//! shutdown, on logout, or when the backend answers 401.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use labelwise_core::defaults::{DASHBOARD_POLL_SECS, LINE_ITEMS_POLL_SECS, PROJECT_STATUS_POLL_SECS};
use labelwise_core::{
    AdminDashboardProject, Error, LabelingApi, LineItemsPage, ListLineItemsRequest, ProjectStatus,
    Result, UserDashboardProject,
};

use crate::api::ApiClient;
use crate::cache::{keys, QueryKey};
use crate::session::Session;

const EVENT_CAPACITY: usize = 16;

/// Why a poller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    LoggedOut,
    Unauthorized,
}

/// Events emitted by a running poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A tick fetched a new value.
    Refreshed,
    /// A tick failed; the previous value is kept.
    Failed { error: String },
    Stopped(StopReason),
}

/// Handle for a running poller. Dropping it stops the task.
pub struct PollHandle<T> {
    shutdown_tx: mpsc::Sender<()>,
    value_rx: watch::Receiver<Option<T>>,
    event_rx: broadcast::Receiver<PollEvent>,
    task: JoinHandle<()>,
}

impl<T: Clone> PollHandle<T> {
    /// Latest successfully fetched value.
    pub fn latest(&self) -> Option<T> {
        self.value_rx.borrow().clone()
    }

    /// Receiver that is notified on every refresh.
    pub fn watch(&self) -> watch::Receiver<Option<T>> {
        self.value_rx.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<PollEvent> {
        self.event_rx.resubscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the poller to stop after the current tick.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Config("Poller already stopped".into()))
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Refetches one query key on an interval.
pub struct Poller {
    session: Session,
    key: QueryKey,
    interval: Duration,
}

impl Poller {
    pub fn new(session: Session, key: QueryKey, interval: Duration) -> Self {
        Self {
            session,
            key,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the polling task. The first fetch happens immediately.
    pub fn start<T, F, Fut>(self, mut fetcher: F) -> PollHandle<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnMut(Arc<ApiClient>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let (value_tx, value_rx) = watch::channel(None);
        let (event_tx, event_rx) = broadcast::channel(EVENT_CAPACITY);

        let Poller {
            session,
            key,
            interval,
        } = self;

        let task = tokio::spawn(async move {
            let mut state_rx = session.subscribe();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            debug!(
                subsystem = "poll",
                cache_key = %key,
                interval_ms = interval.as_millis() as u64,
                "Poller started"
            );

            let reason = loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break StopReason::Shutdown,
                    changed = state_rx.changed() => {
                        if changed.is_err() || !state_rx.borrow_and_update().is_logged_in() {
                            break StopReason::LoggedOut;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                trace!(subsystem = "poll", cache_key = %key, "Poll tick");
                let api = session.api_arc();
                match session.refetch(key.clone(), || fetcher(api.clone())).await {
                    Ok(value) => {
                        value_tx.send_replace(Some(value));
                        let _ = event_tx.send(PollEvent::Refreshed);
                    }
                    Err(e) if e.is_unauthorized() => break StopReason::Unauthorized,
                    Err(e) => {
                        warn!(subsystem = "poll", cache_key = %key, error = %e, "Poll refresh failed");
                        let _ = event_tx.send(PollEvent::Failed {
                            error: e.notice(),
                        });
                    }
                }
            };

            info!(subsystem = "poll", cache_key = %key, reason = ?reason, "Poller stopped");
            let _ = event_tx.send(PollEvent::Stopped(reason));
        });

        PollHandle {
            shutdown_tx,
            value_rx,
            event_rx,
            task,
        }
    }
}

/// Project status every 5 seconds, for ingestion progress.
pub fn poll_project_status(session: &Session, project_id: i64) -> PollHandle<ProjectStatus> {
    Poller::new(
        session.clone(),
        keys::project_status(project_id),
        Duration::from_secs(PROJECT_STATUS_POLL_SECS),
    )
    .start(move |api| async move { api.project_status(project_id).await })
}

/// One page of line items every 10 seconds.
pub fn poll_line_items(
    session: &Session,
    project_id: i64,
    request: ListLineItemsRequest,
) -> PollHandle<LineItemsPage> {
    let key = keys::line_items_page(project_id, request.page, request.limit, request.status);
    Poller::new(
        session.clone(),
        key,
        Duration::from_secs(LINE_ITEMS_POLL_SECS),
    )
    .start(move |api| {
        let request = request.clone();
        async move { api.list_line_items(project_id, &request).await }
    })
}

/// Admin dashboard every 30 seconds.
pub fn poll_admin_dashboard(session: &Session) -> PollHandle<Vec<AdminDashboardProject>> {
    Poller::new(
        session.clone(),
        keys::admin_dashboard(),
        Duration::from_secs(DASHBOARD_POLL_SECS),
    )
    .start(|api| async move { api.admin_dashboard().await })
}

/// Personal dashboard every 30 seconds.
pub fn poll_user_dashboard(session: &Session) -> PollHandle<Vec<UserDashboardProject>> {
    Poller::new(
        session.clone(),
        keys::user_dashboard(),
        Duration::from_secs(DASHBOARD_POLL_SECS),
    )
    .start(|api| async move { api.user_dashboard().await })
}
