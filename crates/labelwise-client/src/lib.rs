//! # labelwise-client
//!
//! HTTP client for the labelwise backend, with an authenticated session,
//! a stale-time query cache, and background polling.
//!
//! ```no_run
//! use labelwise_client::{ClientConfig, SampleReview, Session};
//! use labelwise_core::SampleAction;
//!
//! # async fn run() -> labelwise_core::Result<()> {
//! let session = Session::new(&ClientConfig::from_env())?;
//! session.login("reviewer@example.com", "s3cret-pass").await?;
//! let review = SampleReview::new(session.clone(), 4);
//! review.submit_index(12, SampleAction::Confirm).await?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod api;
pub mod cache;
pub mod config;
pub mod poll;
pub mod review;
pub mod session;

pub use admin::{ProjectAdmin, UserAdmin};
pub use api::ApiClient;
pub use cache::{keys, CacheStats, QueryCache, QueryKey, RetryPolicy};
pub use config::ClientConfig;
pub use poll::{
    poll_admin_dashboard, poll_line_items, poll_project_status, poll_user_dashboard, PollEvent,
    PollHandle, Poller, StopReason,
};
pub use review::SampleReview;
pub use session::{AuthState, Session};
