//! # labelwise-core
//!
//! Core types, workflow rules, and abstractions for the labelwise client.
//!
//! Nothing in this crate performs network I/O. The rules that decide what a
//! reviewer may do, which page holds a sample, and how message content is
//! split and rejoined live here so they can be tested without a backend.

pub mod assignment;
pub mod audit;
pub mod content;
pub mod dashboard;
pub mod defaults;
pub mod error;
pub mod export;
pub mod forms;
pub mod logging;
pub mod models;
pub mod navigator;
pub mod traits;
pub mod workflow;

// Re-export commonly used types at crate root
pub use assignment::{available_users, filter_users, AssignmentForm};
pub use content::{normalize_content, MessageDraft, SplitContent};
pub use dashboard::{admin_overview, user_overview, AdminOverview, StatusTally, UserOverview};
pub use error::{Error, Result};
pub use export::{sanitize_export_name, ExportOptions};
pub use models::*;
pub use navigator::{target_page, IgnoreReason, Navigation, SampleNavigator, SamplePager};
pub use traits::*;
pub use workflow::{available_actions, build_snapshot, SampleAction, StatusBadge};
