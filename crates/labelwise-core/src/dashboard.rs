//! Dashboard aggregation over the admin and user dashboard responses.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{
    status_count, AdminDashboardProject, LineItemStatus, StatusCounts, UserDashboardProject,
    UserTaskSummary,
};

/// Per-status totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub unlabeled: u64,
    pub confirmed: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl StatusTally {
    pub fn from_counts(counts: &StatusCounts) -> Self {
        Self {
            unlabeled: status_count(counts, LineItemStatus::Unlabeled),
            confirmed: status_count(counts, LineItemStatus::Confirmed),
            approved: status_count(counts, LineItemStatus::Approved),
            rejected: status_count(counts, LineItemStatus::Rejected),
        }
    }

    /// Missing counts on a summary are zero.
    pub fn from_summary(summary: &UserTaskSummary) -> Self {
        Self {
            unlabeled: summary.unlabeled.unwrap_or(0),
            confirmed: summary.confirmed.unwrap_or(0),
            approved: summary.approved.unwrap_or(0),
            rejected: summary.rejected.unwrap_or(0),
        }
    }

    pub fn get(&self, status: LineItemStatus) -> u64 {
        match status {
            LineItemStatus::Unlabeled => self.unlabeled,
            LineItemStatus::Confirmed => self.confirmed,
            LineItemStatus::Approved => self.approved,
            LineItemStatus::Rejected => self.rejected,
        }
    }

    /// CONFIRMED plus APPROVED.
    pub fn completed(&self) -> u64 {
        self.confirmed + self.approved
    }

    pub fn add(&mut self, other: &StatusTally) {
        self.unlabeled += other.unlabeled;
        self.confirmed += other.confirmed;
        self.approved += other.approved;
        self.rejected += other.rejected;
    }
}

/// Rounded completion percentage; zero when there are no tasks.
pub fn progress_percent(completed: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Progress of one project (admin) or of the caller's share of it (user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectProgress {
    pub project_name: String,
    pub total_tasks: u64,
    pub tally: StatusTally,
    pub completed: u64,
    pub progress_percent: u32,
}

/// Per-user row of the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProgress {
    pub project_name: String,
    pub user_id: i64,
    pub name: String,
    pub task_count: u64,
    pub tally: StatusTally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminOverview {
    pub total_projects: usize,
    pub total_samples: u64,
    /// Distinct users holding tasks in any project.
    pub total_users: usize,
    pub status_totals: StatusTally,
    pub projects: Vec<ProjectProgress>,
    pub users: Vec<UserProgress>,
}

pub fn admin_overview(projects: &[AdminDashboardProject]) -> AdminOverview {
    let mut distinct_users = BTreeSet::new();
    let mut status_totals = StatusTally::default();
    let mut rows = Vec::with_capacity(projects.len());
    let mut users = Vec::new();

    for project in projects {
        let mut tally = StatusTally::default();
        let mut total_tasks = 0;
        for summary in &project.user_task_summary {
            distinct_users.insert(summary.user_id);
            let user_tally = StatusTally::from_summary(summary);
            tally.add(&user_tally);
            total_tasks += summary.task_count;
            users.push(UserProgress {
                project_name: project.project_name.clone(),
                user_id: summary.user_id,
                name: summary.display_name().to_string(),
                task_count: summary.task_count,
                tally: user_tally,
            });
        }
        status_totals.add(&tally);
        rows.push(ProjectProgress {
            project_name: project.project_name.clone(),
            total_tasks,
            tally,
            completed: tally.completed(),
            progress_percent: progress_percent(tally.completed(), total_tasks),
        });
    }

    AdminOverview {
        total_projects: projects.len(),
        total_samples: projects.iter().map(|p| p.num_samples).sum(),
        total_users: distinct_users.len(),
        status_totals,
        projects: rows,
        users,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserOverview {
    pub total_projects: usize,
    pub total_tasks: u64,
    pub status_totals: StatusTally,
    pub completed: u64,
    pub progress_percent: u32,
    pub projects: Vec<ProjectProgress>,
}

pub fn user_overview(projects: &[UserDashboardProject]) -> UserOverview {
    let mut status_totals = StatusTally::default();
    let rows: Vec<ProjectProgress> = projects
        .iter()
        .map(|project| {
            let tally = StatusTally::from_counts(&project.status_counts);
            status_totals.add(&tally);
            ProjectProgress {
                project_name: project.project_name.clone(),
                total_tasks: project.task_count,
                tally,
                completed: tally.completed(),
                progress_percent: progress_percent(tally.completed(), project.task_count),
            }
        })
        .collect();

    let total_tasks = projects.iter().map(|p| p.task_count).sum();
    UserOverview {
        total_projects: projects.len(),
        total_tasks,
        status_totals,
        completed: status_totals.completed(),
        progress_percent: progress_percent(status_totals.completed(), total_tasks),
        projects: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(user_id: i64, counts: [u64; 4]) -> UserTaskSummary {
        UserTaskSummary {
            user_id,
            full_name: Some(format!("User {}", user_id)),
            email: format!("u{}@example.com", user_id),
            task_count: counts.iter().sum(),
            unlabeled: Some(counts[0]),
            confirmed: Some(counts[1]),
            approved: Some(counts[2]),
            rejected: Some(counts[3]),
        }
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(5, 5), 100);
    }

    #[test]
    fn test_admin_overview() {
        let projects = vec![
            AdminDashboardProject {
                project_id: 1,
                project_name: "alpha".into(),
                project_description: None,
                num_samples: 100,
                user_task_summary: vec![summary(1, [5, 3, 2, 0]), summary(2, [10, 0, 0, 0])],
            },
            AdminDashboardProject {
                project_id: 2,
                project_name: "beta".into(),
                project_description: None,
                num_samples: 40,
                user_task_summary: vec![summary(1, [0, 0, 4, 4])],
            },
        ];
        let overview = admin_overview(&projects);
        assert_eq!(overview.total_projects, 2);
        assert_eq!(overview.total_samples, 140);
        assert_eq!(overview.total_users, 2);
        assert_eq!(overview.status_totals.completed(), 9);
        assert_eq!(overview.projects[0].total_tasks, 20);
        assert_eq!(overview.projects[0].completed, 5);
        assert_eq!(overview.projects[0].progress_percent, 25);
        assert_eq!(overview.projects[1].progress_percent, 50);
        assert_eq!(overview.users.len(), 3);
    }

    #[test]
    fn test_user_overview_missing_statuses_count_as_zero() {
        let mut counts = StatusCounts::new();
        counts.insert("CONFIRMED".into(), 2);
        counts.insert("APPROVED".into(), 1);
        let projects = vec![
            UserDashboardProject {
                project_id: Some(1),
                project_name: "alpha".into(),
                task_count: 6,
                status_counts: counts,
            },
            UserDashboardProject {
                project_id: None,
                project_name: "empty".into(),
                task_count: 0,
                status_counts: StatusCounts::new(),
            },
        ];
        let overview = user_overview(&projects);
        assert_eq!(overview.total_tasks, 6);
        assert_eq!(overview.completed, 3);
        assert_eq!(overview.progress_percent, 50);
        assert_eq!(overview.projects[1].progress_percent, 0);
        assert_eq!(overview.status_totals.get(LineItemStatus::Unlabeled), 0);
    }
}
