//! labelwise: command-line client for the labeling backend.
//!
//! Reads `LABELWISE_API_URL` and `LABELWISE_TOKEN` from the environment (or
//! a `.env` file). `labelwise login` prints a token suitable for
//! `LABELWISE_TOKEN`. Output is JSON on stdout; logs go to stderr.

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use labelwise_client::{
    poll_admin_dashboard, poll_project_status, poll_user_dashboard, ClientConfig, PollEvent,
    PollHandle, ProjectAdmin, SampleReview, Session, StopReason, UserAdmin,
};
use labelwise_core::audit::{describe_line_item_log, describe_message_log};
use labelwise_core::content::split;
use labelwise_core::forms::{project_create, signup_request, PasswordChange, UserForm};
use labelwise_core::workflow::visible_messages;
use labelwise_core::{
    admin_overview, filter_users, user_overview, AssignmentForm, AuditLogQuery, ExportOptions,
    LineItemStatus, ListLineItemsRequest, MessageDraft, Navigation, SampleAction, SampleNavigator,
    SamplePager, StatusBadge,
};

#[derive(Parser)]
#[command(name = "labelwise")]
#[command(author, version, about = "Review and manage conversational labeling projects")]
#[command(propagate_version = true)]
struct Cli {
    /// Backend origin (without /api/v1)
    #[arg(long, global = true, env = "LABELWISE_API_URL")]
    api_url: Option<String>,

    /// Bearer token from `labelwise login`
    #[arg(long, global = true, env = "LABELWISE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print an access token
    Login {
        /// Account email
        username: String,

        #[arg(long, env = "LABELWISE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Signup {
        email: String,

        #[arg(long, env = "LABELWISE_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,
    },

    /// Show the current user
    Me,

    /// Update your name or email
    UpdateMe {
        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// Change your password
    Password {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,

        #[arg(long)]
        confirm: String,
    },

    /// Manage users (superuser)
    #[command(subcommand)]
    Users(UsersCommand),

    /// Manage projects
    #[command(subcommand)]
    Projects(ProjectsCommand),

    /// Browse samples
    #[command(subcommand)]
    Samples(SamplesCommand),

    /// Confirm a sample
    Confirm { project: i64, index: u32 },

    /// Approve a sample (superuser)
    Approve { project: i64, index: u32 },

    /// Reject a sample (superuser)
    Reject { project: i64, index: u32 },

    /// Edit one message of a sample
    EditMessage {
        project: i64,
        index: u32,
        message_id: i64,

        /// New reasoning; omit to keep, pass "" to drop
        #[arg(long)]
        think: Option<String>,

        /// New visible content; omit to keep
        #[arg(long)]
        body: Option<String>,
    },

    /// Assign unassigned samples to a user (superuser)
    Assign {
        project: i64,
        user_id: i64,
        num_samples: u64,
    },

    /// Change a user's task count (superuser)
    ModifyTasks {
        project: i64,
        user_id: i64,
        num_samples: u64,
    },

    /// Remove all of a user's tasks (superuser)
    DeleteTasks { project: i64, user_id: i64 },

    /// Users without tasks in a project
    AssignableUsers {
        project: i64,

        /// Filter by name or email
        #[arg(long)]
        query: Option<String>,
    },

    /// Progress overview
    Dashboard {
        /// Every project and user (superuser)
        #[arg(long)]
        admin: bool,

        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Export samples as JSONL
    Download {
        project: i64,

        /// Statuses to include (default: all)
        #[arg(long = "status", num_args = 1..)]
        statuses: Vec<LineItemStatus>,

        #[arg(long)]
        limit: Option<u64>,

        /// File name without extension
        #[arg(long)]
        name: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Audit trail of a project
    Audit {
        project: i64,

        /// Message edits instead of status changes
        #[arg(long)]
        messages: bool,

        #[arg(long)]
        line_item: Option<i64>,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Create {
        email: String,

        #[arg(long)]
        full_name: String,

        #[arg(long, env = "LABELWISE_NEW_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        superuser: bool,

        #[arg(long)]
        inactive: bool,
    },
    Update {
        id: i64,
        email: String,

        #[arg(long)]
        full_name: String,

        /// Leave unset to keep the current password
        #[arg(long)]
        password: Option<String>,

        #[arg(long)]
        superuser: bool,

        #[arg(long)]
        inactive: bool,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum ProjectsCommand {
    List,
    Create {
        name: String,
        url: String,

        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        id: i64,
    },
    /// Import state and task allocation
    Status {
        id: i64,

        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Subcommand)]
enum SamplesCommand {
    /// One page of samples
    List {
        project: i64,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = labelwise_core::defaults::LINE_ITEMS_PAGE_LIMIT)]
        limit: u32,

        #[arg(long)]
        status: Option<LineItemStatus>,
    },
    /// One sample with its messages
    Show {
        project: i64,
        index: u32,

        /// Step to the next sample
        #[arg(long, conflicts_with = "prev")]
        next: bool,

        /// Step to the previous sample
        #[arg(long)]
        prev: bool,
    },
    /// Page that holds a sample
    Navigate {
        project: i64,
        index: u32,

        #[arg(long, default_value_t = labelwise_core::defaults::LINE_ITEMS_PAGE_LIMIT)]
        limit: u32,

        #[arg(long)]
        status: Option<LineItemStatus>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e
                .downcast_ref::<labelwise_core::Error>()
                .map(|err| err.notice())
                .unwrap_or_else(|| format!("{:#}", e));
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

/// Logging to stderr, or to a daily-rotated file when `LOG_FILE` is set.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `LOG_FORMAT` | `text` | `json` or `text` |
/// | `LOG_FILE` | unset | Log file path |
/// | `RUST_LOG` | `labelwise=warn,labelwise_client=warn` | Filter |
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "labelwise=warn,labelwise_client=warn".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("labelwise.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    }
}

fn config_from(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url.clone());
    }
    if cli.token.is_some() {
        config = config.with_token(cli.token.clone());
    }
    config
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config_from(&cli);
    let session = Session::new(&config)?;

    match cli.command {
        Commands::Login { username, password } => {
            session.login(&username, &password).await?;
            let token = session
                .token()
                .await
                .ok_or_else(|| anyhow!("Login returned no token"))?;
            println!("{}", token);
            return Ok(());
        }
        Commands::Signup {
            email,
            password,
            full_name,
        } => {
            let request = signup_request(&email, &password, full_name.as_deref())?;
            let user = session.signup(&request).await?;
            return print_json(&user);
        }
        _ => {}
    }

    if config.token.is_none() {
        return Err(anyhow!(
            "Not logged in. Run `labelwise login` and set LABELWISE_TOKEN."
        ));
    }
    let me = session.restore().await?;
    debug!(subsystem = "cli", user_id = me.id, "Session restored");

    let projects = ProjectAdmin::new(session.clone());

    match cli.command {
        Commands::Login { .. } | Commands::Signup { .. } => unreachable!("handled above"),

        Commands::Me => print_json(&me)?,

        Commands::UpdateMe { full_name, email } => {
            let user = session
                .update_profile(full_name.as_deref(), email.as_deref())
                .await?;
            print_json(&user)?;
        }

        Commands::Password {
            current,
            new,
            confirm,
        } => {
            let form = PasswordChange {
                current_password: current,
                new_password: new,
                confirm_password: confirm,
            };
            print_json(&session.change_password(&form).await?)?;
        }

        Commands::Users(command) => run_users(UserAdmin::new(session.clone()), command).await?,

        Commands::Projects(command) => run_projects(&session, &projects, command).await?,

        Commands::Samples(command) => run_samples(&session, &projects, command).await?,

        Commands::Confirm { project, index } => {
            submit(&session, project, index, SampleAction::Confirm).await?
        }
        Commands::Approve { project, index } => {
            submit(&session, project, index, SampleAction::Approve).await?
        }
        Commands::Reject { project, index } => {
            submit(&session, project, index, SampleAction::Reject).await?
        }

        Commands::EditMessage {
            project,
            index,
            message_id,
            think,
            body,
        } => {
            let review = SampleReview::new(session.clone(), project);
            let item = review.load(index).await?;
            let message = item
                .line_messages
                .iter()
                .find(|m| m.id == message_id)
                .ok_or_else(|| anyhow!("Sample {} has no message {}", index, message_id))?;
            let mut draft = MessageDraft::from_message(message);
            if let Some(think) = think {
                draft.think = think;
            }
            if let Some(body) = body {
                draft.body = body;
            }
            print_json(&review.edit_message(index, &draft).await?)?;
        }

        Commands::Assign {
            project,
            user_id,
            num_samples,
        } => {
            let status = projects.status(project).await?;
            let mut form = AssignmentForm::new(status.num_task_not_assigned());
            form.select_user(Some(user_id));
            form.set_num_samples(num_samples);
            if form.num_samples() != num_samples {
                info!(
                    subsystem = "cli",
                    requested = num_samples,
                    assigned = form.num_samples(),
                    "Sample count clamped to unassigned samples"
                );
            }
            print_json(&projects.assign(project, &mut form).await?)?;
        }

        Commands::ModifyTasks {
            project,
            user_id,
            num_samples,
        } => print_json(&projects.modify_tasks(project, user_id, num_samples).await?)?,

        Commands::DeleteTasks { project, user_id } => {
            print_json(&projects.delete_user_tasks(project, user_id).await?)?
        }

        Commands::AssignableUsers { project, query } => {
            let users = projects.assignable_users(project).await?;
            let refs: Vec<_> = users.iter().collect();
            let matched = match query.as_deref() {
                Some(q) => filter_users(&refs, q),
                None => refs,
            };
            print_json(&matched)?;
        }

        Commands::Dashboard { admin, watch } => {
            if watch {
                if admin {
                    watch_handle(poll_admin_dashboard(&session), |rows| {
                        print_json(&admin_overview(rows))
                    })
                    .await?;
                } else {
                    watch_handle(poll_user_dashboard(&session), |rows| {
                        print_json(&user_overview(rows))
                    })
                    .await?;
                }
            } else if admin {
                print_json(&admin_overview(&projects.admin_dashboard().await?))?;
            } else {
                print_json(&user_overview(&projects.user_dashboard().await?))?;
            }
        }

        Commands::Download {
            project,
            statuses,
            limit,
            name,
            out,
        } => {
            let project_name = projects
                .list()
                .await?
                .into_iter()
                .find(|p| p.id == project)
                .map(|p| p.name);
            let mut options = ExportOptions::new(project, project_name.as_deref());
            if !statuses.is_empty() {
                options.include_statuses = statuses;
            }
            options.limit = limit;
            if let Some(name) = name {
                options.file_name = name;
            }
            let path = projects.download(project, &options, &out).await?;
            print_json(&json!({ "path": path.to_string_lossy() }))?;
        }

        Commands::Audit {
            project,
            messages,
            line_item,
            page,
        } => {
            let query = AuditLogQuery {
                line_item_id: line_item,
                page,
                ..AuditLogQuery::default()
            };
            let (entries, total_pages) = if messages {
                let logs = projects.message_audit_logs(project, &query).await?;
                (
                    logs.data.iter().map(describe_message_log).collect::<Vec<_>>(),
                    logs.total_pages,
                )
            } else {
                let logs = projects.line_item_audit_logs(project, &query).await?;
                (
                    logs.data.iter().map(describe_line_item_log).collect::<Vec<_>>(),
                    logs.total_pages,
                )
            };
            for entry in &entries {
                println!("{}", entry);
            }
            eprintln!("page {} of {}", page, total_pages.max(1));
        }
    }

    Ok(())
}

async fn run_users(admin: UserAdmin, command: UsersCommand) -> anyhow::Result<()> {
    match command {
        UsersCommand::List { page } => {
            let users = admin.list(page).await?;
            print_json(&json!({
                "page": page.max(1),
                "total_pages": admin.total_pages(users.count),
                "count": users.count,
                "data": users.data,
            }))?;
        }
        UsersCommand::Create {
            email,
            full_name,
            password,
            superuser,
            inactive,
        } => {
            let form = UserForm {
                email,
                full_name,
                password: Some(password),
                is_active: !inactive,
                is_superuser: superuser,
            };
            print_json(&admin.create(&form).await?)?;
        }
        UsersCommand::Update {
            id,
            email,
            full_name,
            password,
            superuser,
            inactive,
        } => {
            let form = UserForm {
                email,
                full_name,
                password,
                is_active: !inactive,
                is_superuser: superuser,
            };
            print_json(&admin.update(id, &form).await?)?;
        }
        UsersCommand::Delete { id } => print_json(&admin.delete(id).await?)?,
    }
    Ok(())
}

async fn run_projects(
    session: &Session,
    projects: &ProjectAdmin,
    command: ProjectsCommand,
) -> anyhow::Result<()> {
    match command {
        ProjectsCommand::List => print_json(&projects.list().await?)?,
        ProjectsCommand::Create {
            name,
            url,
            description,
        } => {
            let request = project_create(&name, description.as_deref(), &url)?;
            print_json(&projects.create(&request).await?)?;
        }
        ProjectsCommand::Delete { id } => print_json(&projects.delete(id).await?)?,
        ProjectsCommand::Status { id, watch } => {
            if watch {
                watch_handle(poll_project_status(session, id), |status| {
                    print_json(&status_report(status))
                })
                .await?;
            } else {
                print_json(&status_report(&projects.status(id).await?))?;
            }
        }
    }
    Ok(())
}

fn status_report(status: &labelwise_core::ProjectStatus) -> serde_json::Value {
    let progress = status.import_progress().map(|p| {
        json!({
            "percentage": p.percentage,
            "current": p.current,
            "total": p.total,
        })
    });
    json!({
        "state": status.state,
        "ready": status.state.is_ready(),
        "import_progress": progress,
        "num_samples": status.num_samples(),
        "num_task_not_assigned": status.num_task_not_assigned(),
        "user_task_summary": status.user_task_summary(),
    })
}

async fn run_samples(
    session: &Session,
    projects: &ProjectAdmin,
    command: SamplesCommand,
) -> anyhow::Result<()> {
    match command {
        SamplesCommand::List {
            project,
            page,
            limit,
            status,
        } => {
            let review = SampleReview::new(session.clone(), project);
            let loaded = review
                .page(&ListLineItemsRequest {
                    page,
                    limit,
                    status,
                })
                .await?;
            let rows: Vec<_> = loaded
                .data
                .iter()
                .map(|item| {
                    json!({
                        "line_index": item.line_index,
                        "id": item.id,
                        "status": item.status,
                        "badge": StatusBadge::from(item.status).label(),
                        "messages": item.line_messages.len(),
                    })
                })
                .collect();
            print_json(&json!({
                "page": page,
                "num_pages": loaded.num_pages,
                "total_count": loaded.total_count,
                "status_counts": loaded.status_counts,
                "data": rows,
            }))?;
        }

        SamplesCommand::Show {
            project,
            index,
            next,
            prev,
        } => {
            let status = projects.status(project).await?;
            let mut pager = SamplePager::new(Some(index), status.num_samples() as u32);
            if next {
                pager.next();
            } else if prev {
                pager.previous();
            }
            if !pager.is_fetchable() {
                return Err(anyhow!(
                    "Sample {} is out of range (project has {})",
                    pager.current(),
                    pager.num_samples()
                ));
            }

            let review = SampleReview::new(session.clone(), project);
            let item = review.load(pager.current()).await?;
            let messages: Vec<_> = visible_messages(&item, session.is_superuser())
                .into_iter()
                .map(|message| {
                    let parts = split(&message.content);
                    json!({
                        "id": message.id,
                        "role": message.role.label(),
                        "think": parts.think,
                        "content": parts.body,
                    })
                })
                .collect();
            print_json(&json!({
                "line_index": item.line_index,
                "of": pager.num_samples(),
                "id": item.id,
                "status": item.status,
                "badge": StatusBadge::from(item.status).label(),
                "actions": review.available_actions().iter().map(|a| a.verb()).collect::<Vec<_>>(),
                "tools": item.tools,
                "messages": messages,
            }))?;
        }

        SamplesCommand::Navigate {
            project,
            index,
            limit,
            status,
        } => {
            let review = SampleReview::new(session.clone(), project);
            let mut nav = SampleNavigator::new(limit);
            nav.set_status_filter(status);
            let first = review.current_page(&nav).await?;
            let (outcome, page) = review.navigate(&mut nav, index, Some(&first)).await?;
            let found = page.as_ref().and_then(|p| p.find(index)).map(|item| item.id);
            print_json(&json!({
                "outcome": match outcome {
                    Navigation::ScrollTo(_) => "on-page".to_string(),
                    Navigation::ChangePage(_) => "changed-page".to_string(),
                    Navigation::Ignored(reason) => format!("ignored: {:?}", reason),
                },
                "page": nav.page(),
                "line_item_id": found,
            }))?;
        }
    }
    Ok(())
}

async fn submit(
    session: &Session,
    project: i64,
    index: u32,
    action: SampleAction,
) -> anyhow::Result<()> {
    let review = SampleReview::new(session.clone(), project);
    let response = review
        .submit_index(index, action)
        .await
        .with_context(|| format!("Failed to {} sample {}", action.verb(), index))?;
    print_json(&response)
}

/// Print every refresh of a poller until Ctrl-C or the poller stops.
async fn watch_handle<T, F>(handle: PollHandle<T>, render: F) -> anyhow::Result<()>
where
    T: Clone,
    F: FnMut(&T) -> anyhow::Result<()>,
{
    watch_until(handle, tokio::signal::ctrl_c(), render).await
}

/// Render refreshes until `stop` resolves (success) or the poller ends on its
/// own (error).
async fn watch_until<T, F, S>(handle: PollHandle<T>, stop: S, mut render: F) -> anyhow::Result<()>
where
    T: Clone,
    F: FnMut(&T) -> anyhow::Result<()>,
    S: Future,
{
    let mut events = handle.events();
    let mut rx = handle.watch();
    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = &mut stop => {
                handle.shutdown().await.ok();
                return Ok(());
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    return Err(poller_stopped(&mut events));
                }
                let latest = rx.borrow_and_update().clone();
                if let Some(value) = latest {
                    render(&value)?;
                }
            }
        }
    }
}

/// Error for a poller that ended without being asked to.
fn poller_stopped(events: &mut broadcast::Receiver<PollEvent>) -> anyhow::Error {
    let mut last_failure = None;
    let reason = loop {
        match events.try_recv() {
            Ok(PollEvent::Stopped(reason)) => break Some(reason),
            Ok(PollEvent::Failed { error }) => last_failure = Some(error),
            Ok(PollEvent::Refreshed) | Err(TryRecvError::Lagged(_)) => {}
            Err(_) => break None,
        }
    };
    match reason {
        Some(StopReason::Unauthorized) | Some(StopReason::LoggedOut) => {
            labelwise_core::Error::Unauthorized(
                "Session expired. Run `labelwise login` and set LABELWISE_TOKEN.".to_string(),
            )
            .into()
        }
        _ => anyhow!(last_failure.unwrap_or_else(|| "Polling stopped".to_string())),
    }
}
