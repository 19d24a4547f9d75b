//! Command-line surface: argument and subcommand definitions.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use opsdeck_core::types::{EntryKind, Priority, ProjectStatus, Role, TaskStatus};

/// Opsdeck - business dashboard from the terminal
#[derive(Parser, Debug)]
#[command(name = "opsdeck")]
#[command(about = "Opsdeck business dashboard CLI", long_about = None)]
pub struct Args {
    /// Remote API base URL (overrides the environment)
    #[arg(long, env = "OPSDECK_API_BASE")]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in: primary email+password, with demo-password fallback
    Login {
        /// Password; prefer the environment variable over the flag
        #[arg(long, env = "OPSDECK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Email for the primary login endpoint
        #[arg(long)]
        email: Option<String>,
    },

    /// Log out and clear the stored token
    Logout,

    /// Show session state
    Status,

    /// Overview counts, project progress, finance summary, task distribution
    Dashboard,

    /// Invalidate and refetch all top-level views
    Refresh,

    /// Project reporting
    #[command(subcommand)]
    Projects(ProjectCmd),

    /// Client directory
    #[command(subcommand)]
    Clients(ClientCmd),

    /// Team directory
    #[command(subcommand)]
    Team(TeamCmd),

    /// Task tracking board
    #[command(subcommand)]
    Tasks(TaskCmd),

    /// Financial analytics
    #[command(subcommand)]
    Finance(FinanceCmd),
}

#[derive(Subcommand, Debug)]
pub enum ProjectCmd {
    /// List projects
    List,

    /// Create a project
    Create {
        name: String,
        #[arg(long, default_value = "planned")]
        status: ProjectStatus,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Completion percentage, 0-100
        #[arg(long, default_value_t = 0.0)]
        completion: f64,
        /// Client id
        #[arg(long)]
        client: Option<String>,
        /// Team member id (repeatable)
        #[arg(long = "member")]
        team: Vec<String>,
        /// Start date, RFC 3339
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// End date, RFC 3339
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },

    /// Update fields on a project
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        status: Option<ProjectStatus>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        completion: Option<f64>,
        #[arg(long)]
        client: Option<String>,
        #[arg(long = "member")]
        team: Option<Vec<String>>,
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },

    /// Archive a project
    Archive { id: String },

    /// Delete a project
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ClientCmd {
    /// List clients
    List,

    /// Add a client
    Create {
        name: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Update fields on a client
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Delete a client
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TeamCmd {
    /// List team members
    List,

    /// Add a team member
    Create {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = "Developer")]
        role: Role,
    },

    /// Update fields on a team member
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<Role>,
    },

    /// Delete a team member
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TaskCmd {
    /// List tasks grouped by board column
    List,

    /// Create a task
    Create {
        title: String,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, default_value = "todo")]
        status: TaskStatus,
        /// Progress percentage, 0-100
        #[arg(long, default_value_t = 0.0)]
        progress: f64,
    },

    /// Update fields on a task
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        progress: Option<f64>,
    },

    /// Delete a task
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum FinanceCmd {
    /// Per-project income, expenses, and profit
    Summary,

    /// Raw finance entries
    Entries,

    /// Add a finance entry
    Add {
        /// Project id the entry books against
        project: String,
        amount: f64,
        #[arg(long, default_value = "expense")]
        kind: EntryKind,
        #[arg(long)]
        note: Option<String>,
    },

    /// Update fields on a finance entry
    Update {
        id: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        kind: Option<EntryKind>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a finance entry
    Delete { id: String },
}
