//! Command handlers: wire the cache, client, and session together and print
//! the results.
//!
//! Every read goes through the [`SyncCache`] and every write declares the
//! keys it invalidates, so the CLI exercises the same synchronization
//! contract the dashboard views rely on.

use std::sync::Arc;

use anyhow::Result;

use opsdeck_client::ApiClient;
use opsdeck_core::types::{
    ClientPatch, FinanceEntryPatch, FinanceSummary, MemberPatch, NewClient, NewFinanceEntry,
    NewMember, NewProject, NewTask, Project, ProjectPatch, Task, TaskPatch, TaskStatus,
};
use opsdeck_core::ApiConfig;
use opsdeck_session::{FileTokenStore, Session};
use opsdeck_sync::{QueryKey, SyncCache};

use crate::cli::{ClientCmd, FinanceCmd, ProjectCmd, TaskCmd, TeamCmd};

/// Everything a command needs: the session, the typed client, and the cache
/// coordinating between them.
pub struct App {
    session: Session,
    client: ApiClient,
    cache: SyncCache,
}

impl App {
    /// Build the app context: config from flag or environment, session
    /// restored from the platform token store.
    pub fn new(api_base: Option<String>) -> Result<Self> {
        let config = match api_base {
            Some(base) => ApiConfig::new(base),
            None => ApiConfig::from_env(),
        };
        tracing::debug!("Using API base {}", config.base_url());

        let store = FileTokenStore::default_path()?;
        let session = Session::new(&config, store);
        let client = ApiClient::new(&config, session.clone());

        Ok(Self {
            session,
            client,
            cache: SyncCache::new(),
        })
    }

    // ------------------------------------------------------------------
    // Session commands
    // ------------------------------------------------------------------

    pub async fn login(&self, password: &str, email: Option<&str>) -> Result<()> {
        self.session.login(password, email).await?;
        println!("Logged in.");
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.session.logout()?;
        println!("Logged out.");
        Ok(())
    }

    pub fn status(&self) -> Result<()> {
        if self.session.is_authenticated() {
            println!("Session: authenticated");
        } else {
            println!("Session: anonymous");
        }
        if let Some(error) = self.session.last_error() {
            println!("Last login error: {error}");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dashboard & refresh
    // ------------------------------------------------------------------

    pub async fn dashboard(&self) -> Result<()> {
        let overview = self
            .cache
            .query(QueryKey::Overview, || self.client.overview())
            .await?;
        let projects = self.projects().await?;
        let finance = self.finance_summaries().await?;
        let tasks = self.tasks().await?;

        println!(
            "Projects: {}   Clients: {}   Team: {}   Open bugs: {}",
            overview.project_count, overview.client_count, overview.team_count, overview.bug_open
        );

        println!("\nProject progress");
        for project in projects.iter() {
            println!(
                "  {:<28} {:<12} {:>6}",
                project.name,
                project.status.to_string(),
                percent(project.completion_percent)
            );
        }

        println!("\nProfit by project");
        for summary in finance.iter() {
            println!(
                "  {:<28} income {:>12}  expenses {:>12}  profit {:>12}",
                summary.project_id,
                money(summary.income),
                money(summary.expenses),
                money(summary.profit)
            );
        }

        println!("\nTasks");
        for (status, count) in task_counts(&tasks) {
            println!("  {:<12} {count}", status.to_string());
        }
        Ok(())
    }

    pub async fn refresh(&self) -> Result<()> {
        self.cache.refresh_all();
        let projects = self.projects().await?;
        let clients = self.clients().await?;
        let team = self.team().await?;
        let tasks = self.tasks().await?;
        let finance = self.finance_summaries().await?;
        println!(
            "Refreshed: {} projects, {} clients, {} team members, {} tasks, {} finance rows",
            projects.len(),
            clients.len(),
            team.len(),
            tasks.len(),
            finance.len()
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    pub async fn run_projects(&self, cmd: ProjectCmd) -> Result<()> {
        match cmd {
            ProjectCmd::List => {
                let projects = self.projects().await?;
                println!(
                    "{:<26} {:<28} {:<12} {:<9} {:>6}  {}",
                    "ID", "NAME", "STATUS", "PRIORITY", "DONE", "CLIENT"
                );
                for project in projects.iter() {
                    println!(
                        "{:<26} {:<28} {:<12} {:<9} {:>6}  {}{}",
                        project.id,
                        project.name,
                        project.status.to_string(),
                        project.priority.to_string(),
                        percent(project.completion_percent),
                        project
                            .client
                            .as_ref()
                            .map(|c| c.label().to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        if project.archived { "  [archived]" } else { "" }
                    );
                }
            }
            ProjectCmd::Create {
                name,
                status,
                priority,
                completion,
                client,
                team,
                start,
                end,
            } => {
                let payload = NewProject {
                    name,
                    status,
                    priority,
                    completion_percent: completion,
                    client,
                    team,
                    start_date: start,
                    end_date: end,
                };
                let created = self
                    .cache
                    .mutate(&[QueryKey::Projects], || {
                        self.client.create_project(&payload)
                    })
                    .await?;
                println!("Created project '{}' ({})", created.name, created.id);
            }
            ProjectCmd::Update {
                id,
                name,
                status,
                priority,
                completion,
                client,
                team,
                start,
                end,
            } => {
                let patch = ProjectPatch {
                    name,
                    status,
                    priority,
                    completion_percent: completion,
                    client,
                    team,
                    start_date: start,
                    end_date: end,
                    archived: None,
                };
                let updated = self
                    .cache
                    .mutate(&[QueryKey::Projects], || {
                        self.client.update_project(&id, &patch)
                    })
                    .await?;
                println!("Updated project '{}'", updated.name);
            }
            ProjectCmd::Archive { id } => {
                let patch = ProjectPatch::archive();
                let archived = self
                    .cache
                    .mutate(&[QueryKey::Projects], || {
                        self.client.update_project(&id, &patch)
                    })
                    .await?;
                println!("Archived project '{}'", archived.name);
            }
            ProjectCmd::Delete { id } => {
                self.cache
                    .mutate(&[QueryKey::Projects], || self.client.delete_project(&id))
                    .await?;
                println!("Deleted project {id}");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    pub async fn run_clients(&self, cmd: ClientCmd) -> Result<()> {
        match cmd {
            ClientCmd::List => {
                let clients = self.clients().await?;
                println!(
                    "{:<26} {:<24} {:<20} {:<20} {}",
                    "ID", "NAME", "COMPANY", "CONTACT", "EMAIL"
                );
                for client in clients.iter() {
                    println!(
                        "{:<26} {:<24} {:<20} {:<20} {}",
                        client.id,
                        client.name,
                        client.company.as_deref().unwrap_or("-"),
                        client.contact_name.as_deref().unwrap_or("-"),
                        client.email.as_deref().unwrap_or("-")
                    );
                }
            }
            ClientCmd::Create {
                name,
                company,
                contact,
                email,
                phone,
            } => {
                let payload = NewClient {
                    name,
                    company,
                    contact_name: contact,
                    email,
                    phone,
                };
                let created = self
                    .cache
                    .mutate(&[QueryKey::Clients], || self.client.create_client(&payload))
                    .await?;
                println!("Added client '{}' ({})", created.name, created.id);
            }
            ClientCmd::Update {
                id,
                name,
                company,
                contact,
                email,
                phone,
            } => {
                let patch = ClientPatch {
                    name,
                    company,
                    contact_name: contact,
                    email,
                    phone,
                };
                let updated = self
                    .cache
                    .mutate(&[QueryKey::Clients], || {
                        self.client.update_client(&id, &patch)
                    })
                    .await?;
                println!("Updated client '{}'", updated.name);
            }
            ClientCmd::Delete { id } => {
                self.cache
                    .mutate(&[QueryKey::Clients], || self.client.delete_client(&id))
                    .await?;
                println!("Deleted client {id}");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Team
    // ------------------------------------------------------------------

    pub async fn run_team(&self, cmd: TeamCmd) -> Result<()> {
        match cmd {
            TeamCmd::List => {
                let team = self.team().await?;
                println!("{:<26} {:<24} {:<12} {}", "ID", "NAME", "ROLE", "EMAIL");
                for member in team.iter() {
                    println!(
                        "{:<26} {:<24} {:<12} {}",
                        member.id,
                        member.name,
                        member.role.to_string(),
                        member.email.as_deref().unwrap_or("-")
                    );
                }
            }
            TeamCmd::Create { name, email, role } => {
                let payload = NewMember { name, email, role };
                let created = self
                    .cache
                    .mutate(&[QueryKey::Team], || self.client.create_member(&payload))
                    .await?;
                println!("Added member '{}' ({})", created.name, created.id);
            }
            TeamCmd::Update {
                id,
                name,
                email,
                role,
            } => {
                let patch = MemberPatch { name, email, role };
                let updated = self
                    .cache
                    .mutate(&[QueryKey::Team], || self.client.update_member(&id, &patch))
                    .await?;
                println!("Updated member '{}'", updated.name);
            }
            TeamCmd::Delete { id } => {
                self.cache
                    .mutate(&[QueryKey::Team], || self.client.delete_member(&id))
                    .await?;
                println!("Deleted member {id}");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn run_tasks(&self, cmd: TaskCmd) -> Result<()> {
        match cmd {
            TaskCmd::List => {
                let tasks = self.tasks().await?;
                for status in TaskStatus::ALL {
                    let group: Vec<&Task> =
                        tasks.iter().filter(|t| t.status == status).collect();
                    println!("{} ({})", status, group.len());
                    for task in group {
                        println!(
                            "  {:<26} {:<32} {:>6}  {}",
                            task.id,
                            task.title,
                            percent(task.progress),
                            task.assignee.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
            TaskCmd::Create {
                title,
                assignee,
                status,
                progress,
            } => {
                let payload = NewTask {
                    title,
                    assignee,
                    status,
                    progress,
                };
                let created = self
                    .cache
                    .mutate(&[QueryKey::Tasks], || self.client.create_task(&payload))
                    .await?;
                println!("Created task '{}' ({})", created.title, created.id);
            }
            TaskCmd::Update {
                id,
                title,
                assignee,
                status,
                progress,
            } => {
                let patch = TaskPatch {
                    title,
                    assignee,
                    status,
                    progress,
                };
                let updated = self
                    .cache
                    .mutate(&[QueryKey::Tasks], || self.client.update_task(&id, &patch))
                    .await?;
                println!("Updated task '{}'", updated.title);
            }
            TaskCmd::Delete { id } => {
                self.cache
                    .mutate(&[QueryKey::Tasks], || self.client.delete_task(&id))
                    .await?;
                println!("Deleted task {id}");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Finance
    // ------------------------------------------------------------------

    pub async fn run_finance(&self, cmd: FinanceCmd) -> Result<()> {
        match cmd {
            FinanceCmd::Summary => {
                let summaries = self.finance_summaries().await?;
                println!(
                    "{:<28} {:>12} {:>12} {:>12}",
                    "PROJECT", "INCOME", "EXPENSES", "PROFIT"
                );
                for summary in summaries.iter() {
                    println!(
                        "{:<28} {:>12} {:>12} {:>12}",
                        summary.project_id,
                        money(summary.income),
                        money(summary.expenses),
                        money(summary.profit)
                    );
                }
                let (income, expenses) = totals(&summaries);
                println!(
                    "{:<28} {:>12} {:>12} {:>12}",
                    "TOTAL",
                    money(income),
                    money(expenses),
                    money(income - expenses)
                );
            }
            FinanceCmd::Entries => {
                let report = self
                    .cache
                    .query(QueryKey::FinanceRaw, || self.client.finance_report())
                    .await?;
                println!(
                    "{:<26} {:<24} {:<8} {:>12}  {}",
                    "ID", "PROJECT", "TYPE", "AMOUNT", "NOTE"
                );
                for entry in &report.entries {
                    println!(
                        "{:<26} {:<24} {:<8} {:>12}  {}",
                        entry.id,
                        entry
                            .project
                            .as_ref()
                            .map(|p| p.label().to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        entry.kind.to_string(),
                        money(entry.amount),
                        entry.note.as_deref().unwrap_or("")
                    );
                }
            }
            FinanceCmd::Add {
                project,
                amount,
                kind,
                note,
            } => {
                let mut payload = NewFinanceEntry::new(project, kind, amount);
                payload.note = note;
                let created = self
                    .cache
                    .mutate(&[QueryKey::Finance, QueryKey::FinanceRaw], || {
                        self.client.create_finance_entry(&payload)
                    })
                    .await?;
                println!("Added {} entry ({})", created.kind, created.id);
            }
            FinanceCmd::Update {
                id,
                project,
                amount,
                kind,
                note,
            } => {
                let patch = FinanceEntryPatch {
                    project,
                    kind,
                    amount,
                    note,
                };
                let updated = self
                    .cache
                    .mutate(&[QueryKey::Finance, QueryKey::FinanceRaw], || {
                        self.client.update_finance_entry(&id, &patch)
                    })
                    .await?;
                println!("Updated entry {}", updated.id);
            }
            FinanceCmd::Delete { id } => {
                self.cache
                    .mutate(&[QueryKey::Finance, QueryKey::FinanceRaw], || {
                        self.client.delete_finance_entry(&id)
                    })
                    .await?;
                println!("Deleted entry {id}");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cached reads
    // ------------------------------------------------------------------

    async fn projects(&self) -> Result<Arc<Vec<Project>>> {
        Ok(self
            .cache
            .query(QueryKey::Projects, || self.client.list_projects())
            .await?)
    }

    async fn clients(&self) -> Result<Arc<Vec<opsdeck_core::types::Client>>> {
        Ok(self
            .cache
            .query(QueryKey::Clients, || self.client.list_clients())
            .await?)
    }

    async fn team(&self) -> Result<Arc<Vec<opsdeck_core::types::TeamMember>>> {
        Ok(self
            .cache
            .query(QueryKey::Team, || self.client.list_team())
            .await?)
    }

    async fn tasks(&self) -> Result<Arc<Vec<Task>>> {
        Ok(self
            .cache
            .query(QueryKey::Tasks, || self.client.list_tasks())
            .await?)
    }

    async fn finance_summaries(&self) -> Result<Arc<Vec<FinanceSummary>>> {
        Ok(self
            .cache
            .query(QueryKey::Finance, || self.client.finance_summary())
            .await?)
    }
}

// ----------------------------------------------------------------------
// Formatting helpers
// ----------------------------------------------------------------------

fn money(value: f64) -> String {
    format!("${value:.2}")
}

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn totals(summaries: &[FinanceSummary]) -> (f64, f64) {
    summaries
        .iter()
        .fold((0.0, 0.0), |(income, expenses), s| {
            (income + s.income, expenses + s.expenses)
        })
}

fn task_counts(tasks: &[Task]) -> Vec<(TaskStatus, usize)> {
    TaskStatus::ALL
        .iter()
        .map(|&status| (status, tasks.iter().filter(|t| t.status == status).count()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            assignee: None,
            status,
            progress: 0.0,
        }
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1200.0), "$1200.00");
        assert_eq!(money(-50.255), "$-50.25");
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(percent(62.55), "62.5%");
        assert_eq!(percent(0.0), "0.0%");
    }

    #[test]
    fn test_totals_sums_income_and_expenses() {
        let summaries = vec![
            FinanceSummary {
                project_id: "a".into(),
                income: 100.0,
                expenses: 30.0,
                profit: 70.0,
            },
            FinanceSummary {
                project_id: "b".into(),
                income: 0.0,
                expenses: 20.0,
                profit: -20.0,
            },
        ];
        assert_eq!(totals(&summaries), (100.0, 50.0));
    }

    #[test]
    fn test_task_counts_follow_board_order() {
        let tasks = vec![
            task("1", TaskStatus::Done),
            task("2", TaskStatus::Todo),
            task("3", TaskStatus::Done),
        ];
        let counts = task_counts(&tasks);
        assert_eq!(counts[0], (TaskStatus::Todo, 1));
        assert_eq!(counts[1], (TaskStatus::InProgress, 0));
        assert_eq!(counts[2], (TaskStatus::Review, 0));
        assert_eq!(counts[3], (TaskStatus::Done, 2));
    }
}
