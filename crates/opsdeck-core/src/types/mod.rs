//! Domain entities, write payloads, and derived shapes.
//!
//! Entities mirror the remote system's wire format: MongoDB-style `_id`
//! string identifiers and camelCase field names. The client never invents
//! identity — every entity here is a transient, invalidatable copy of a
//! server-owned document.
//!
//! Write payloads (`New*` for create, `*Patch` for update) are separate from
//! the entities because the server accepts plain id strings where it returns
//! populated references. Each payload carries a `validate()` implementing the
//! client-side form rules: violations surface before any request is sent.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

mod directory;
mod finance;
mod overview;
mod project;
mod task;

pub use directory::{
    Client, ClientPatch, MemberPatch, NewClient, NewMember, Role, TeamMember,
};
pub use finance::{
    EntryKind, FinanceEntry, FinanceEntryPatch, FinanceReport, FinanceSummary, NewFinanceEntry,
    ProjectTotals,
};
pub use overview::Overview;
pub use project::{NewProject, Priority, Project, ProjectPatch, ProjectStatus};
pub use task::{NewTask, Task, TaskPatch, TaskStatus};

/// A populated reference embedded by the server (e.g. a project's client, a
/// finance entry's project). Only identity and display name are carried;
/// unknown sibling fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Referenced document id.
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name, when the server populated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityRef {
    /// Display name, falling back to the id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Reject percentages outside [0, 100].
pub(crate) fn validate_percent(field: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(Error::validation_field(
            field,
            format!("must be between 0 and 100, got {value}"),
        ));
    }
    Ok(())
}

/// Reject a blank required string field.
pub(crate) fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation_field(field, format!("{field} is required")));
    }
    Ok(())
}

/// Lightweight email shape check: one `@` with a dotted domain. Full
/// address validation stays the server's job.
pub(crate) fn validate_email(field: &str, value: &str) -> Result<()> {
    let valid = matches!(
        value.split_once('@'),
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    );
    if !valid {
        return Err(Error::validation_field(field, "Invalid email"));
    }
    Ok(())
}
