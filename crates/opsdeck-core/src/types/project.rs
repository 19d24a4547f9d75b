//! Projects: the central entity tying clients, team members, and finance
//! entries together.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{validate_percent, validate_required, EntityRef};

/// Lifecycle status of a project.
///
/// Wire values match the server verbatim, spaces and hyphens included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[default]
    Planned,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    #[serde(rename = "On-Hold")]
    OnHold,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planned => write!(f, "Planned"),
            Self::InProgress => write!(f, "In Progress"),
            Self::Completed => write!(f, "Completed"),
            Self::OnHold => write!(f, "On-Hold"),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "planned" => Ok(Self::Planned),
            "in progress" | "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on-hold" | "on hold" => Ok(Self::OnHold),
            other => Err(Error::validation_field(
                "status",
                format!("unknown project status '{other}'"),
            )),
        }
    }
}

/// Project priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(Error::validation_field(
                "priority",
                format!("unknown priority '{other}'"),
            )),
        }
    }
}

/// A project as returned by the server, with populated client and team
/// references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(default)]
    pub priority: Priority,

    /// Invariant: 0 ≤ completionPercent ≤ 100, enforced on write payloads.
    #[serde(default)]
    pub completion_percent: f64,

    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub client: Option<EntityRef>,

    #[serde(default)]
    pub team: Vec<EntityRef>,

    #[serde(default)]
    pub archived: bool,
}

/// Payload for `POST /api/projects`.
///
/// References are plain id strings here; the server populates them on read.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub completion_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub team: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl NewProject {
    /// New project payload with defaults matching the create form.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Form rules: name required, completion within [0, 100].
    pub fn validate(&self) -> Result<()> {
        validate_required("name", &self.name)?;
        validate_percent("completionPercent", self.completion_percent)
    }
}

/// Partial payload for `PUT /api/projects/{id}`. Absent fields are left
/// untouched by the server.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl ProjectPatch {
    /// The archive action: a patch flipping only the archived flag.
    pub fn archive() -> Self {
        Self {
            archived: Some(true),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_required("name", name)?;
        }
        if let Some(percent) = self.completion_percent {
            validate_percent("completionPercent", percent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(
            serde_json::to_string(&ProjectStatus::OnHold).unwrap(),
            "\"On-Hold\""
        );
        let status: ProjectStatus = serde_json::from_str("\"In Progress\"").unwrap();
        assert_eq!(status, ProjectStatus::InProgress);
    }

    #[test]
    fn test_status_from_str_accepts_both_spellings() {
        assert_eq!(
            "in-progress".parse::<ProjectStatus>().unwrap(),
            ProjectStatus::InProgress
        );
        assert_eq!(
            "On Hold".parse::<ProjectStatus>().unwrap(),
            ProjectStatus::OnHold
        );
        assert!("cancelled".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Critical);
    }

    #[test]
    fn test_project_deserializes_server_document() {
        let json = r#"{
            "_id": "proj-1",
            "name": "Apollo",
            "status": "In Progress",
            "priority": "High",
            "completionPercent": 62.5,
            "startDate": "2025-03-01T00:00:00Z",
            "client": {"_id": "c1", "name": "Acme"},
            "team": [{"_id": "m1", "name": "Alice"}, {"_id": "m2"}],
            "archived": false
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, "proj-1");
        assert_eq!(project.status, ProjectStatus::InProgress);
        assert_eq!(project.priority, Priority::High);
        assert_eq!(project.completion_percent, 62.5);
        assert!(project.end_date.is_none());
        assert_eq!(project.client.as_ref().unwrap().id, "c1");
        assert_eq!(project.team.len(), 2);
        assert!(!project.archived);
    }

    #[test]
    fn test_project_missing_optional_fields_defaults() {
        let project: Project =
            serde_json::from_str(r#"{"_id": "p", "name": "Bare"}"#).unwrap();
        assert_eq!(project.status, ProjectStatus::Planned);
        assert_eq!(project.priority, Priority::Medium);
        assert_eq!(project.completion_percent, 0.0);
        assert!(project.team.is_empty());
    }

    #[test]
    fn test_new_project_validate() {
        assert!(NewProject::new("Apollo").validate().is_ok());
        assert!(NewProject::new("  ").validate().is_err());

        let mut over = NewProject::new("Apollo");
        over.completion_percent = 120.0;
        assert!(over.validate().is_err());
    }

    #[test]
    fn test_new_project_skips_absent_references() {
        let payload = serde_json::to_value(NewProject::new("Apollo")).unwrap();
        assert!(payload.get("client").is_none());
        assert!(payload.get("startDate").is_none());
        assert_eq!(payload["completionPercent"], 0.0);
    }

    #[test]
    fn test_archive_patch_serializes_only_archived() {
        let patch = serde_json::to_value(ProjectPatch::archive()).unwrap();
        assert_eq!(patch, serde_json::json!({"archived": true}));
    }

    #[test]
    fn test_patch_validates_present_fields_only() {
        assert!(ProjectPatch::default().validate().is_ok());
        let patch = ProjectPatch {
            completion_percent: Some(101.0),
            ..ProjectPatch::default()
        };
        assert!(patch.validate().is_err());
    }
}
