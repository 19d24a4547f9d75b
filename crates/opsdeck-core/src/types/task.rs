//! Tasks: lightweight work items tracked on the kanban-style board.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{validate_percent, validate_required};

/// Board column a task sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    /// Board column order, left to right.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Review => write!(f, "review"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "in-progress" | "in progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            other => Err(Error::validation_field(
                "status",
                format!("unknown task status '{other}'"),
            )),
        }
    }
}

/// A task as returned by the server.
///
/// `status` and `progress` are independently settable: a task can be "done"
/// at 40% progress. The server does not correlate them and neither do we.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    /// Free-text assignee, not a member reference.
    #[serde(default)]
    pub assignee: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub progress: f64,
}

/// Payload for `POST /api/tasks`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub status: TaskStatus,
    pub progress: f64,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Form rules: title required, progress within [0, 100].
    pub fn validate(&self) -> Result<()> {
        validate_required("title", &self.title)?;
        validate_percent("progress", self.progress)
    }
}

/// Partial payload for `PUT /api/tasks/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_required("title", title)?;
        }
        if let Some(progress) = self.progress {
            validate_percent("progress", progress)?;
        }
        Ok(())
    }
}
