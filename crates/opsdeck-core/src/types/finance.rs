//! Finance entries, the per-project totals report, and the reshape into
//! flat summary records.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{validate_required, EntityRef};

/// Direction of a finance entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Expense,
    Payment,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expense => write!(f, "expense"),
            Self::Payment => write!(f, "payment"),
        }
    }
}

impl FromStr for EntryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "payment" => Ok(Self::Payment),
            other => Err(Error::validation_field(
                "type",
                format!("unknown entry type '{other}'"),
            )),
        }
    }
}

/// A single finance entry as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceEntry {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub project: Option<EntityRef>,

    #[serde(rename = "type", default)]
    pub kind: EntryKind,

    #[serde(default)]
    pub amount: f64,

    #[serde(default)]
    pub note: Option<String>,
}

/// Per-project payment and expense totals inside the finance report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectTotals {
    /// Populated project reference, when the server resolved one.
    #[serde(default)]
    pub project: Option<EntityRef>,

    #[serde(default)]
    pub payment: f64,

    #[serde(default)]
    pub expense: f64,
}

/// Wire shape of `GET /api/finance`: a per-project summary map plus the raw
/// entry list.
///
/// The map is kept ordered by key so every derived view of the report is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinanceReport {
    #[serde(default)]
    pub summary: BTreeMap<String, ProjectTotals>,

    #[serde(default)]
    pub entries: Vec<FinanceEntry>,
}

/// Derived per-project summary record. Never stored server-side; produced
/// purely by [`FinanceReport::summaries`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub project_id: String,
    pub income: f64,
    pub expenses: f64,
    pub profit: f64,
}

impl FinanceReport {
    /// Reshape the per-project totals map into flat summary records, ordered
    /// by map key.
    ///
    /// `income` comes from `payment` and `expenses` from `expense`, both
    /// defaulting to zero when the server omits them; `profit` is always
    /// `income - expenses`. The project id prefers the populated reference
    /// and falls back to the map key. Pure and idempotent: the same report
    /// always reshapes to the same sequence.
    pub fn summaries(&self) -> Vec<FinanceSummary> {
        self.summary
            .iter()
            .map(|(key, totals)| {
                let project_id = totals
                    .project
                    .as_ref()
                    .map(|p| p.id.clone())
                    .unwrap_or_else(|| key.clone());
                FinanceSummary {
                    project_id,
                    income: totals.payment,
                    expenses: totals.expense,
                    profit: totals.payment - totals.expense,
                }
            })
            .collect()
    }
}

/// Payload for `POST /api/finance`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewFinanceEntry {
    /// Project id the entry books against.
    pub project: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NewFinanceEntry {
    pub fn new(project: impl Into<String>, kind: EntryKind, amount: f64) -> Self {
        Self {
            project: project.into(),
            kind,
            amount,
            note: None,
        }
    }

    /// Form rules: project required, amount a finite non-negative number.
    pub fn validate(&self) -> Result<()> {
        validate_required("project", &self.project)?;
        validate_amount(self.amount)
    }
}

/// Partial payload for `PUT /api/finance/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FinanceEntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FinanceEntryPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(project) = &self.project {
            validate_required("project", project)?;
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        Ok(())
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::validation_field(
            "amount",
            format!("must be a non-negative number, got {amount}"),
        ));
    }
    Ok(())
}
