//! The read-only dashboard overview from `GET /api/reports/overview`.

use serde::{Deserialize, Serialize};

/// Headline counts for the dashboard. Computed server-side; unknown extra
/// fields are ignored and missing ones default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    #[serde(default)]
    pub project_count: u64,

    #[serde(default)]
    pub client_count: u64,

    #[serde(default)]
    pub team_count: u64,

    #[serde(default)]
    pub bug_open: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_deserializes_counts() {
        let json = r#"{"projectCount": 7, "clientCount": 3, "teamCount": 12, "bugOpen": 2}"#;
        let overview: Overview = serde_json::from_str(json).unwrap();
        assert_eq!(overview.project_count, 7);
        assert_eq!(overview.bug_open, 2);
    }

    #[test]
    fn test_overview_missing_fields_default_to_zero() {
        let overview: Overview = serde_json::from_str(r#"{"projectCount": 1}"#).unwrap();
        assert_eq!(overview.client_count, 0);
        assert_eq!(overview.team_count, 0);
    }
}
