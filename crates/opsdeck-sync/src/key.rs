//! Logical query identities.

use std::fmt;

/// Identity of a cached query: the entity type a view reads.
///
/// `Finance` is the reshaped per-project summary view; `FinanceRaw` is the
/// full report with entries. They are distinct keys because both are cached
/// independently, and finance mutations must invalidate both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Projects,
    Clients,
    Team,
    Tasks,
    Finance,
    FinanceRaw,
    Overview,
}

impl QueryKey {
    /// The fixed key set a manual "refresh all" invalidates.
    pub const TOP_LEVEL: [QueryKey; 5] = [
        QueryKey::Projects,
        QueryKey::Finance,
        QueryKey::Tasks,
        QueryKey::Clients,
        QueryKey::Team,
    ];
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Projects => write!(f, "projects"),
            Self::Clients => write!(f, "clients"),
            Self::Team => write!(f, "team"),
            Self::Tasks => write!(f, "tasks"),
            Self::Finance => write!(f, "finance"),
            Self::FinanceRaw => write!(f, "finance-raw"),
            Self::Overview => write!(f, "overview"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(QueryKey::Projects.to_string(), "projects");
        assert_eq!(QueryKey::FinanceRaw.to_string(), "finance-raw");
    }

    #[test]
    fn test_top_level_set() {
        assert_eq!(QueryKey::TOP_LEVEL.len(), 5);
        assert!(QueryKey::TOP_LEVEL.contains(&QueryKey::Finance));
        assert!(!QueryKey::TOP_LEVEL.contains(&QueryKey::Overview));
        assert!(!QueryKey::TOP_LEVEL.contains(&QueryKey::FinanceRaw));
    }
}
