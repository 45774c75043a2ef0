use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identity provider subject (OAuth `sub` claim).
///
/// Stable for one account across sign-ins; the trust anchor of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Subject(pub String);

impl Subject {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Aggregation window understood by the spending API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Daily, Period::Weekly, Period::Monthly];

    /// Value of the `filter` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboard tab: one aggregation window, or all three at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterTab {
    #[default]
    Daily,
    Weekly,
    Monthly,
    All,
}

impl FilterTab {
    pub const TABS: [FilterTab; 4] = [
        FilterTab::Daily,
        FilterTab::Weekly,
        FilterTab::Monthly,
        FilterTab::All,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::All => "all",
        }
    }

    /// The single period this tab shows, `None` for [`FilterTab::All`].
    #[must_use]
    pub fn period(self) -> Option<Period> {
        match self {
            Self::Daily => Some(Period::Daily),
            Self::Weekly => Some(Period::Weekly),
            Self::Monthly => Some(Period::Monthly),
            Self::All => None,
        }
    }
}

impl From<Period> for FilterTab {
    fn from(p: Period) -> Self {
        match p {
            Period::Daily => Self::Daily,
            Period::Weekly => Self::Weekly,
            Period::Monthly => Self::Monthly,
        }
    }
}

impl std::fmt::Display for FilterTab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterTab {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "all" => Ok(Self::All),
            other => Err(Error::InvalidFilter(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_tab_parses_known_names() {
        for tab in FilterTab::TABS {
            assert_eq!(tab.as_str().parse::<FilterTab>().unwrap(), tab);
        }
    }

    #[test]
    fn filter_tab_rejects_unknown_names() {
        assert!("yearly".parse::<FilterTab>().is_err());
        assert!("Daily".parse::<FilterTab>().is_err());
        assert!("".parse::<FilterTab>().is_err());
    }

    #[test]
    fn all_tab_has_no_single_period() {
        assert_eq!(FilterTab::All.period(), None);
        assert_eq!(FilterTab::Weekly.period(), Some(Period::Weekly));
        assert_eq!(FilterTab::from(Period::Monthly), FilterTab::Monthly);
    }

    #[test]
    fn period_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Period::Weekly).unwrap(), "\"weekly\"");
    }

    #[test]
    fn subject_is_transparent() {
        let sub = Subject::from("1098".to_string());
        assert_eq!(serde_json::to_string(&sub).unwrap(), "\"1098\"");
        assert_eq!(sub.to_string(), "1098");
    }
}
