use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(JobId);

/// Source recorded for jobs added by hand through the add-job form.
pub const MANUAL_SOURCE: &str = "Manual";

/// Source recorded when a scraped job carries no recognisable origin.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Filter on the `applied` flag of a listing.
///
/// Parsed leniently from the `applied` query parameter: only `"true"` and
/// `"false"` restrict the listing, every other value means "any".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppliedFilter {
    #[default]
    Any,
    Applied,
    NotApplied,
}

impl AppliedFilter {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("true") => Self::Applied,
            Some("false") => Self::NotApplied,
            _ => Self::Any,
        }
    }

    pub fn as_param(self) -> Option<&'static str> {
        match self {
            Self::Any => None,
            Self::Applied => Some("true"),
            Self::NotApplied => Some("false"),
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Any => None,
            Self::Applied => Some(true),
            Self::NotApplied => Some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_filter_ignores_unknown_values() {
        assert_eq!(AppliedFilter::from_param(Some("true")), AppliedFilter::Applied);
        assert_eq!(
            AppliedFilter::from_param(Some("false")),
            AppliedFilter::NotApplied
        );
        assert_eq!(AppliedFilter::from_param(Some("yes")), AppliedFilter::Any);
        assert_eq!(AppliedFilter::from_param(None), AppliedFilter::Any);
    }

    #[test]
    fn job_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&JobId(42)).expect("json");
        assert_eq!(json, "42");
        assert_eq!(JobId(42).to_string(), "42");
    }
}
