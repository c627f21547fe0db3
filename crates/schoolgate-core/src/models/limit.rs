//! Resource kinds and quota limits.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tenant-scoped resource kinds that carry a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Students,
    Teachers,
    Staff,
    Parents,
    Classes,
    Buses,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Students,
        ResourceKind::Teachers,
        ResourceKind::Staff,
        ResourceKind::Parents,
        ResourceKind::Classes,
        ResourceKind::Buses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Students => "students",
            ResourceKind::Teachers => "teachers",
            ResourceKind::Staff => "staff",
            ResourceKind::Parents => "parents",
            ResourceKind::Classes => "classes",
            ResourceKind::Buses => "buses",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quota ceiling.
///
/// `Unlimited` is its own variant rather than a large sentinel number, so
/// comparisons never special-case a magic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LimitRepr", into = "LimitRepr")]
pub enum Limit {
    Finite(u64),
    Unlimited,
}

impl Limit {
    /// Whether `current` existing resources leave room for one more.
    pub fn admits(self, current: u64) -> bool {
        match self {
            Limit::Finite(max) => current < max,
            Limit::Unlimited => true,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(max) => write!(f, "{max}"),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Stored form: a number or the word `"unlimited"`. Legacy plan rows use
/// negative numbers for unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Count(u64),
    Negative(i64),
    Word(String),
}

impl TryFrom<LimitRepr> for Limit {
    type Error = String;

    fn try_from(repr: LimitRepr) -> Result<Self, Self::Error> {
        match repr {
            LimitRepr::Count(n) => Ok(Limit::Finite(n)),
            LimitRepr::Negative(n) if n < 0 => Ok(Limit::Unlimited),
            LimitRepr::Negative(n) => Ok(Limit::Finite(n.unsigned_abs())),
            LimitRepr::Word(w) if w.eq_ignore_ascii_case("unlimited") => Ok(Limit::Unlimited),
            LimitRepr::Word(w) => Err(format!("invalid limit: {w}")),
        }
    }
}

impl From<Limit> for LimitRepr {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Finite(max) => LimitRepr::Count(max),
            Limit::Unlimited => LimitRepr::Word("unlimited".into()),
        }
    }
}

/// Sparse resource-kind → limit map, used for plan defaults and tenant
/// overrides alike.
pub type LimitMap = BTreeMap<ResourceKind, Limit>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_limit_admits_below_max_only() {
        assert!(Limit::Finite(5).admits(4));
        assert!(!Limit::Finite(5).admits(5));
        assert!(!Limit::Finite(0).admits(0));
    }

    #[test]
    fn unlimited_admits_everything() {
        assert!(Limit::Unlimited.admits(10_000_000));
        assert!(Limit::Unlimited.admits(u64::MAX));
    }

    #[test]
    fn limit_map_accepts_stored_forms() {
        let map: LimitMap =
            serde_json::from_str(r#"{"students": "unlimited", "teachers": 12, "buses": -1}"#)
                .unwrap();
        assert_eq!(map[&ResourceKind::Students], Limit::Unlimited);
        assert_eq!(map[&ResourceKind::Teachers], Limit::Finite(12));
        assert_eq!(map[&ResourceKind::Buses], Limit::Unlimited);
    }

    #[test]
    fn limit_rejects_unknown_words() {
        assert!(serde_json::from_str::<Limit>(r#""lots""#).is_err());
    }

    #[test]
    fn limit_serializes_unlimited_as_word() {
        assert_eq!(
            serde_json::to_string(&Limit::Unlimited).unwrap(),
            r#""unlimited""#
        );
        assert_eq!(serde_json::to_string(&Limit::Finite(50)).unwrap(), "50");
    }

    #[test]
    fn large_finite_limits_are_stored_exactly() {
        let max = Limit::Finite(u64::MAX);
        let stored = serde_json::to_string(&max).unwrap();
        assert_eq!(stored, u64::MAX.to_string());
        assert_eq!(serde_json::from_str::<Limit>(&stored).unwrap(), max);

        let above_signed = Limit::Finite(i64::MAX as u64 + 1);
        let stored = serde_json::to_string(&above_signed).unwrap();
        assert_eq!(serde_json::from_str::<Limit>(&stored).unwrap(), above_signed);
    }
}
