//! Entity kinds that can be queued offline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of collections held by the local store.
///
/// Declaration order is the order a sync pass walks the collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Report,
    PanicAlert,
    Evidence,
    Case,
    Note,
}

impl EntityKind {
    /// Every kind, in sync order
    pub const ALL: [Self; 5] = [
        Self::Report,
        Self::PanicAlert,
        Self::Evidence,
        Self::Case,
        Self::Note,
    ];

    /// Collection name as exposed to callers (e.g. `panicAlerts`)
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Report => "reports",
            Self::PanicAlert => "panicAlerts",
            Self::Evidence => "evidence",
            Self::Case => "cases",
            Self::Note => "notes",
        }
    }

    /// Backing SQL table
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Report => "reports",
            Self::PanicAlert => "panic_alerts",
            Self::Evidence => "evidence",
            Self::Case => "cases",
            Self::Note => "notes",
        }
    }

    /// Prefix used for locally generated ids
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::PanicAlert => "panic",
            Self::Evidence => "evidence",
            Self::Case => "case",
            Self::Note => "note",
        }
    }

    /// Schema version that introduced this collection
    #[must_use]
    pub const fn introduced_in(self) -> i32 {
        match self {
            Self::Report | Self::PanicAlert => 1,
            Self::Evidence | Self::Case | Self::Note => 2,
        }
    }

    /// Resolve the kind from a generated id's prefix
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let (prefix, _) = id.split_once('-')?;
        Self::ALL.into_iter().find(|kind| kind.id_prefix() == prefix)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.collection())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.collection().eq_ignore_ascii_case(needle)
                    || kind.table().eq_ignore_ascii_case(needle)
                    || kind.id_prefix().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| format!("unknown collection '{needle}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_collection_table_and_prefix_names() {
        assert_eq!("panicAlerts".parse::<EntityKind>(), Ok(EntityKind::PanicAlert));
        assert_eq!("panic_alerts".parse::<EntityKind>(), Ok(EntityKind::PanicAlert));
        assert_eq!("panic".parse::<EntityKind>(), Ok(EntityKind::PanicAlert));
        assert_eq!(" Reports ".parse::<EntityKind>(), Ok(EntityKind::Report));
        assert!("photos".parse::<EntityKind>().is_err());
    }

    #[test]
    fn resolves_kind_from_generated_id() {
        assert_eq!(
            EntityKind::from_id("evidence-0192f0c1-aaaa-7bbb-8ccc-000000000000"),
            Some(EntityKind::Evidence)
        );
        assert_eq!(EntityKind::from_id("bogus-123"), None);
        assert_eq!(EntityKind::from_id("noprefix"), None);
    }

    #[test]
    fn sync_order_follows_declaration() {
        let mut sorted = EntityKind::ALL;
        sorted.sort();
        assert_eq!(sorted, EntityKind::ALL);
    }
}
