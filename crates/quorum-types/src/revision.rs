use serde::{Deserialize, Serialize};

/// Opaque room-membership version marker of the form `"<seq>-<hash>"`.
///
/// The numeric prefix defines a total order within a room. The hash suffix
/// only disambiguates concurrent writers and is never interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(pub String);

impl Revision {
    /// The never-synced marker. Also used to flag a sync in progress.
    pub fn zero() -> Self {
        Revision("0".to_string())
    }

    /// Numeric prefix up to the first `-`. Malformed prefixes sort as zero.
    pub fn seq(&self) -> u64 {
        let digits = self.0.split('-').next().unwrap_or("");
        digits.parse().unwrap_or(0)
    }

    pub fn is_newer_than(&self, other: &Revision) -> bool {
        self.seq() > other.seq()
    }

    pub fn is_at_least(&self, other: &Revision) -> bool {
        self.seq() >= other.seq()
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
