use std::fmt;
use std::str::FromStr;

/// Identity of a reviewed test case: its locator plus the content hash of the
/// actual screenshot.
///
/// The hash is part of the identity so that a re-run producing a different
/// actual image never inherits a verdict given to the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewKey {
    pub locator: String,
    pub actual_hash: String,
}

impl ReviewKey {
    pub fn new(locator: impl Into<String>, actual_hash: impl Into<String>) -> Self {
        Self { locator: locator.into(), actual_hash: actual_hash.into() }
    }

    /// Returns the string under which this key is persisted (`locator+hash`).
    pub fn storage_key(&self) -> String {
        format!("{}+{}", self.locator, self.actual_hash)
    }
}

impl fmt::Display for ReviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.locator, self.actual_hash)
    }
}

/// The reviewer's verdict for one `ReviewKey`.
///
/// `Unset` is never written to the store; it is what an absent row reads as.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationState {
    #[default]
    Unset,
    Accepted,
    Rejected,
    /// The actual image is being promoted to baseline.
    PendingUpdate,
}

impl ClassificationState {
    /// Storage string, `None` for `Unset`.
    pub fn as_stored(self) -> Option<&'static str> {
        match self {
            ClassificationState::Unset => None,
            ClassificationState::Accepted => Some("accepted"),
            ClassificationState::Rejected => Some("rejected"),
            ClassificationState::PendingUpdate => Some("update"),
        }
    }

    /// Maps a stored string to a state. Unknown strings read as `Unset`.
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    pub fn is_verdict(self) -> bool {
        matches!(self, ClassificationState::Accepted | ClassificationState::Rejected)
    }
}

impl FromStr for ClassificationState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(ClassificationState::Accepted),
            "rejected" => Ok(ClassificationState::Rejected),
            "update" => Ok(ClassificationState::PendingUpdate),
            "unset" | "" => Ok(ClassificationState::Unset),
            other => Err(UnknownState(other.to_owned())),
        }
    }
}

impl fmt::Display for ClassificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored().unwrap_or("unset"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown classification state '{0}'")]
pub struct UnknownState(pub String);

/// One row of an index document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: ReviewKey,
    /// Row label shown in the listing.
    pub name: String,
    /// The href exactly as written in the document, before resolution.
    pub href: String,
}

/// Which stored verdicts a bulk reset removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    Accepted,
    Rejected,
    All,
}

/// Whether `ResetScope::All` also clears entries waiting on a baseline promotion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResetPolicy {
    pub all_includes_pending: bool,
}

impl ResetScope {
    /// Returns `true` when a stored `state` falls under this scope.
    pub fn matches(self, state: ClassificationState, policy: ResetPolicy) -> bool {
        match self {
            ResetScope::Accepted => state == ClassificationState::Accepted,
            ResetScope::Rejected => state == ClassificationState::Rejected,
            ResetScope::All => {
                state.is_verdict()
                    || (policy.all_includes_pending
                        && state == ClassificationState::PendingUpdate)
            }
        }
    }
}

impl FromStr for ResetScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(ResetScope::Accepted),
            "rejected" => Ok(ResetScope::Rejected),
            "all" => Ok(ResetScope::All),
            other => Err(format!("unknown reset scope '{other}'")),
        }
    }
}

/// Outcome of a bulk reset. Failed removals do not abort the rest.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResetReport {
    pub removed: usize,
    pub failed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_joins_locator_and_hash() {
        let key = ReviewKey::new("https://x/test1.html", "deadbeef");
        assert_eq!(key.storage_key(), "https://x/test1.html+deadbeef");
        assert_eq!(key.to_string(), key.storage_key());
    }

    #[test]
    fn unknown_stored_value_reads_as_unset() {
        assert_eq!(ClassificationState::from_stored("accepted"), ClassificationState::Accepted);
        assert_eq!(ClassificationState::from_stored("update"), ClassificationState::PendingUpdate);
        assert_eq!(ClassificationState::from_stored("bogus"), ClassificationState::Unset);
    }

    #[test]
    fn reset_all_keeps_pending_unless_policy_says_otherwise() {
        let keep = ResetPolicy::default();
        let clear = ResetPolicy { all_includes_pending: true };
        assert!(ResetScope::All.matches(ClassificationState::Accepted, keep));
        assert!(ResetScope::All.matches(ClassificationState::Rejected, keep));
        assert!(!ResetScope::All.matches(ClassificationState::PendingUpdate, keep));
        assert!(ResetScope::All.matches(ClassificationState::PendingUpdate, clear));
        assert!(!ResetScope::Accepted.matches(ClassificationState::Rejected, clear));
    }
}
