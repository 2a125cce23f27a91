//! Stepping from one reviewed case to the next without going back to the index.
//!
//! A review page opened from an index keeps an [`Opener`]: a weak, read-only
//! link to whatever exposes the index's entry order. The index may be closed
//! (the link no longer upgrades) or belong to another origin; either way the
//! lookup degrades to "no next case".

use std::rc::Weak;

use crate::document::origin_of;
use crate::types::{IndexEntry, ReviewKey};

/// Returns the entry right after the first entry whose key is `current`.
///
/// `None` when `current` is not listed or is the last entry. Classification is
/// not consulted: reviewed and unreviewed cases are both visited.
pub fn next_after<'a>(entries: &'a [IndexEntry], current: &ReviewKey) -> Option<&'a IndexEntry> {
    let idx = entries.iter().position(|e| &e.key == current)?;
    entries.get(idx + 1)
}

/// Like [`next_after`], but skips following entries for which `keep` is false.
pub fn next_after_matching<'a, F>(
    entries: &'a [IndexEntry],
    current: &ReviewKey,
    mut keep: F,
) -> Option<&'a IndexEntry>
where
    F: FnMut(&IndexEntry) -> bool,
{
    let idx = entries.iter().position(|e| &e.key == current)?;
    entries[idx + 1..].iter().find(|e| keep(e))
}

/// Read-only query interface an index exposes to the review pages it opens.
pub trait EntrySource {
    /// Origin (`scheme://host[:port]`) of the index document.
    fn origin(&self) -> &str;

    /// Index entries in document order.
    fn ordered_entries(&self) -> &[IndexEntry];
}

/// Weak link from a review page back to the index that opened it.
#[derive(Clone)]
pub struct Opener {
    source: Weak<dyn EntrySource>,
}

impl Opener {
    pub fn new(source: Weak<dyn EntrySource>) -> Self {
        Self { source }
    }

    /// Returns `true` while the opening index is still alive.
    pub fn is_open(&self) -> bool {
        self.source.strong_count() > 0
    }

    /// Looks up the case after `current` in the opener's entry order.
    ///
    /// Returns `None` when the opener is gone, when it belongs to a different
    /// origin than `current`, or when there is no next entry. `keep` filters
    /// candidate entries (pass `|_| true` to visit everything).
    pub fn next_after<F>(&self, current: &ReviewKey, keep: F) -> Option<IndexEntry>
    where
        F: FnMut(&IndexEntry) -> bool,
    {
        let Some(source) = self.source.upgrade() else {
            tracing::debug!(key = %current, "opener closed, no next case");
            return None;
        };
        if source.origin() != origin_of(&current.locator) {
            tracing::debug!(
                key = %current,
                opener = source.origin(),
                "opener belongs to another origin, no next case"
            );
            return None;
        }
        next_after_matching(source.ordered_entries(), current, keep).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    fn entry(name: &str) -> IndexEntry {
        IndexEntry {
            key: ReviewKey::new(format!("https://x/{name}.html"), format!("{name}-hash")),
            name: name.to_owned(),
            href: format!("{name}.html"),
        }
    }

    struct Listing {
        origin: String,
        entries: Vec<IndexEntry>,
    }

    impl EntrySource for Listing {
        fn origin(&self) -> &str {
            &self.origin
        }

        fn ordered_entries(&self) -> &[IndexEntry] {
            &self.entries
        }
    }

    #[test]
    fn next_after_follows_document_order() {
        let entries = vec![entry("a"), entry("b"), entry("c")];
        assert_eq!(next_after(&entries, &entries[1].key), Some(&entries[2]));
        assert_eq!(next_after(&entries, &entries[0].key), Some(&entries[1]));
        assert_eq!(next_after(&entries, &entries[2].key), None);
        assert_eq!(next_after(&entries, &entry("x").key), None);
        assert_eq!(next_after(&[], &entries[0].key), None);
    }

    #[test]
    fn next_after_requires_matching_hash() {
        let entries = vec![entry("a"), entry("b")];
        let stale = ReviewKey::new("https://x/a.html", "other-hash");
        assert_eq!(next_after(&entries, &stale), None);
    }

    #[test]
    fn next_after_matching_skips_filtered_entries() {
        let entries = vec![entry("a"), entry("b"), entry("c")];
        let next = next_after_matching(&entries, &entries[0].key, |e| e.name != "b");
        assert_eq!(next, Some(&entries[2]));
        assert_eq!(next_after_matching(&entries, &entries[0].key, |_| false), None);
    }

    #[test]
    fn opener_degrades_when_closed_or_foreign() {
        let listing = Rc::new(Listing {
            origin: "https://x".to_owned(),
            entries: vec![entry("a"), entry("b")],
        });
        let weak: Weak<dyn EntrySource> = Rc::downgrade(&listing) as Weak<dyn EntrySource>;
        let opener = Opener::new(weak);

        let a = entry("a").key;
        assert_eq!(opener.next_after(&a, |_| true), Some(entry("b")));

        let foreign = ReviewKey::new("https://y/a.html", "a-hash");
        assert_eq!(opener.next_after(&foreign, |_| true), None);

        drop(listing);
        assert!(!opener.is_open());
        assert_eq!(opener.next_after(&a, |_| true), None);
    }
}
