// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;

use crate::ListRow;

// Read-through cache for one entity's list screens, keyed by the
// canonical filter signature, plus detail records under their own uid
// key so list and detail views never show each other stale data.
//
// Writes follow a write-through approximation: mutations patch the
// cached snapshot synchronously, then mark the key dirty so a background
// refetch reconciles whatever the patch could not know about (counts
// moved by concurrent writers, rows entering or leaving the filter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedList<T> {
    pub rows: Vec<T>,
    pub total_all: u64,
    pub total_filtered: u64,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCache<T> {
    lists: HashMap<String, CachedList<T>>,
    details: HashMap<String, T>,
}

impl<T: ListRow + Clone> QueryCache<T> {
    pub fn new() -> Self {
        Self {
            lists: HashMap::new(),
            details: HashMap::new(),
        }
    }

    pub fn store_list(
        &mut self,
        signature: &str,
        rows: Vec<T>,
        total_all: u64,
        total_filtered: u64,
    ) {
        self.lists.insert(
            signature.to_owned(),
            CachedList {
                rows,
                total_all,
                total_filtered,
                dirty: false,
            },
        );
    }

    pub fn list(&self, signature: &str) -> Option<&CachedList<T>> {
        self.lists.get(signature)
    }

    pub fn invalidate(&mut self, signature: &str) {
        if let Some(entry) = self.lists.get_mut(signature) {
            entry.dirty = true;
        }
    }

    pub fn invalidate_all(&mut self) {
        for entry in self.lists.values_mut() {
            entry.dirty = true;
        }
    }

    pub fn is_dirty(&self, signature: &str) -> bool {
        self.lists
            .get(signature)
            .is_some_and(|entry| entry.dirty)
    }

    // Synchronous optimistic patch for a delete: drop the rows and
    // decrement both counters, saturating at zero.
    pub fn remove_rows(&mut self, signature: &str, uids: &[String]) -> usize {
        let Some(entry) = self.lists.get_mut(signature) else {
            return 0;
        };
        let before = entry.rows.len();
        entry
            .rows
            .retain(|row| !uids.iter().any(|uid| uid == row.row_uid()));
        let removed = before - entry.rows.len();
        entry.total_all = entry.total_all.saturating_sub(removed as u64);
        entry.total_filtered = entry.total_filtered.saturating_sub(removed as u64);
        for uid in uids {
            self.details.remove(uid);
        }
        removed
    }

    // Synchronous optimistic patch for an update: merge the new fields
    // into the cached snapshot and refresh the detail record.
    pub fn merge_row(&mut self, signature: &str, updated: &T) -> bool {
        let mut merged = false;
        if let Some(entry) = self.lists.get_mut(signature) {
            for row in &mut entry.rows {
                if row.row_uid() == updated.row_uid() {
                    *row = updated.clone();
                    merged = true;
                    break;
                }
            }
        }
        self.put_detail(updated.clone());
        merged
    }

    pub fn put_detail(&mut self, record: T) {
        self.details
            .insert(record.row_uid().to_owned(), record);
    }

    pub fn detail(&self, uid: &str) -> Option<&T> {
        self.details.get(uid)
    }

    pub fn clear(&mut self) {
        self.lists.clear();
        self.details.clear();
    }
}

impl<T: ListRow + Clone> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryCache;
    use crate::ListRow;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        uid: String,
        label: String,
    }

    impl Row {
        fn new(uid: &str, label: &str) -> Self {
            Self {
                uid: uid.to_owned(),
                label: label.to_owned(),
            }
        }
    }

    impl ListRow for Row {
        fn row_uid(&self) -> &str {
            &self.uid
        }
    }

    fn seeded() -> QueryCache<Row> {
        let mut cache = QueryCache::new();
        cache.store_list(
            "order=desc",
            vec![Row::new("a", "1"), Row::new("b", "2"), Row::new("c", "3")],
            50,
            20,
        );
        cache
    }

    #[test]
    fn stored_list_is_clean_until_invalidated() {
        let mut cache = seeded();
        assert!(!cache.is_dirty("order=desc"));
        cache.invalidate("order=desc");
        assert!(cache.is_dirty("order=desc"));
    }

    #[test]
    fn optimistic_removal_patches_rows_and_counts() {
        let mut cache = seeded();
        cache.put_detail(Row::new("b", "2"));

        let removed = cache.remove_rows("order=desc", &["b".to_owned(), "c".to_owned()]);
        assert_eq!(removed, 2);

        let entry = cache.list("order=desc").expect("entry");
        assert_eq!(entry.total_all, 48);
        assert_eq!(entry.total_filtered, 18);
        assert_eq!(entry.rows.len(), 1);
        // The detail record goes with the row.
        assert!(cache.detail("b").is_none());
    }

    #[test]
    fn merge_updates_list_row_and_detail_together() {
        let mut cache = seeded();
        let merged = cache.merge_row("order=desc", &Row::new("a", "renamed"));
        assert!(merged);
        assert_eq!(
            cache.list("order=desc").expect("entry").rows[0].label,
            "renamed"
        );
        assert_eq!(cache.detail("a").expect("detail").label, "renamed");
    }

    #[test]
    fn merge_for_uncached_signature_still_caches_the_detail() {
        let mut cache: QueryCache<Row> = QueryCache::new();
        assert!(!cache.merge_row("missing", &Row::new("x", "detail-only")));
        assert!(cache.detail("x").is_some());
    }

    #[test]
    fn removal_on_missing_signature_is_a_no_op() {
        let mut cache: QueryCache<Row> = QueryCache::new();
        assert_eq!(cache.remove_rows("missing", &["a".to_owned()]), 0);
    }

    #[test]
    fn invalidate_all_marks_every_signature() {
        let mut cache = seeded();
        cache.store_list("order=asc", vec![Row::new("z", "9")], 5, 5);
        cache.invalidate_all();
        assert!(cache.is_dirty("order=desc"));
        assert!(cache.is_dirty("order=asc"));
    }
}
