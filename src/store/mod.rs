//! Reconciliation store: baseline manifest plus staged edits and deletions.
//!
//! Every operation here is synchronous and performs no I/O. Nothing reaches the
//! remote store until the publish coordinator commits a snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::errors::{AppError, AppResult};
use crate::models::{normalize_tag, Manifest, PhotoChanges, PhotoRecord, VersionTag};

/// Capacity of the change notification channel.
const EVENT_CAPACITY: usize = 64;

/// Store handle shared between the presentation layer and the publish coordinator.
///
/// The lock is only ever held for a single synchronous call.
pub type SharedStore = Arc<Mutex<ReconciliationStore>>;

/// Change notification for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded,
    Edited(String),
    Deleted(String),
    Reverted(String),
    Published,
}

/// Pending changes captured at the start of a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSnapshot {
    /// Effective list at capture time, the manifest to be written
    pub merged: Vec<PhotoRecord>,
    pub overlay: BTreeMap<String, PhotoRecord>,
    pub deletions: Vec<PhotoRecord>,
    pub version: Option<VersionTag>,
}

/// Baseline manifest overlaid with staged edits, minus staged deletions.
#[derive(Debug)]
pub struct ReconciliationStore {
    baseline: Vec<PhotoRecord>,
    version: Option<VersionTag>,
    overlay: BTreeMap<String, PhotoRecord>,
    pending_deletions: BTreeMap<String, PhotoRecord>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for ReconciliationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            baseline: Vec::new(),
            version: None,
            overlay: BTreeMap::new(),
            pending_deletions: BTreeMap::new(),
            events,
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Replace the baseline and discard every staged change.
    pub fn load(&mut self, manifest: Manifest) {
        let manifest = Manifest::new(manifest.photos, manifest.version);
        tracing::info!(
            "Loaded manifest with {} photos (version {:?})",
            manifest.photos.len(),
            manifest.version
        );

        self.baseline = manifest.photos;
        self.version = manifest.version;
        self.overlay.clear();
        self.pending_deletions.clear();
        self.notify(StoreEvent::Loaded);
    }

    pub fn version(&self) -> Option<&VersionTag> {
        self.version.as_ref()
    }

    /// Baseline records as last committed, without staged edits.
    pub fn baseline(&self) -> &[PhotoRecord] {
        &self.baseline
    }

    pub fn effective_record(&self, id: &str) -> Option<&PhotoRecord> {
        if self.pending_deletions.contains_key(id) {
            return None;
        }
        self.overlay
            .get(id)
            .or_else(|| self.baseline.iter().find(|photo| photo.id == id))
    }

    /// Baseline order with staged edits substituted in place.
    pub fn effective_list(&self) -> Vec<PhotoRecord> {
        self.baseline
            .iter()
            .filter(|photo| !self.pending_deletions.contains_key(&photo.id))
            .map(|photo| self.overlay.get(&photo.id).unwrap_or(photo).clone())
            .collect()
    }

    /// Merge `changes` into the effective record and stage the result.
    pub fn stage_edit(&mut self, id: &str, changes: &PhotoChanges) -> AppResult<&PhotoRecord> {
        let next = self
            .effective_record(id)
            .ok_or_else(|| not_found(id))?
            .apply(changes);

        tracing::debug!("Staged edit for {}", id);
        self.overlay.insert(id.to_string(), next);
        self.notify(StoreEvent::Edited(id.to_string()));

        self.overlay.get(id).ok_or_else(|| not_found(id))
    }

    /// Stage a tag addition. A tag that normalizes to nothing is ignored.
    pub fn stage_tag_add(&mut self, id: &str, raw_tag: &str) -> AppResult<&PhotoRecord> {
        let current = self.effective_record(id).ok_or_else(|| not_found(id))?;

        let Some(tag) = normalize_tag(raw_tag) else {
            return self.effective_record(id).ok_or_else(|| not_found(id));
        };
        if current.tags.contains(&tag) {
            return self.effective_record(id).ok_or_else(|| not_found(id));
        }

        let mut tags = current.tags.clone();
        tags.push(tag);
        self.stage_edit(id, &PhotoChanges::tags(tags))
    }

    /// Stage a tag removal. Removing a tag the record does not carry is a no-op.
    pub fn stage_tag_remove(&mut self, id: &str, tag: &str) -> AppResult<&PhotoRecord> {
        let current = self.effective_record(id).ok_or_else(|| not_found(id))?;

        let Some(tag) = normalize_tag(tag) else {
            return self.effective_record(id).ok_or_else(|| not_found(id));
        };
        if !current.tags.contains(&tag) {
            return self.effective_record(id).ok_or_else(|| not_found(id));
        }

        let tags = current.tags.iter().filter(|t| **t != tag).cloned().collect();
        self.stage_edit(id, &PhotoChanges::tags(tags))
    }

    /// Stage the effective record for deletion. Only a reload brings it back.
    pub fn stage_delete(&mut self, id: &str) -> AppResult<()> {
        let snapshot = self.effective_record(id).ok_or_else(|| not_found(id))?.clone();

        self.overlay.remove(id);
        self.baseline.retain(|photo| photo.id != id);
        self.pending_deletions.insert(id.to_string(), snapshot);

        tracing::debug!("Staged deletion of {}", id);
        self.notify(StoreEvent::Deleted(id.to_string()));
        Ok(())
    }

    /// Drop the staged edit for `id`. Returns whether anything was reverted.
    pub fn revert(&mut self, id: &str) -> bool {
        let reverted = self.overlay.remove(id).is_some();
        if reverted {
            tracing::debug!("Reverted staged edit for {}", id);
            self.notify(StoreEvent::Reverted(id.to_string()));
        }
        reverted
    }

    pub fn pending_change_count(&self) -> usize {
        self.overlay.len() + self.pending_deletions.len()
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.overlay.contains_key(id)
    }

    pub fn is_pending_delete(&self, id: &str) -> bool {
        self.pending_deletions.contains_key(id)
    }

    pub fn dirty_ids(&self) -> Vec<&str> {
        self.overlay.keys().map(String::as_str).collect()
    }

    pub fn overlay(&self) -> &BTreeMap<String, PhotoRecord> {
        &self.overlay
    }

    /// Snapshots of records staged for deletion, ordered by id.
    pub fn pending_deletions(&self) -> Vec<&PhotoRecord> {
        self.pending_deletions.values().collect()
    }

    /// Capture the pending change set, or `None` when there is nothing to publish.
    pub fn snapshot(&self) -> Option<PublishSnapshot> {
        if self.pending_change_count() == 0 {
            return None;
        }

        Some(PublishSnapshot {
            merged: self.effective_list(),
            overlay: self.overlay.clone(),
            deletions: self.pending_deletions.values().cloned().collect(),
            version: self.version.clone(),
        })
    }

    /// Commit a snapshot the remote store accepted under `version`.
    ///
    /// Changes staged after the snapshot was taken stay staged.
    pub fn commit(&mut self, snapshot: &PublishSnapshot, version: VersionTag) {
        for (id, published) in &snapshot.overlay {
            if self.overlay.get(id) == Some(published) {
                self.overlay.remove(id);
            }
        }
        for deleted in &snapshot.deletions {
            self.pending_deletions.remove(&deleted.id);
        }

        self.baseline = snapshot
            .merged
            .iter()
            .filter(|photo| !self.pending_deletions.contains_key(&photo.id))
            .cloned()
            .collect();
        self.version = Some(version);

        tracing::info!(
            "Committed publish: {} photos, {} changes still staged",
            self.baseline.len(),
            self.pending_change_count()
        );
        self.notify(StoreEvent::Published);
    }

    fn notify(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Photo {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn photo(id: &str, title: &str) -> PhotoRecord {
        PhotoRecord {
            id: id.to_string(),
            title: title.to_string(),
            src: format!("photos/uploads/{}.jpg", id),
            thumb: format!("photos/thumbs/{}.jpg", id),
            ..Default::default()
        }
    }

    fn store_with(ids: &[&str]) -> ReconciliationStore {
        let mut store = ReconciliationStore::new();
        store.load(Manifest::new(
            ids.iter().map(|id| photo(id, "Original")).collect(),
            Some(VersionTag::new("v1")),
        ));
        store
    }

    fn effective_ids(store: &ReconciliationStore) -> Vec<String> {
        store.effective_list().into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_load_replaces_everything() {
        let mut store = store_with(&["a", "b"]);
        store.stage_edit("a", &PhotoChanges::title("Edited")).unwrap();
        store.stage_delete("b").unwrap();

        store.load(Manifest::new(vec![photo("c", "Fresh")], Some(VersionTag::new("v9"))));

        assert_eq!(effective_ids(&store), vec!["c"]);
        assert_eq!(store.pending_change_count(), 0);
        assert_eq!(store.version(), Some(&VersionTag::new("v9")));
    }

    #[test]
    fn test_effective_record_prefers_overlay() {
        let mut store = store_with(&["a"]);
        assert_eq!(store.effective_record("a").unwrap().title, "Original");

        store.stage_edit("a", &PhotoChanges::title("Edited")).unwrap();

        assert_eq!(store.effective_record("a").unwrap().title, "Edited");
        assert_eq!(store.baseline()[0].title, "Original");
        assert!(store.effective_record("missing").is_none());
    }

    #[test]
    fn test_effective_list_keeps_baseline_order() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        store.stage_edit("c", &PhotoChanges::title("C2")).unwrap();
        store.stage_delete("b").unwrap();
        store.stage_edit("a", &PhotoChanges::title("A2")).unwrap();

        let list = store.effective_list();
        let ids: Vec<_> = list.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
        assert_eq!(list[0].title, "A2");
        assert_eq!(list[1].title, "C2");
        assert_eq!(store.effective_list(), list);
    }

    #[test]
    fn test_stage_edit_unknown_id() {
        let mut store = store_with(&["a"]);
        let err = store
            .stage_edit("nope", &PhotoChanges::title("x"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_stage_edit_builds_on_previous_edit() {
        let mut store = store_with(&["a"]);
        store.stage_edit("a", &PhotoChanges::title("New")).unwrap();
        store
            .stage_edit(
                "a",
                &PhotoChanges {
                    category: Some(Category::Street),
                    ..Default::default()
                },
            )
            .unwrap();

        let record = store.effective_record("a").unwrap();
        assert_eq!(record.title, "New");
        assert_eq!(record.category, Category::Street);
        assert_eq!(store.pending_change_count(), 1);
    }

    #[test]
    fn test_revert_restores_baseline_record() {
        let mut store = store_with(&["a"]);
        let before = store.effective_record("a").unwrap().clone();

        store.stage_edit("a", &PhotoChanges::title("New")).unwrap();
        assert!(store.revert("a"));
        assert_eq!(store.effective_record("a"), Some(&before));

        assert!(!store.revert("a"));
        assert_eq!(store.effective_record("a"), Some(&before));
        assert_eq!(store.pending_change_count(), 0);
    }

    #[test]
    fn test_revert_leaves_deletions_alone() {
        let mut store = store_with(&["a"]);
        store.stage_delete("a").unwrap();
        assert!(!store.revert("a"));
        assert!(store.is_pending_delete("a"));
        assert!(store.effective_record("a").is_none());
    }

    #[test]
    fn test_double_delete_fails() {
        let mut store = store_with(&["a"]);
        store.stage_delete("a").unwrap();
        assert!(store.stage_delete("a").unwrap_err().is_not_found());
        assert_eq!(store.pending_change_count(), 1);
    }

    #[test]
    fn test_delete_snapshots_effective_record() {
        let mut store = store_with(&["a"]);
        store.stage_edit("a", &PhotoChanges::title("Edited")).unwrap();
        store.stage_delete("a").unwrap();

        assert!(!store.is_dirty("a"));
        let pending = store.pending_deletions();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "Edited");
        assert_eq!(store.pending_change_count(), 1);
        assert!(store.stage_edit("a", &PhotoChanges::title("x")).is_err());
    }

    #[test]
    fn test_tag_add_normalizes_and_dedupes() {
        let mut store = store_with(&["a"]);
        store.stage_tag_add("a", "  Long Exposure ").unwrap();
        store.stage_tag_add("a", "long exposure").unwrap();

        let tags = &store.effective_record("a").unwrap().tags;
        assert_eq!(tags, &vec!["long-exposure".to_string()]);
    }

    #[test]
    fn test_tag_add_empty_is_noop() {
        let mut store = store_with(&["a"]);
        store.stage_tag_add("a", "   ").unwrap();
        assert!(!store.is_dirty("a"));
        assert!(store.stage_tag_add("missing", "   ").is_err());
    }

    #[test]
    fn test_tag_remove() {
        let mut store = store_with(&["a"]);
        store.stage_tag_add("a", "night").unwrap();
        store.stage_tag_add("a", "city").unwrap();
        store.stage_tag_remove("a", "Night").unwrap();

        assert_eq!(store.effective_record("a").unwrap().tags, vec!["city".to_string()]);
        assert!(store.stage_tag_remove("missing", "city").is_err());
    }

    #[test]
    fn test_effective_ids_match_set_algebra() {
        // Deterministic pseudo-random op sequence over a small id space
        let ids = ["a", "b", "c", "d", "e", "f"];
        let mut store = store_with(&ids);
        let mut deleted: Vec<&str> = Vec::new();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

        for step in 0..200 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let id = ids[(seed % ids.len() as u64) as usize];

            match (seed >> 8) % 3 {
                0 => {
                    let result = store.stage_edit(id, &PhotoChanges::title(format!("t{}", step)));
                    assert_eq!(result.is_ok(), !deleted.contains(&id));
                }
                1 => {
                    let result = store.stage_delete(id);
                    assert_eq!(result.is_ok(), !deleted.contains(&id));
                    if result.is_ok() {
                        deleted.push(id);
                    }
                }
                _ => {
                    store.revert(id);
                }
            }

            let expected: Vec<String> = ids
                .iter()
                .filter(|id| !deleted.contains(id))
                .map(|id| id.to_string())
                .collect();
            assert_eq!(effective_ids(&store), expected);
            assert_eq!(
                store.pending_change_count(),
                store.dirty_ids().len() + deleted.len()
            );
        }
    }

    #[test]
    fn test_snapshot_and_commit() {
        let mut store = store_with(&["a", "b"]);
        assert!(store.snapshot().is_none());

        store.stage_edit("a", &PhotoChanges::title("New")).unwrap();
        store.stage_delete("b").unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.version, Some(VersionTag::new("v1")));

        store.commit(&snapshot, VersionTag::new("v2"));

        assert_eq!(store.pending_change_count(), 0);
        assert_eq!(store.effective_list(), snapshot.merged);
        assert_eq!(store.baseline()[0].title, "New");
        assert_eq!(store.version(), Some(&VersionTag::new("v2")));
    }

    #[test]
    fn test_commit_keeps_changes_staged_after_snapshot() {
        let mut store = store_with(&["a", "b", "c"]);
        store.stage_edit("a", &PhotoChanges::title("First")).unwrap();
        let snapshot = store.snapshot().unwrap();

        store.stage_edit("a", &PhotoChanges::title("Second")).unwrap();
        store.stage_edit("b", &PhotoChanges::title("B")).unwrap();
        store.stage_delete("c").unwrap();

        store.commit(&snapshot, VersionTag::new("v2"));

        assert_eq!(store.baseline()[0].title, "First");
        assert_eq!(store.effective_record("a").unwrap().title, "Second");
        assert!(store.is_dirty("a"));
        assert!(store.is_dirty("b"));
        assert!(store.is_pending_delete("c"));
        assert_eq!(effective_ids(&store), vec!["a", "b"]);
        assert_eq!(store.pending_change_count(), 3);
    }

    #[test]
    fn test_events_are_broadcast() {
        let mut store = store_with(&["a"]);
        let mut events = store.subscribe();

        store.stage_edit("a", &PhotoChanges::title("x")).unwrap();
        store.revert("a");
        store.stage_delete("a").unwrap();

        assert_eq!(events.try_recv().unwrap(), StoreEvent::Edited("a".to_string()));
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Reverted("a".to_string()));
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Deleted("a".to_string()));
        assert!(events.try_recv().is_err());
    }
}
