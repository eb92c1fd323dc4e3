use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::record::SectionData;
use crate::section::Section;

const LOCAL_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "0.0.0.0"];

/// In-memory cache of the last successfully loaded value per section.
///
/// Caching is a pure optimization: every load path must stay correct with the
/// store disabled, which is the default on local-development hosts. Writes are
/// tagged with a generation number so a slow, older load cannot overwrite the
/// result of a newer one.
#[derive(Debug)]
pub struct ContentStore {
    enabled: bool,
    generation: AtomicU64,
    entries: Mutex<HashMap<Section, Entry>>,
}

#[derive(Debug)]
struct Entry {
    value: SectionData,
    generation: u64,
}

impl ContentStore {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            generation: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Deployment-environment switch: active outside recognized local hosts,
    /// or when force-enabled by configuration.
    pub fn for_host(host: &str, force_enabled: bool) -> Self {
        let local = LOCAL_HOSTS.contains(&host);
        Self::new(force_enabled || !local)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Issues the generation tag for one load invocation.
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, section: Section) -> Option<SectionData> {
        if !self.enabled {
            return None;
        }
        self.entries
            .lock()
            .expect("content store lock poisoned")
            .get(&section)
            .map(|entry| entry.value.clone())
    }

    /// Stores a loaded value wholesale. Returns false when the write was
    /// skipped: store disabled, or a newer generation already landed.
    pub fn set(&self, section: Section, value: SectionData, generation: u64) -> bool {
        if !self.enabled {
            return false;
        }

        let mut entries = self.entries.lock().expect("content store lock poisoned");

        if let Some(existing) = entries.get(&section) {
            if existing.generation > generation {
                debug!(
                    section = section.key(),
                    generation, "discarding stale cache write"
                );
                return false;
            }
        }

        entries.insert(section, Entry { value, generation });
        true
    }

    /// All-or-nothing invalidation, used before a forced full reload.
    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("content store lock poisoned")
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn collection(titles: &[&str]) -> SectionData {
        SectionData::Collection(
            titles
                .iter()
                .map(|t| json!({ "title": t }).as_object().unwrap().clone())
                .collect(),
        )
    }

    #[test]
    fn test_round_trip_and_clear() {
        let store = ContentStore::new(true);
        let generation = store.next_generation();
        store.set(Section::Events, collection(&["X"]), generation);

        assert_eq!(store.get(Section::Events), Some(collection(&["X"])));

        store.clear();
        assert_eq!(store.get(Section::Events), None);
    }

    #[test]
    fn test_disabled_store_never_hits() {
        let store = ContentStore::new(false);
        let generation = store.next_generation();
        assert!(!store.set(Section::Events, collection(&["X"]), generation));
        assert_eq!(store.get(Section::Events), None);
    }

    #[test]
    fn test_stale_generation_write_discarded() {
        let store = ContentStore::new(true);
        let old_generation = store.next_generation();
        let new_generation = store.next_generation();

        store.set(Section::Events, collection(&["new"]), new_generation);
        assert!(!store.set(Section::Events, collection(&["old"]), old_generation));

        assert_eq!(store.get(Section::Events), Some(collection(&["new"])));
    }

    #[test]
    fn test_host_policy() {
        assert!(!ContentStore::for_host("localhost", false).enabled());
        assert!(ContentStore::for_host("localhost", true).enabled());
        assert!(ContentStore::for_host("sintraclassicos.pt", false).enabled());
    }
}
