use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, instrument, warn, Level};

use crate::cms::ContentFetcher;
use crate::record::{self, Record, SectionData};
use crate::section::{Section, SectionKind};
use crate::store::ContentStore;

/// Loads one section's content: resolves its source list, fetches every
/// resource concurrently, applies section-specific post-processing and feeds
/// the content store.
pub struct SectionLoader<'a, F: ContentFetcher> {
    fetcher: &'a F,
    store: &'a ContentStore,
}

impl<'a, F: ContentFetcher> SectionLoader<'a, F> {
    pub fn new(fetcher: &'a F, store: &'a ContentStore) -> Self {
        Self { fetcher, store }
    }

    /// A load never fails: a section with zero loadable resources yields an
    /// empty collection or null singleton and rendering becomes a no-op.
    #[instrument(skip(self), fields(section = section.key()), ret(level = Level::TRACE))]
    pub async fn load(&self, section: Section, force: bool) -> SectionData {
        if !force {
            if let Some(cached) = self.store.get(section) {
                debug!("cache hit");
                return cached;
            }
        }

        let generation = self.store.next_generation();

        let data = match section.kind() {
            SectionKind::Singleton => self.load_singleton(section, force).await,
            SectionKind::Collection => self.load_collection(section, force).await,
        };

        // Stale-preferred-over-empty: an empty result never overwrites a
        // previously cached non-empty value.
        if !data.is_empty() {
            self.store.set(section, data.clone(), generation);
        }

        data
    }

    async fn load_singleton(&self, section: Section, force: bool) -> SectionData {
        let record = match section.singleton_path() {
            Some(path) => self.fetcher.fetch_json(&path, force).await.and_then(into_record),
            None => None,
        };

        SectionData::Singleton(record)
    }

    async fn load_collection(&self, section: Section, force: bool) -> SectionData {
        // The agenda aggregate takes precedence over the manifest mechanism
        // when present and well-formed.
        if let Some(records) = self.load_aggregate(section, force).await {
            return SectionData::Collection(self.post_process(section, records));
        }

        let sources = self.resolve_sources(section, force).await;

        let fetches = sources.iter().map(|path| self.fetcher.fetch_json(path, force));
        let records: Vec<Record> = join_all(fetches)
            .await
            .into_iter()
            .flatten()
            .filter_map(into_record)
            .collect();

        SectionData::Collection(self.post_process(section, records))
    }

    async fn load_aggregate(&self, section: Section, force: bool) -> Option<Vec<Record>> {
        let path = section.aggregate_path()?;
        let value = self.fetcher.fetch_json(path, force).await?;

        match value.get("sections") {
            Some(Value::Array(entries)) => Some(
                entries
                    .iter()
                    .cloned()
                    .filter_map(into_record)
                    .collect(),
            ),
            _ => {
                warn!(path, "aggregate resource has no sections list, ignoring");
                None
            }
        }
    }

    /// The manifest, when present and a list, is authoritative and fully
    /// replaces the fallback list. No merge.
    async fn resolve_sources(&self, section: Section, force: bool) -> Vec<String> {
        let manifest = self.fetcher.fetch_json(&section.manifest_path(), force).await;

        match manifest {
            Some(Value::Array(files)) => files
                .iter()
                .filter_map(Value::as_str)
                .map(|file| format!("content/{}/{file}", section.key()))
                .collect(),
            Some(_) => {
                warn!(
                    section = section.key(),
                    "manifest is not a list, using fallback sources"
                );
                section.fallback_sources()
            }
            None => {
                debug!(section = section.key(), "no manifest, using fallback sources");
                section.fallback_sources()
            }
        }
    }

    fn post_process(&self, section: Section, mut records: Vec<Record>) -> Vec<Record> {
        records.retain(|r| record::is_visible(r, section));

        match section {
            Section::Agenda => {
                let default = section.default_order();
                records.sort_by_key(|r| record::order_of(r, default));
            }
            Section::Gallery => {
                for item in &mut records {
                    record::normalize_gallery_item(item);
                }
                records.sort_by(record::gallery_cmp);
            }
            _ => {}
        }

        records
    }
}

fn into_record(value: Value) -> Option<Record> {
    match value {
        Value::Object(record) => Some(record),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory stand-in for the CMS, counting fetches so cache behavior is
    /// observable.
    #[derive(Default)]
    struct FakeCms {
        files: Mutex<HashMap<String, Value>>,
        fetches: AtomicUsize,
    }

    impl FakeCms {
        fn put(&self, path: &str, value: Value) {
            self.files.lock().unwrap().insert(path.to_string(), value);
        }

        fn remove(&self, path: &str) {
            self.files.lock().unwrap().remove(path);
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::Relaxed)
        }
    }

    impl ContentFetcher for FakeCms {
        async fn fetch_json(&self, path: &str, _bust_cache: bool) -> Option<Value> {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            self.files.lock().unwrap().get(path).cloned()
        }

        async fn last_modified(&self, _path: &str) -> Option<String> {
            None
        }
    }

    fn titles(data: &SectionData) -> Vec<String> {
        match data {
            SectionData::Collection(records) => records
                .iter()
                .filter_map(|r| record::str_field(r, "title"))
                .map(str::to_string)
                .collect(),
            SectionData::Singleton(_) => panic!("expected a collection"),
        }
    }

    #[tokio::test]
    async fn test_manifest_replaces_fallback_list() {
        let cms = FakeCms::default();
        cms.put("content/eventos/.index.json", json!(["unico.json"]));
        cms.put("content/eventos/unico.json", json!({ "title": "Y" }));
        // A fallback-listed file that must not be fetched.
        cms.put("content/eventos/evento-1.json", json!({ "title": "fallback" }));

        let store = ContentStore::new(false);
        let loader = SectionLoader::new(&cms, &store);

        let data = loader.load(Section::Events, false).await;
        assert_eq!(titles(&data), vec!["Y"]);
    }

    #[tokio::test]
    async fn test_fallback_when_manifest_absent() {
        let cms = FakeCms::default();
        cms.put("content/eventos/evento-2.json", json!({ "title": "B" }));

        let store = ContentStore::new(false);
        let loader = SectionLoader::new(&cms, &store);

        let data = loader.load(Section::Events, false).await;
        assert_eq!(titles(&data), vec!["B"]);
    }

    #[tokio::test]
    async fn test_unpublished_records_dropped() {
        let cms = FakeCms::default();
        cms.put("content/eventos/.index.json", json!(["x.json", "y.json"]));
        cms.put("content/eventos/x.json", json!({ "title": "X", "published": false }));
        cms.put("content/eventos/y.json", json!({ "title": "Y" }));

        let store = ContentStore::new(false);
        let loader = SectionLoader::new(&cms, &store);

        let data = loader.load(Section::Events, false).await;
        assert_eq!(titles(&data), vec!["Y"]);
    }

    #[tokio::test]
    async fn test_cache_round_trip_and_forced_bypass() {
        let cms = FakeCms::default();
        cms.put("content/hero/hero.json", json!({ "subtitle": "olá" }));

        let store = ContentStore::new(true);
        let loader = SectionLoader::new(&cms, &store);

        let first = loader.load(Section::Hero, false).await;
        let after_first = cms.fetch_count();

        let second = loader.load(Section::Hero, false).await;
        assert_eq!(first, second);
        assert_eq!(cms.fetch_count(), after_first, "cached load must not fetch");

        loader.load(Section::Hero, true).await;
        assert!(cms.fetch_count() > after_first, "forced load must fetch");
    }

    #[tokio::test]
    async fn test_stale_preferred_over_empty() {
        let cms = FakeCms::default();
        cms.put("content/eventos/.index.json", json!(["a.json"]));
        cms.put("content/eventos/a.json", json!({ "title": "A" }));

        let store = ContentStore::new(true);
        let loader = SectionLoader::new(&cms, &store);

        loader.load(Section::Events, false).await;

        // Transient outage: the next forced load finds nothing.
        cms.remove("content/eventos/a.json");
        let forced = loader.load(Section::Events, true).await;
        assert!(forced.is_empty());

        // The cache kept the older non-empty value.
        let cached = loader.load(Section::Events, false).await;
        assert_eq!(titles(&cached), vec!["A"]);
    }

    #[tokio::test]
    async fn test_agenda_aggregate_takes_precedence() {
        let cms = FakeCms::default();
        cms.put(
            "content/agenda/agenda.json",
            json!({ "sections": [
                { "title": "Março", "order": 2 },
                { "title": "Fevereiro", "order": 1 },
                { "title": "Oculto", "order": 0, "published": false },
            ]}),
        );
        cms.put("content/agenda/.index.json", json!(["ignorado.json"]));

        let store = ContentStore::new(false);
        let loader = SectionLoader::new(&cms, &store);

        let data = loader.load(Section::Agenda, false).await;
        assert_eq!(titles(&data), vec!["Fevereiro", "Março"]);
    }

    #[tokio::test]
    async fn test_gallery_normalized_and_sorted() {
        let cms = FakeCms::default();
        cms.put("content/galeria/.index.json", json!(["a.json", "b.json", "c.json"]));
        cms.put("content/galeria/a.json", json!({ "title": "Évora – Março", "date": "2024-03-01", "order": 2, "image": "a.jpg" }));
        cms.put("content/galeria/b.json", json!({ "title": "B", "date": "2024-03-01", "order": 1, "fotos": [{ "foto": "b1.jpg" }, "b2.jpg"] }));
        cms.put("content/galeria/c.json", json!({ "title": "C", "date": "2024-01-01", "order": 5 }));

        let store = ContentStore::new(false);
        let loader = SectionLoader::new(&cms, &store);

        let data = loader.load(Section::Gallery, false).await;
        let records = match &data {
            SectionData::Collection(records) => records,
            SectionData::Singleton(_) => panic!("expected a collection"),
        };

        let orders: Vec<i64> = records.iter().map(|r| record::order_of(r, 999)).collect();
        assert_eq!(orders, vec![1, 2, 5]);

        assert_eq!(record::str_field(&records[1], "id"), Some("evora-marco"));
        assert_eq!(record::normalized_photos(&records[0]), vec!["b1.jpg", "b2.jpg"]);
        assert_eq!(record::normalized_photos(&records[1]), vec!["a.jpg"]);
    }

    #[tokio::test]
    async fn test_events_load_and_render_end_to_end() {
        let cms = FakeCms::default();
        cms.put("content/eventos/.index.json", json!(["x.json", "y.json"]));
        cms.put("content/eventos/x.json", json!({ "title": "X", "published": false }));
        cms.put("content/eventos/y.json", json!({ "title": "Y" }));

        let store = ContentStore::new(false);
        let loader = SectionLoader::new(&cms, &store);

        let data = loader.load(Section::Events, false).await;
        let html = crate::render::render_fragment(Section::Events, &data).unwrap();

        assert_eq!(html.matches("event-card").count(), 1, "exactly one card");
        assert!(html.contains(">Y</h3>"));
        assert!(!html.contains(">X</h3>"));
        assert!(html.contains("MESFEVEREIROW123.jpeg"));
        assert!(html.contains("Gratuito"));
    }

    #[tokio::test]
    async fn test_failed_resources_tolerated() {
        let cms = FakeCms::default();
        cms.put("content/loja/.index.json", json!(["ok.json", "missing.json"]));
        cms.put("content/loja/ok.json", json!({ "title": "Boné" }));

        let store = ContentStore::new(false);
        let loader = SectionLoader::new(&cms, &store);

        let data = loader.load(Section::Shop, false).await;
        assert_eq!(titles(&data), vec!["Boné"]);
    }
}
