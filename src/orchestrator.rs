use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::cms::ContentFetcher;
use crate::forms::MessageTemplates;
use crate::loader::SectionLoader;
use crate::record::SectionData;
use crate::render::SectionRenderer;
use crate::section::Section;
use crate::store::ContentStore;

/// Resource polled for changes; the CMS touches it on every save.
const POLL_SENTINEL: &str = "content/config/config.json";

/// Delay before reloading after a CMS save hook fires, so the CMS finishes
/// writing its files first.
const SAVE_HOOK_DELAY: Duration = Duration::from_millis(500);

/// Drives the full load/render cycle: all section loads run concurrently,
/// rendering happens per section with failures isolated, and external change
/// signals re-invoke the cycle with cache bypass.
pub struct Orchestrator<'a, F: ContentFetcher> {
    fetcher: &'a F,
    store: &'a ContentStore,
    renderer: SectionRenderer,
    templates: MessageTemplates,
    rendered_hashes: HashMap<Section, String>,
    last_modified: Option<String>,
}

impl<'a, F: ContentFetcher> Orchestrator<'a, F> {
    pub fn new(fetcher: &'a F, store: &'a ContentStore, renderer: SectionRenderer) -> Self {
        Self {
            fetcher,
            store,
            renderer,
            templates: MessageTemplates::default(),
            rendered_hashes: HashMap::new(),
            last_modified: None,
        }
    }

    pub fn templates(&self) -> &MessageTemplates {
        &self.templates
    }

    /// Loads every section in parallel, then renders them in sequence. A
    /// section that fails to load renders nothing; the others continue.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self, force: bool) {
        let loader = SectionLoader::new(self.fetcher, self.store);

        let loads = Section::ALL.iter().map(|s| loader.load(*s, force));
        let results: Vec<SectionData> = join_all(loads).await;

        for (section, data) in Section::ALL.into_iter().zip(results) {
            // The config section feeds the message templates, a one-way push
            // into the dialog layer. It has no fragment of its own.
            if section == Section::SiteConfig {
                if let SectionData::Singleton(Some(config)) = &data {
                    self.templates.apply_config(config);
                    debug!("applied site-config message templates");
                }
                continue;
            }

            let digest = hash_data(&data);
            if self.rendered_hashes.get(&section) == Some(&digest) {
                info!(section = section.key(), "no changes to section, skipping.");
                continue;
            }

            self.renderer.render(section, &data);
            self.rendered_hashes.insert(section, digest);
        }
    }

    /// Forced full reload: clears the store, then re-initializes with cache
    /// bypass.
    pub async fn reload(&mut self) {
        info!("forced reload requested");
        self.store.clear();
        self.initialize(true).await;
    }

    /// Post-save hook exposed to the CMS host environment.
    pub async fn after_save(&mut self) {
        tokio::time::sleep(SAVE_HOOK_DELAY).await;
        self.reload().await;
    }

    /// One polling step: compares the sentinel's last-modified timestamp with
    /// the last observed value and reloads on change. Returns whether a
    /// reload happened.
    #[instrument(skip(self))]
    pub async fn poll_once(&mut self) -> bool {
        let current = self.fetcher.last_modified(POLL_SENTINEL).await;

        let Some(current) = current else {
            warn!("last-modified probe yielded nothing, keeping current content");
            return false;
        };

        match &self.last_modified {
            Some(seen) if *seen == current => false,
            Some(_) => {
                info!(last_modified = current, "content changed, reloading");
                self.last_modified = Some(current);
                self.reload().await;
                true
            }
            None => {
                // First observation only records the baseline.
                self.last_modified = Some(current);
                false
            }
        }
    }

    /// Polling loop at a fixed interval. Restricted to an administrative
    /// context by the caller.
    pub async fn watch(&mut self, interval: Duration) {
        loop {
            tokio::time::sleep(interval).await;
            self.poll_once().await;
        }
    }
}

fn hash_data(data: &SectionData) -> String {
    let serialized = serde_json::to_string(data).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(serialized);
    let hash = hasher.finalize();
    hex::encode(&hash[0..4])
}
