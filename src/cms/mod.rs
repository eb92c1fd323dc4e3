mod client;

pub use client::CmsClient;

use serde_json::Value;

/// Read-side capability over the CMS content resources. Injected into the
/// loader so tests can run against an in-memory implementation.
#[allow(async_fn_in_trait)]
pub trait ContentFetcher {
    /// Fetches and parses one JSON resource. Any failure (network error,
    /// non-2xx status, malformed body) resolves to `None`; it is logged at
    /// this single-resource scope and never propagated.
    async fn fetch_json(&self, path: &str, bust_cache: bool) -> Option<Value>;

    /// Reads the `Last-Modified` header of a resource, for change polling.
    async fn last_modified(&self, path: &str) -> Option<String>;
}
