use reqwest::{
    header::{HeaderValue, CACHE_CONTROL},
    ClientBuilder, Response,
};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, instrument, warn, Level};

use super::ContentFetcher;
use crate::error::{Error, Result};

/// HTTP client over the CMS content resources.
#[derive(Debug)]
pub struct CmsClient {
    client: reqwest::Client,
    base_url: String,
}

impl CmsClient {
    #[instrument(skip_all, name = "cms_client::new", err(Debug, level = Level::DEBUG))]
    pub fn new(base_url: &str) -> Result<Self> {
        let client = ClientBuilder::new().build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            let error = Error::ProtocolSchemeMissing(base_url);
            error!(%error);
            return Err(error);
        }

        debug!(%base_url, "creating cms client");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host part of the base URL, used for the cache deployment switch.
    pub fn host(&self) -> &str {
        let without_scheme = self
            .base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        without_scheme
            .split('/')
            .next()
            .unwrap_or(without_scheme)
            .split(':')
            .next()
            .unwrap_or(without_scheme)
    }

    #[instrument(skip(self), fields(base_url = self.base_url, path = path))]
    fn request(&self, method: reqwest::Method, path: &str, bust_cache: bool) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));

        // Cache-busting contract: timestamp query parameter plus a
        // cache-disabling directive on the request.
        if bust_cache {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            req = req
                .query(&[("t", stamp.to_string())])
                .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }

        debug!("created request");
        req
    }

    #[instrument(skip_all, err(Debug, level = Level::DEBUG))]
    async fn get(&self, path: &str, bust_cache: bool) -> Result<Response> {
        self.request(reqwest::Method::GET, path, bust_cache)
            .send()
            .await?
            .error_for_status()
            .map_err(Error::from)
    }
}

impl ContentFetcher for CmsClient {
    #[instrument(skip(self), ret(level = Level::TRACE))]
    async fn fetch_json(&self, path: &str, bust_cache: bool) -> Option<Value> {
        let response = match self.get(path, bust_cache).await {
            Ok(response) => response,
            Err(error) => {
                warn!(path, %error, "resource fetch failed, treating as absent");
                return None;
            }
        };

        match response.json::<Value>().await {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(path, %error, "resource body is not valid JSON, treating as absent");
                None
            }
        }
    }

    #[instrument(skip(self), ret(level = Level::TRACE))]
    async fn last_modified(&self, path: &str) -> Option<String> {
        let response = self
            .request(reqwest::Method::HEAD, path, true)
            .send()
            .await
            .and_then(Response::error_for_status);

        match response {
            Ok(response) => response
                .headers()
                .get(reqwest::header::LAST_MODIFIED)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            Err(error) => {
                warn!(path, %error, "last-modified probe failed");
                None
            }
        }
    }
}
