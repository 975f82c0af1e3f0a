use reqwest::RequestBuilder;
use serde_json::Value;
use thiserror::Error;

use crate::data_structs::app_config::CatalogConfig;
use crate::data_structs::content_item::{ContentItem, RawChannel};

pub const IPTV_PATH: &str = "/api/catalog/iptv";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog answered with status {0}")]
    Status(u16),
    #[error("catalog response is not json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result of one channel fetch, surfaced to the page instead of a log line.
#[derive(Debug)]
pub enum FetchOutcome {
    Loaded(Vec<ContentItem>),
    Empty,
    Failed(CatalogError),
}

impl FetchOutcome {
    /// The items to display; empty unless the fetch loaded something.
    pub fn items(&self) -> &[ContentItem] {
        match self {
            FetchOutcome::Loaded(items) => items,
            FetchOutcome::Empty | FetchOutcome::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&CatalogError> {
        match self {
            FetchOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl CatalogClient {

    pub fn new(base_url: &str) -> Self {
        CatalogClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Client for the `catalog` section of `config.yml`.
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(&config.base_url).with_page_size(config.page_size)
    }

    /// A zero page size falls back to the default.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn channels_request(&self, page: u32, page_size: u32) -> RequestBuilder {
        self.http.get(format!("{}{}", self.base_url, IPTV_PATH))
            .query(&[("page", page), ("pageSize", page_size)])
    }

    /// Fetches one page of channels. Never fails outright: errors come back
    /// as [`FetchOutcome::Failed`] after being logged.
    pub async fn fetch_channels(&self, page: u32, page_size: u32) -> FetchOutcome {
        match self.try_fetch_channels(page, page_size).await {
            Ok(items) if items.is_empty() => FetchOutcome::Empty,
            Ok(items) => FetchOutcome::Loaded(items),
            Err(err) => {
                log::error!("{err}");
                FetchOutcome::Failed(err)
            }
        }
    }

    async fn try_fetch_channels(&self, page: u32, page_size: u32) -> Result<Vec<ContentItem>, CatalogError> {
        let response = self.channels_request(page, page_size).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let document: Value = serde_json::from_slice(&body)?;
        return Ok(map_channels(&document));
    }
}

/// Maps the `channels` array of a catalog response. A missing or non-array
/// `channels` yields nothing; unreadable entries are skipped.
pub fn map_channels(document: &Value) -> Vec<ContentItem> {
    let Some(channels) = document.get("channels").and_then(Value::as_array) else {
        return Vec::new();
    };

    channels.iter()
        .filter_map(|raw| match serde_json::from_value::<RawChannel>(raw.clone()) {
            Ok(channel) => Some(channel.into_content_item()),
            Err(err) => {
                log::warn!("skipping catalog channel: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_paged_url() {
        let client = CatalogClient::new("http://catalog.local/");
        let request = client.channels_request(1, 100).build().unwrap();
        assert_eq!(request.url().as_str(), "http://catalog.local/api/catalog/iptv?page=1&pageSize=100");
    }

    #[test]
    fn configured_page_size_is_used() {
        let config = CatalogConfig { base_url: "https://catalog.example.com/".to_string(), page_size: 25 };
        let client = CatalogClient::from_config(&config);
        assert_eq!(client.base_url(), "https://catalog.example.com");
        assert_eq!(client.page_size(), 25);
        assert_eq!(CatalogClient::new("http://catalog.local").page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(client.with_page_size(0).page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn channels_must_be_an_array() {
        assert!(map_channels(&json!({})).is_empty());
        assert!(map_channels(&json!({ "channels": "nope" })).is_empty());
        assert!(map_channels(&json!({ "channels": [] })).is_empty());
    }

    #[test]
    fn unreadable_entries_are_skipped() {
        let items = map_channels(&json!({ "channels": [
            { "id": "a", "name": "World News 24" },
            { "name": "no id" },
            { "id": "b", "name": "Sports Center HD", "category": "Sports" }
        ]}));
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn loosely_typed_entries_are_kept() {
        let items = map_channels(&json!({ "channels": [
            { "id": "a", "name": "Fashion TV+", "price": 9.99 },
            { "id": "b", "name": null },
            { "id": "c", "name": "Documentary One", "rating": "4.5" },
            { "id": "d", "name": "World News 24" }
        ]}));
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(items[0].price, 10);
        assert_eq!(items[1].title, "");
        assert_eq!(items[2].rating, 4.5);
    }

    #[test]
    fn failed_outcome_shows_nothing() {
        let outcome = FetchOutcome::Failed(CatalogError::Status(502));
        assert!(outcome.items().is_empty());
        assert!(outcome.error().is_some());
        assert!(FetchOutcome::Empty.items().is_empty());
    }
}
