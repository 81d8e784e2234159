#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::RagError;
use crate::config::VisitJejuConfig;
use crate::corpus::Listing;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Keywords marking a listing as a hands-on workshop.
pub const WORKSHOP_KEYWORDS: &[&str] = &[
    "체험",
    "공방",
    "공예",
    "도예",
    "도자기",
    "목공",
    "염색",
    "핸드메이드",
    "전통공예",
    "가죽공예",
    "캔들",
];

/// Blocking client for the VisitJeju SearchList API.
///
/// The API key travels as a query parameter. It is read from
/// `VISITJEJU_API_KEY` at construction but only required once the first fetch
/// is made.
#[derive(Debug, Clone)]
pub struct VisitJejuClient {
    endpoint: Url,
    locale: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

/// One page of SearchList results.
#[derive(Debug)]
struct SearchPage {
    items: Vec<Listing>,
    page_count: u32,
    current_page: u32,
}

impl VisitJejuClient {
    #[inline]
    pub fn new(config: &VisitJejuConfig) -> crate::Result<Self> {
        let endpoint = config
            .api_url()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        let api_key = std::env::var("VISITJEJU_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            endpoint,
            locale: config.locale.clone(),
            api_key,
            agent,
        })
    }

    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn require_api_key(&self) -> crate::Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            RagError::Config("VISITJEJU_API_KEY is required to fetch the corpus".to_string())
        })
    }

    fn fetch_page(&self, api_key: &str, page: u32) -> Result<SearchPage> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("apiKey", api_key)
            .append_pair("locale", &self.locale)
            .append_pair("page", &page.to_string());

        let response_text = self
            .agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("SearchList request for page {page} failed"))?;

        let value: Value = serde_json::from_str(&response_text)
            .context("Failed to parse SearchList response")?;

        if let Some(code) = result_code(&value) {
            if !matches!(code.as_str(), "00" | "200" | "SUCCESS") {
                warn!("SearchList result code {code} on page {page}");
            }
        }

        let items = extract_items(&value)?;
        Ok(SearchPage {
            items,
            page_count: page_number(&value, "pageCount").unwrap_or(1),
            current_page: page_number(&value, "currentPage").unwrap_or(page),
        })
    }

    /// Walk every SearchList page and collect the raw listings in page order.
    #[inline]
    pub fn fetch_all(&self) -> crate::Result<Vec<Listing>> {
        let api_key = self.require_api_key()?;

        let first = self
            .fetch_page(api_key, 1)
            .map_err(|e| RagError::Corpus(format!("{e:#}")))?;
        let total_pages = first.page_count.max(1);
        info!(
            "SearchList: {total_pages} pages, starting at page {}",
            first.current_page
        );

        let mut items = first.items;
        for page in first.current_page + 1..=total_pages {
            debug!("Fetching SearchList page {page}/{total_pages}");
            let mut next = self
                .fetch_page(api_key, page)
                .map_err(|e| RagError::Corpus(format!("{e:#}")))?;
            items.append(&mut next.items);
        }

        info!("Fetched {} raw listings", items.len());
        Ok(items)
    }
}

/// The API reports `result` either as a status code or as a nested object
/// holding the items.
fn result_code(value: &Value) -> Option<String> {
    match value.get("result")? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

/// Items live either at the top level or nested under `result`.
fn extract_items(value: &Value) -> Result<Vec<Listing>> {
    let items = value.get("items").filter(|v| v.is_array()).or_else(|| {
        value
            .get("result")
            .and_then(|result| result.get("items"))
            .filter(|v| v.is_array())
    });

    match items {
        Some(array) => {
            serde_json::from_value(array.clone()).context("Malformed SearchList items")
        }
        None => Ok(Vec::new()),
    }
}

/// Page fields arrive as numbers or numeric strings and are sometimes absent.
fn page_number(value: &Value, key: &str) -> Option<u32> {
    match value.get(key)? {
        Value::Number(number) => u32::try_from(number.as_u64()?).ok(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// A listing counts as a workshop when any keyword appears in its title,
/// tags, or introduction.
#[inline]
pub fn is_workshop(listing: &Listing) -> bool {
    let haystack = [
        listing.title(),
        listing.tag.as_deref().unwrap_or(""),
        listing.alltag.as_deref().unwrap_or(""),
        listing.introduction(),
    ]
    .join(" ");

    WORKSHOP_KEYWORDS
        .iter()
        .any(|keyword| haystack.contains(keyword))
}

/// Keep only workshop-like listings.
#[inline]
pub fn filter_workshops(listings: Vec<Listing>) -> Vec<Listing> {
    let total = listings.len();
    let kept: Vec<Listing> = listings.into_iter().filter(is_workshop).collect();
    info!("Workshop filter kept {} of {total} listings", kept.len());
    kept
}
